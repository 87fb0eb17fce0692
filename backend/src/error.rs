//! Error types for the rotation export pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ParseError`] - Uploaded file is missing, unreadable or has no usable header
//! - [`RangeError`] - Row insertion parameters out of bounds
//! - [`ContextError`] - Rotation context fields that cannot be resolved
//! - [`SessionError`] - Wizard-level errors (wraps the above)
//! - [`ServerError`] - HTTP surface errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors while extracting a table from an uploaded file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// No bytes were uploaded.
    #[error("Uploaded file is empty")]
    Empty,

    /// The workbook container could not be opened.
    #[error("Could not open workbook: {0}")]
    Workbook(String),

    /// Text content could not be decoded.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Requested sheet does not exist.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// No sheet contains a recognisable header row.
    #[error("No recognisable header row found (expected a 'Preceptor' column)")]
    NoHeader,
}

// =============================================================================
// Range Errors
// =============================================================================

/// Row insertion parameters outside their allowed bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Insertion index past the end of the table.
    #[error("Insertion index {index} out of range (0..={max})")]
    Index { index: usize, max: usize },

    /// Row count outside 1..=max.
    #[error("Row count {count} out of range (1..={max})")]
    Count { count: usize, max: usize },
}

// =============================================================================
// Context Errors
// =============================================================================

/// Errors resolving a rotation context from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Invalid rotation code '{0}' (expected A-D followed by 1-6)")]
    RotationCode(String),

    #[error("Unknown location '{0}' (expected SMH, VGH or SPH)")]
    Location(String),

    #[error("Invalid academic year '{0}' (expected YYYY-YYYY+1)")]
    AcademicYear(String),

    #[error("Invalid date '{0}' (expected YYYY-MM-DD)")]
    Date(String),

    #[error("End date {end} is before start date {start}")]
    DateOrder { start: String, end: String },

    #[error("Missing context field: {0}")]
    Missing(&'static str),
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors raised by a wizard transition.
///
/// A failed transition never changes the session: the caller keeps the
/// previous `SessionContext`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Upload could not be turned into a table.
    #[error("Could not load or process the uploaded file: {0}")]
    Parse(#[from] ParseError),

    /// Row insertion rejected.
    #[error("Row insertion rejected: {0}")]
    Range(#[from] RangeError),

    /// Context could not be resolved.
    #[error("Invalid rotation information: {0}")]
    Context(#[from] ContextError),

    /// Required form input was not supplied.
    #[error("Please fill out all required fields ({0})")]
    MissingInput(&'static str),

    /// Action does not apply to the current screen.
    #[error("Action '{action}' is not available on screen '{screen}'")]
    InvalidAction { screen: String, action: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Session transition failed.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Unknown session id.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for extraction.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for rotation context resolution.
pub type ContextResult<T> = Result<T, ContextError>;

/// Result type for wizard transitions.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ParseError -> SessionError
        let session_err: SessionError = ParseError::NoHeader.into();
        assert!(session_err.to_string().contains("Preceptor"));

        // RangeError -> SessionError
        let session_err: SessionError = RangeError::Count { count: 0, max: 100 }.into();
        assert!(session_err.to_string().contains("1..=100"));

        // SessionError -> ServerError keeps the message
        let server_err: ServerError = SessionError::MissingInput("file").into();
        assert!(server_err.to_string().contains("file"));
    }

    #[test]
    fn test_context_error_format() {
        let err = ContextError::DateOrder {
            start: "2025-09-08".into(),
            end: "2025-09-01".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2025-09-01"));
        assert!(msg.contains("before"));
    }
}
