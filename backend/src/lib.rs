//! # Rotaprep - rotation spreadsheet preparation
//!
//! Rotaprep reads the preceptor spreadsheet for a clinical rotation block,
//! lets a coordinator correct it, and reshapes it for three downstream
//! systems: TTPS, the internal tracker and One45.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ xlsx / csv  │────▶│  Extractor  │────▶│   Editor    │────▶│   Cleaner   │
//! │   upload    │     │ (find hdr)  │     │ (+ rows)    │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                    ┌───────────────┼───────────────┐
//!                                                    ▼               ▼               ▼
//!                                                  TTPS           Tracker          One45
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rotaprep::{extract_file, clean, transform_one45, ExtractOptions};
//!
//! let extraction = extract_file("block_c1.xlsx", &ExtractOptions::default())?;
//! let one45 = transform_one45(&clean(&extraction.table));
//! println!("{} One45 rows", one45.table.row_count());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, tables and the rotation context
//! - [`parser`] - Workbook and delimited-text extraction
//! - [`transform`] - Cleaning, row insertion and the three output shapes
//! - [`session`] - Wizard state machine and form defaults
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Extraction
pub mod parser;

// Transformation
pub mod transform;

// Wizard
pub mod session;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ContextError, ParseError, RangeError, ServerError, SessionError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AcademicYear, Cell, Location, OutputKind, OutputTable, RotationCode, RotationContext,
    RotationTable,
};

// =============================================================================
// Re-exports - Extraction
// =============================================================================

pub use parser::{extract_bytes, extract_file, ExtractOptions, Extraction, SourceFormat};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    clean, clean_and_shape, insert_blank_rows, transform_one45, transform_tracker, transform_ttps,
    TtpsResult, MAX_INSERT_ROWS, TTPS_SENTINEL,
};

// =============================================================================
// Re-exports - Session
// =============================================================================

pub use session::{Action, ContextForm, FormDefaults, Screen, SessionContext, Upload};

pub use config::Config;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
