//! Canonical column names and the header aliases that map onto them.

pub const PRECEPTOR: &str = "Preceptor";
pub const EMAIL: &str = "Email";
pub const DISCIPLINE: &str = "Discipline";
pub const SITE: &str = "Site";
pub const STUDENTS: &str = crate::models::STUDENTS_COLUMN;
pub const NOTES: &str = "Notes";

/// Column checked against the TTPS sentinel.
pub const ELIGIBILITY: &str = NOTES;

/// Canonical columns in output order, with their accepted aliases
/// (already normalized, see [`normalize_header`]).
pub const CANONICAL_COLUMNS: &[(&str, &[&str])] = &[
    (
        PRECEPTOR,
        &["preceptor", "preceptor name", "physician", "supervisor", "name"],
    ),
    (
        EMAIL,
        &["email", "e-mail", "email address", "preceptor email"],
    ),
    (
        DISCIPLINE,
        &["discipline", "specialty", "speciality", "service"],
    ),
    (SITE, &["site", "hospital", "unit"]),
    (
        STUDENTS,
        &["# students", "#students", "students", "number of students", "capacity"],
    ),
    (NOTES, &["notes", "comments", "comment", "ttp notes"]),
];

/// Lowercase, trim, and collapse inner whitespace.
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Canonical name for a header, if it is a known alias.
pub fn canonical_name(raw: &str) -> Option<&'static str> {
    let normalized = normalize_header(raw);
    CANONICAL_COLUMNS
        .iter()
        .find(|(_, aliases)| aliases.contains(&normalized.as_str()))
        .map(|(name, _)| *name)
}

/// Position of a canonical column in output order.
pub fn canonical_rank(name: &str) -> Option<usize> {
    CANONICAL_COLUMNS.iter().position(|(n, _)| *n == name)
}
