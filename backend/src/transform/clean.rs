//! Post-edit normalization of a rotation table.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::logs::log_info;
use crate::models::{Cell, RotationTable};

static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("numeric pattern is valid"));

/// Clean a table after user edits.
///
/// - rows where every cell is blank are removed
/// - text is trimmed, and text that trims to nothing becomes `Blank`
/// - numeric-looking text becomes `Number`
///
/// Cleaning is idempotent and never changes the column set.
pub fn clean(table: &RotationTable) -> RotationTable {
    let mut cleaned = RotationTable::with_columns(table.columns().to_vec());
    let mut dropped = 0;

    for row in table.rows() {
        let normalized: Vec<Cell> = row.iter().map(clean_cell).collect();
        if normalized.iter().all(Cell::is_blank) {
            dropped += 1;
            continue;
        }
        cleaned.push_row(normalized);
    }

    log_info(format!(
        "🧹 Cleaned table: {} rows kept, {} blank rows dropped",
        cleaned.row_count(),
        dropped
    ));
    cleaned
}

/// Normalize one cell.
pub fn clean_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Blank => Cell::Blank,
        Cell::Number(n) => Cell::Number(*n),
        Cell::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Cell::Blank
            } else if let Some(n) = coerce_number(trimmed) {
                Cell::Number(n)
            } else {
                Cell::Text(trimmed.to_string())
            }
        }
    }
}

/// Parse text that looks like a plain decimal number.
///
/// Integers with a leading zero (`007`) stay text.
fn coerce_number(text: &str) -> Option<f64> {
    if !NUMERIC.is_match(text) {
        return None;
    }
    let unsigned = text.trim_start_matches(['+', '-']);
    if unsigned.len() > 1 && unsigned.starts_with('0') && !unsigned.starts_with("0.") {
        return None;
    }
    text.parse().ok()
}
