//! File extractor: uploaded spreadsheet bytes to a canonical [`RotationTable`].
//!
//! Workbooks (xlsx/xls/ods) are read with calamine; anything else is treated
//! as a delimited-text export with encoding and delimiter auto-detection.
//! In both cases the header row is located by scanning the top of each sheet
//! for known column aliases, banner rows above it are dropped, and headers
//! are renamed to their canonical names.

pub mod columns;
pub mod delimited;
pub mod workbook;

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{ParseError, ParseResult};
use crate::models::{Cell, RotationTable};

pub use columns::{canonical_name, CANONICAL_COLUMNS, ELIGIBILITY};
pub use delimited::{decode_content, detect_delimiter, detect_encoding};

/// Options controlling header detection.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Only look in this sheet (workbooks only).
    pub sheet: Option<String>,
    /// How many rows from the top to scan for the header.
    pub header_scan_rows: usize,
    /// Minimum number of recognised aliases in the header row.
    pub min_header_matches: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            sheet: None,
            header_scan_rows: 15,
            min_header_matches: 2,
        }
    }
}

/// How the uploaded bytes were interpreted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceFormat {
    Workbook { sheet: String },
    Delimited { encoding: String, delimiter: char },
}

/// Extracted table with metadata about where it came from.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub table: RotationTable,
    pub format: SourceFormat,
    /// Zero-based row of the header within its sheet.
    pub header_row: usize,
    /// Headers kept as-is because they matched no alias.
    pub unrecognised: Vec<String>,
}

/// Extract a rotation table from a file on disk.
pub fn extract_file<P: AsRef<Path>>(path: P, options: &ExtractOptions) -> ParseResult<Extraction> {
    let bytes = std::fs::read(path.as_ref())?;
    extract_bytes(&bytes, options)
}

/// Extract a rotation table from uploaded bytes.
pub fn extract_bytes(bytes: &[u8], options: &ExtractOptions) -> ParseResult<Extraction> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    log_info(format!("📖 Reading upload ({} bytes)...", bytes.len()));

    let extraction = if workbook::is_workbook(bytes) {
        extract_workbook(bytes, options)?
    } else {
        extract_delimited(bytes, options)?
    };

    log_success(format!(
        "Header found on row {}, {} rows x {} columns",
        extraction.header_row + 1,
        extraction.table.row_count(),
        extraction.table.columns().len()
    ));
    if !extraction.unrecognised.is_empty() {
        log_warning(format!(
            "Kept unrecognised columns: {}",
            extraction.unrecognised.join(", ")
        ));
    }

    Ok(extraction)
}

fn extract_workbook(bytes: &[u8], options: &ExtractOptions) -> ParseResult<Extraction> {
    let sheets = workbook::read_sheets(bytes)?;

    if let Some(ref wanted) = options.sheet {
        if !sheets.iter().any(|s| &s.name == wanted) {
            return Err(ParseError::SheetNotFound(wanted.clone()));
        }
    }

    for sheet in sheets {
        if options.sheet.as_ref().is_some_and(|w| w != &sheet.name) {
            continue;
        }
        if let Some(header_row) = find_header_row(&sheet.rows, options) {
            log_info(format!("Using sheet '{}'", sheet.name));
            let (table, unrecognised) = build_table(sheet.rows, header_row);
            return Ok(Extraction {
                table,
                format: SourceFormat::Workbook { sheet: sheet.name },
                header_row,
                unrecognised,
            });
        }
    }

    Err(ParseError::NoHeader)
}

fn extract_delimited(bytes: &[u8], options: &ExtractOptions) -> ParseResult<Extraction> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    log_info(format!(
        "Detected encoding {}, delimiter '{}'",
        encoding,
        if delimiter == '\t' { "TAB".to_string() } else { delimiter.to_string() }
    ));

    let grid = delimited::read_grid(&content, delimiter)?;
    let header_row = find_header_row(&grid, options).ok_or(ParseError::NoHeader)?;
    let (table, unrecognised) = build_table(grid, header_row);

    Ok(Extraction {
        table,
        format: SourceFormat::Delimited { encoding, delimiter },
        header_row,
        unrecognised,
    })
}

/// First row within the scan window that names the preceptor column and
/// enough other known columns.
fn find_header_row(grid: &[Vec<Cell>], options: &ExtractOptions) -> Option<usize> {
    grid.iter()
        .take(options.header_scan_rows)
        .position(|row| {
            let matched: HashSet<&str> = row
                .iter()
                .filter_map(|cell| cell.as_str().and_then(canonical_name))
                .collect();
            matched.contains(columns::PRECEPTOR) && matched.len() >= options.min_header_matches
        })
}

/// Turn the grid below `header_row` into a table with canonical columns
/// first, then unrecognised columns in sheet order.
fn build_table(grid: Vec<Vec<Cell>>, header_row: usize) -> (RotationTable, Vec<String>) {
    let mut rows = grid.into_iter().skip(header_row);
    let header = rows.next().unwrap_or_default();

    // (source column index, output name, canonical rank)
    let mut mapped: Vec<(usize, String, Option<usize>)> = Vec::new();
    let mut unrecognised = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (idx, cell) in header.iter().enumerate() {
        let raw = cell.display();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (name, rank) = match canonical_name(trimmed) {
            Some(canonical) if !seen.contains(canonical) => {
                (canonical.to_string(), columns::canonical_rank(canonical))
            }
            _ => {
                unrecognised.push(trimmed.to_string());
                (unique_name(trimmed, &seen), None)
            }
        };
        seen.insert(name.clone());
        mapped.push((idx, name, rank));
    }

    // Stable sort keeps sheet order among unrecognised columns
    mapped.sort_by_key(|(_, _, rank)| rank.unwrap_or(usize::MAX));

    let columns: Vec<String> = mapped.iter().map(|(_, name, _)| name.clone()).collect();
    let mut data: Vec<Vec<Cell>> = rows
        .map(|row| {
            mapped
                .iter()
                .map(|(idx, _, _)| row.get(*idx).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    while data.last().is_some_and(|r| r.iter().all(Cell::is_blank)) {
        data.pop();
    }

    (RotationTable::new(columns, data), unrecognised)
}

fn unique_name(base: &str, seen: &HashSet<String>) -> String {
    if !seen.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{} ({})", base, n))
        .find(|candidate| !seen.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn csv_extract(content: &str) -> ParseResult<Extraction> {
        extract_bytes(content.as_bytes(), &ExtractOptions::default())
    }

    #[test]
    fn test_csv_with_banner_rows() {
        let content = "Block C1 Rotation Schedule,,\n\
                       ,,\n\
                       Preceptor Name , E-mail, # Students ,Pager\n\
                       Dr. Jane Smith,jane@example.ca,2,1234\n\
                       Dr. Bob Lee,bob@example.ca,1,\n\
                       ,,,\n";
        let result = csv_extract(content).unwrap();

        assert_eq!(result.header_row, 2);
        assert_eq!(
            result.table.columns(),
            &["Preceptor", "Email", "# Students", "Pager"]
        );
        assert_eq!(result.table.row_count(), 2);
        assert_eq!(result.table.get(0, "Preceptor"), Some(&Cell::text("Dr. Jane Smith")));
        assert_eq!(result.unrecognised, vec!["Pager"]);
        assert!(matches!(result.format, SourceFormat::Delimited { delimiter: ',', .. }));
    }

    #[test]
    fn test_canonical_columns_reordered() {
        let content = "Notes;Service;Physician\nok;Family Medicine;Dr. A\n";
        let result = csv_extract(content).unwrap();
        assert_eq!(result.table.columns(), &["Preceptor", "Discipline", "Notes"]);
        assert_eq!(result.table.get(0, "Discipline"), Some(&Cell::text("Family Medicine")));
    }

    #[test]
    fn test_interior_blank_rows_kept() {
        let content = "Preceptor,Email\nDr. A,a@x.ca\n,\nDr. B,b@x.ca\n";
        let result = csv_extract(content).unwrap();
        // csv skips truly empty lines, but a line of separators is a blank row
        assert_eq!(result.table.row_count(), 3);
    }

    #[test]
    fn test_duplicate_alias_kept_under_own_name() {
        let content = "Preceptor,Name,Email\nDr. A,Alice,a@x.ca\n";
        let result = csv_extract(content).unwrap();
        assert_eq!(result.table.columns(), &["Preceptor", "Email", "Name"]);
    }

    #[test]
    fn test_no_header_is_error() {
        let result = csv_extract("foo,bar\n1,2\n");
        assert!(matches!(result, Err(ParseError::NoHeader)));
    }

    #[test]
    fn test_empty_upload_is_error() {
        assert!(matches!(csv_extract("  \n"), Err(ParseError::Empty)));
    }

    #[test]
    fn test_header_outside_scan_window() {
        let mut content = String::new();
        for _ in 0..20 {
            content.push_str("filler,\n");
        }
        content.push_str("Preceptor,Email\nDr. A,a@x.ca\n");
        assert!(matches!(csv_extract(&content), Err(ParseError::NoHeader)));
    }

    fn sample_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let cover = workbook.add_worksheet();
        cover.set_name("Cover").unwrap();
        cover.write_string(0, 0, "Rotation schedule").unwrap();

        let sheet = workbook.add_worksheet();
        sheet.set_name("Block C1").unwrap();
        sheet.write_string(0, 0, "Vancouver General - Block C1").unwrap();
        sheet.write_string(2, 0, " Preceptor ").unwrap();
        sheet.write_string(2, 1, "Specialty").unwrap();
        sheet.write_string(2, 2, "# Students").unwrap();
        sheet.write_string(2, 3, "Notes").unwrap();
        sheet.write_string(3, 0, "Dr. Jane Smith").unwrap();
        sheet.write_string(3, 1, "Internal Medicine").unwrap();
        sheet.write_number(3, 2, 2.0).unwrap();
        sheet.write_string(4, 0, "Dr. Bob Lee").unwrap();
        sheet.write_string(4, 1, "Surgery").unwrap();
        sheet.write_number(4, 2, 1.0).unwrap();
        sheet.write_string(4, 3, "* Cannot Input into TTP *").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_workbook_skips_sheets_without_header() {
        let bytes = sample_workbook();
        let result = extract_bytes(&bytes, &ExtractOptions::default()).unwrap();

        assert_eq!(
            result.format,
            SourceFormat::Workbook { sheet: "Block C1".to_string() }
        );
        assert_eq!(result.header_row, 2);
        assert_eq!(
            result.table.columns(),
            &["Preceptor", "Discipline", "# Students", "Notes"]
        );
        assert_eq!(result.table.row_count(), 2);
        assert_eq!(result.table.get(0, "# Students"), Some(&Cell::Number(2.0)));
        assert_eq!(
            result.table.get(1, "Notes"),
            Some(&Cell::text("* Cannot Input into TTP *"))
        );
    }

    #[test]
    fn test_workbook_named_sheet_missing() {
        let bytes = sample_workbook();
        let options = ExtractOptions {
            sheet: Some("Block D2".to_string()),
            ..ExtractOptions::default()
        };
        let result = extract_bytes(&bytes, &options);
        assert!(matches!(result, Err(ParseError::SheetNotFound(_))));
    }

    #[test]
    fn test_workbook_named_sheet_without_header() {
        let bytes = sample_workbook();
        let options = ExtractOptions {
            sheet: Some("Cover".to_string()),
            ..ExtractOptions::default()
        };
        assert!(matches!(extract_bytes(&bytes, &options), Err(ParseError::NoHeader)));
    }

    #[test]
    fn test_extract_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rotation.xlsx");
        std::fs::write(&path, sample_workbook()).unwrap();

        let result = extract_file(&path, &ExtractOptions::default()).unwrap();
        assert_eq!(result.table.row_count(), 2);

        let missing = extract_file(dir.path().join("nope.xlsx"), &ExtractOptions::default());
        assert!(matches!(missing, Err(ParseError::Io(_))));
    }
}
