//! Workbook reading (xlsx, xls, ods) via calamine.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use std::io::Cursor;

use crate::error::ParseError;
use crate::models::context::DATE_FORMAT;
use crate::models::Cell;

/// One worksheet as a raw grid of cells.
#[derive(Debug, Clone)]
pub struct SheetGrid {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

/// Whether the bytes look like a workbook container (ZIP or OLE2).
pub fn is_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

/// Read every worksheet in workbook order.
pub fn read_sheets(bytes: &[u8]) -> Result<Vec<SheetGrid>, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ParseError::Workbook(format!("sheet '{}': {}", name, e)))?;
        sheets.push(SheetGrid {
            rows: range_to_grid(&range),
            name,
        });
    }

    Ok(sheets)
}

fn range_to_grid(range: &Range<Data>) -> Vec<Vec<Cell>> {
    // Range rows start at the first used cell; pad so row/col 0 is A1
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Blank; col_offset];
        cells.extend(row.iter().map(cell_from_data));
        grid.push(cells);
    }
    grid
}

/// Convert a calamine cell. Dates become ISO text, errors become blanks.
pub fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Blank,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => match serial_to_date(dt.as_f64()) {
            Some(date) => Cell::Text(date.format(DATE_FORMAT).to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => {
            let date_part = s.get(..10).unwrap_or(s);
            match NaiveDate::parse_from_str(date_part, DATE_FORMAT) {
                Ok(date) => Cell::Text(date.format(DATE_FORMAT).to_string()),
                Err(_) => Cell::Text(s.clone()),
            }
        }
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Excel serial day number (1900 date system) to a calendar date.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Day 60 is the phantom 1900-02-29; the 1899-12-30 epoch is right from day 61 on
    let days = serial.floor() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let adjusted = if days < 61 { days + 1 } else { days };
    epoch.checked_add_signed(Duration::days(adjusted))
}
