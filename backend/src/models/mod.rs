//! Domain models for the rotation export pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Cell`] - A single spreadsheet value (blank, text or number)
//! - [`RotationTable`] - Ordered rows over a stable column set
//! - [`OutputTable`] / [`OutputKind`] - Result of one of the three shape transforms
//! - [`RotationContext`] and its parts, see [`context`]

pub mod context;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;

pub use context::{AcademicYear, Location, RotationCode, RotationContext};

/// Column rendered as text by display layers.
pub const STUDENTS_COLUMN: &str = "# Students";

// =============================================================================
// Cell
// =============================================================================

/// A single cell value.
///
/// Serialized as JSON `null`, string or number.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Cell {
    #[default]
    Blank,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// True for `Blank` and for text that is empty once trimmed.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Blank => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the cell as a string. Whole numbers print without a fraction.
    pub fn display(&self) -> String {
        match self {
            Cell::Blank => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Cell::Blank,
            Value::String(s) => Cell::Text(s),
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Blank),
            Value::Bool(b) => Cell::Text(if b { "TRUE" } else { "FALSE" }.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl From<Cell> for Value {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Blank => Value::Null,
            Cell::Text(s) => Value::String(s),
            Cell::Number(n) => serde_json::Number::from_f64(n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

// =============================================================================
// Rotation Table
// =============================================================================

/// Ordered rows over a fixed column set.
///
/// Every row holds exactly `columns.len()` cells; constructors pad short
/// rows with blanks and truncate long ones.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "TableRepr")]
pub struct RotationTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Deserialize)]
struct TableRepr {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Cell>>,
}

impl From<TableRepr> for RotationTable {
    fn from(repr: TableRepr) -> Self {
        RotationTable::new(repr.columns, repr.rows)
    }
}

impl RotationTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self::with_columns(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Empty table with the given columns.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` in column `column`, if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Overwrite a cell. Returns false when the row or column does not exist.
    pub fn set(&mut self, row: usize, column: &str, value: Cell) -> bool {
        let Some(col) = self.column_index(column) else {
            return false;
        };
        match self.rows.get_mut(row) {
            Some(r) => {
                r[col] = value;
                true
            }
            None => false,
        }
    }

    /// All cells of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Cell>> {
        let col = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[col]).collect())
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Blank);
        self.rows.push(row);
    }

    /// A row of blanks sized to this table.
    pub fn blank_row(&self) -> Vec<Cell> {
        vec![Cell::Blank; self.columns.len()]
    }

    /// Consume the table, returning its rows.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }

    /// Copy of the table with `# Students` held as text, so grids do not
    /// apply locale number formatting to it.
    pub fn for_display(&self) -> RotationTable {
        let mut display = self.clone();
        if let Some(col) = display.column_index(STUDENTS_COLUMN) {
            for row in &mut display.rows {
                let cell = &mut row[col];
                if !matches!(cell, Cell::Blank) {
                    *cell = Cell::Text(cell.display());
                }
            }
        }
        display
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (name, cell) in self.columns.iter().zip(row) {
                    obj.insert(name.clone(), Value::from(cell.clone()));
                }
                Value::Object(obj)
            })
            .collect()
    }

    /// Write the table as CSV with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(Cell::display))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

// =============================================================================
// Output Tables
// =============================================================================

/// Which downstream system an output table targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Ttps,
    Tracker,
    One45,
}

impl OutputKind {
    pub const ALL: [OutputKind; 3] = [OutputKind::Ttps, OutputKind::Tracker, OutputKind::One45];

    /// Screen title used by display layers.
    pub fn title(&self) -> &'static str {
        match self {
            OutputKind::Ttps => "TTPS Data",
            OutputKind::Tracker => "Internal Tracker Data",
            OutputKind::One45 => "One45 Data",
        }
    }

    /// Note shown above the table, if any.
    pub fn note(&self) -> Option<&'static str> {
        match self {
            OutputKind::Ttps => Some(
                "All entries marked as \"* Cannot Input into TTP *\" are not shown, all other entries are shown",
            ),
            _ => None,
        }
    }

    /// Whether the transform needs a rotation context.
    pub fn needs_context(&self) -> bool {
        !matches!(self, OutputKind::One45)
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputKind::Ttps => "ttps",
            OutputKind::Tracker => "tracker",
            OutputKind::One45 => "one45",
        })
    }
}

impl std::str::FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ttps" | "ttp" => Ok(OutputKind::Ttps),
            "tracker" => Ok(OutputKind::Tracker),
            "one45" => Ok(OutputKind::One45),
            other => Err(format!("unknown output kind '{}'", other)),
        }
    }
}

/// A shaped table ready for read-only display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputTable {
    pub kind: OutputKind,
    pub table: RotationTable,
}

impl OutputTable {
    pub fn new(kind: OutputKind, table: RotationTable) -> Self {
        Self { kind, table }
    }
}

// =============================================================================
// Tests
// =============================================================================
