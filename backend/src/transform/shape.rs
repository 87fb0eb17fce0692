//! Column-mapping executor shared by the three output shapes.
//!
//! An [`OutputSchema`] is an ordered list of target columns, each filled by a
//! [`FieldTransform`]: a source column, a constant, and an optional chain of
//! [`Operation`]s applied to the value.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Cell, RotationTable};

static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(dr|prof)(\.\s*|\s+)").expect("title pattern is valid"));

/// Value operations available to output columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Remove leading and trailing whitespace
    Trim,
    /// Remove a leading "Dr"/"Prof" title
    StripTitle,
    /// Given name(s) of a person's name
    FirstName,
    /// Family name of a person's name
    LastName,
}

impl Operation {
    /// Apply this operation to a cell. Blank cells stay blank.
    pub fn apply(&self, cell: &Cell) -> Cell {
        if cell.is_blank() {
            return Cell::Blank;
        }
        let text = cell.display();
        let result = match self {
            Operation::Trim => text.trim().to_string(),
            Operation::StripTitle => strip_title(&text).to_string(),
            Operation::FirstName => split_name(&text).0,
            Operation::LastName => split_name(&text).1,
        };
        if result.is_empty() {
            Cell::Blank
        } else {
            Cell::Text(result)
        }
    }
}

fn strip_title(name: &str) -> &str {
    let trimmed = name.trim();
    match TITLE.find(trimmed) {
        Some(m) => trimmed[m.end()..].trim(),
        None => trimmed,
    }
}

/// Split a person's name into (first, last).
///
/// "Last, First" splits on the comma; otherwise the final word is the
/// family name. A single word is treated as the family name.
pub fn split_name(raw: &str) -> (String, String) {
    let name = strip_title(raw);

    if let Some((last, first)) = name.split_once(',') {
        return (first.trim().to_string(), last.trim().to_string());
    }

    let words: Vec<&str> = name.split_whitespace().collect();
    match words.split_last() {
        None => (String::new(), String::new()),
        Some((last, rest)) => (rest.join(" "), (*last).to_string()),
    }
}

/// How one output column is filled.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTransform {
    /// Source column name (mutually exclusive with constant)
    pub source: Option<String>,
    /// Constant value for every row
    pub constant: Option<Cell>,
    /// Ordered list of operations to apply
    pub operations: Vec<Operation>,
}

impl FieldTransform {
    /// Copy a source column
    pub fn from_source(source: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            constant: None,
            operations: Vec::new(),
        }
    }

    /// Same value on every row
    pub fn from_constant(value: impl Into<Cell>) -> Self {
        Self {
            source: None,
            constant: Some(value.into()),
            operations: Vec::new(),
        }
    }

    /// Add an operation to the chain
    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    fn resolve(&self, table: &RotationTable, row: usize) -> Cell {
        let base = match (&self.constant, &self.source) {
            (Some(value), _) => value.clone(),
            (None, Some(source)) => table.get(row, source).cloned().unwrap_or_default(),
            (None, None) => Cell::Blank,
        };
        self.operations
            .iter()
            .fold(base, |value, op| op.apply(&value))
    }
}

/// Ordered target columns for one output shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSchema {
    fields: Vec<(String, FieldTransform)>,
}

impl OutputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a target column.
    pub fn field(mut self, name: &str, transform: FieldTransform) -> Self {
        self.fields.push((name.to_string(), transform));
        self
    }

    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Source columns referenced by the schema.
    pub fn source_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .fields
            .iter()
            .filter_map(|(_, t)| t.source.clone())
            .collect();
        columns.sort();
        columns.dedup();
        columns
    }

    /// Referenced source columns absent from `table`. Missing columns yield
    /// blank cells rather than an error.
    pub fn missing_sources(&self, table: &RotationTable) -> Vec<String> {
        self.source_columns()
            .into_iter()
            .filter(|c| !table.has_column(c))
            .collect()
    }

    /// Build the output table from the rows of `table` accepted by `keep`.
    pub fn execute<F>(&self, table: &RotationTable, keep: F) -> RotationTable
    where
        F: Fn(usize) -> bool,
    {
        let mut output = RotationTable::with_columns(self.column_names());
        for row in (0..table.row_count()).filter(|r| keep(*r)) {
            output.push_row(
                self.fields
                    .iter()
                    .map(|(_, transform)| transform.resolve(table, row))
                    .collect(),
            );
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name_variants() {
        assert_eq!(split_name("Dr. Jane Smith"), ("Jane".into(), "Smith".into()));
        assert_eq!(split_name("dr Jane Q. Smith"), ("Jane Q.".into(), "Smith".into()));
        assert_eq!(split_name("Smith, Jane"), ("Jane".into(), "Smith".into()));
        assert_eq!(split_name("Prof. Lee"), ("".into(), "Lee".into()));
        assert_eq!(split_name("Drake Bell"), ("Drake".into(), "Bell".into()));
        assert_eq!(split_name("   "), ("".into(), "".into()));
    }

    #[test]
    fn test_split_name_title_without_space() {
        assert_eq!(split_name("Dr.Smith"), ("".into(), "Smith".into()));
        assert_eq!(split_name("dr.Jane Smith"), ("Jane".into(), "Smith".into()));
        assert_eq!(split_name("Prof.Lee, Ann"), ("Ann".into(), "Lee".into()));
        assert_eq!(split_name("Dreyfus Smith"), ("Dreyfus".into(), "Smith".into()));
    }

    #[test]
    fn test_operations_on_cells() {
        let name = Cell::text("Dr. Jane Smith");
        assert_eq!(Operation::FirstName.apply(&name), Cell::text("Jane"));
        assert_eq!(Operation::LastName.apply(&name), Cell::text("Smith"));
        assert_eq!(Operation::StripTitle.apply(&name), Cell::text("Jane Smith"));
        assert_eq!(Operation::FirstName.apply(&Cell::text("Lee")), Cell::Blank);
        assert_eq!(Operation::Trim.apply(&Cell::Blank), Cell::Blank);
    }

    #[test]
    fn test_execute_schema() {
        let table = RotationTable::new(
            vec!["Preceptor".into(), "Email".into()],
            vec![
                vec![Cell::text("Dr. Jane Smith"), Cell::text("jane@x.ca")],
                vec![Cell::text("Dr. Bob Lee"), Cell::Blank],
            ],
        );
        let schema = OutputSchema::new()
            .field("Site", FieldTransform::from_constant("VGH"))
            .field(
                "Last",
                FieldTransform::from_source("Preceptor").with_operation(Operation::LastName),
            )
            .field("Email", FieldTransform::from_source("Email"))
            .field("Pager", FieldTransform::from_source("Pager"));

        let output = schema.execute(&table, |_| true);
        assert_eq!(output.columns(), &["Site", "Last", "Email", "Pager"]);
        assert_eq!(output.get(1, "Site"), Some(&Cell::text("VGH")));
        assert_eq!(output.get(1, "Last"), Some(&Cell::text("Lee")));
        assert_eq!(output.get(0, "Pager"), Some(&Cell::Blank));
        assert_eq!(schema.missing_sources(&table), vec!["Pager".to_string()]);

        let filtered = schema.execute(&table, |row| row == 1);
        assert_eq!(filtered.row_count(), 1);
    }
}
