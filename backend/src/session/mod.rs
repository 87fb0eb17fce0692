//! Wizard state machine.
//!
//! A session moves through five screens:
//!
//! ```text
//! CollectData --Submit--> Edit --Show(kind)--> Ttps | Tracker | One45
//!      ^                   |  ^                        |
//!      +------Return-------+  +---------Return---------+
//! ```
//!
//! [`SessionContext`] is a value: [`SessionContext::transition`] returns the
//! next context and leaves `self` untouched, so a failed action never leaves
//! partial state behind.

pub mod defaults;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::logs::{log_info, log_warning, LogLevel};
use crate::error::{ContextError, ContextResult, SessionError, SessionResult};
use crate::models::context::DATE_FORMAT;
use crate::models::{
    AcademicYear, Location, OutputKind, OutputTable, RotationCode, RotationContext, RotationTable,
};
use crate::parser::{extract_bytes, ExtractOptions};
use crate::transform::{clean, clean_and_shape, insert_blank_rows};

pub use defaults::{AcademicYearChoice, FormDefaults};

/// Shown when a screen that needs a table is reached without one.
pub const TABLE_NOT_FOUND: &str =
    "Output file not found. Please return to the previous screen and re-load the file.";

// =============================================================================
// Screens
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    #[default]
    CollectData,
    Edit,
    Ttps,
    Tracker,
    One45,
}

impl Screen {
    pub fn for_output(kind: OutputKind) -> Self {
        match kind {
            OutputKind::Ttps => Screen::Ttps,
            OutputKind::Tracker => Screen::Tracker,
            OutputKind::One45 => Screen::One45,
        }
    }

    /// The output shown on this screen, if it is an output screen.
    pub fn output_kind(&self) -> Option<OutputKind> {
        match self {
            Screen::Ttps => Some(OutputKind::Ttps),
            Screen::Tracker => Some(OutputKind::Tracker),
            Screen::One45 => Some(OutputKind::One45),
            Screen::CollectData | Screen::Edit => None,
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Screen::CollectData => "collectData",
            Screen::Edit => "edit",
            Screen::Ttps => "ttps",
            Screen::Tracker => "tracker",
            Screen::One45 => "one45",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Context form
// =============================================================================

/// Rotation fields exactly as the user supplied them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextForm {
    #[serde(default)]
    pub rotation: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub academic_year: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ContextForm {
    /// Resolve every field. Absent fields are `ContextError::Missing`.
    pub fn to_context(&self) -> ContextResult<RotationContext> {
        let rotation: RotationCode = present(&self.rotation)
            .ok_or(ContextError::Missing("rotation"))?
            .parse()?;
        let location: Location = present(&self.location)
            .ok_or(ContextError::Missing("location"))?
            .parse()?;
        let start_date = self.start_date.ok_or(ContextError::Missing("start date"))?;
        let end_date = self.end_date.ok_or(ContextError::Missing("end date"))?;
        let academic_year: AcademicYear = present(&self.academic_year)
            .ok_or(ContextError::Missing("academic year"))?
            .parse()?;

        RotationContext::new(rotation, location, start_date, end_date, academic_year)
    }

    /// Check the fields that are present; absent ones are not an error here.
    pub fn validate(&self) -> ContextResult<()> {
        if let Some(rotation) = present(&self.rotation) {
            rotation.parse::<RotationCode>()?;
        }
        if let Some(location) = present(&self.location) {
            location.parse::<Location>()?;
        }
        if let Some(year) = present(&self.academic_year) {
            year.parse::<AcademicYear>()?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ContextError::DateOrder {
                    start: start.format(DATE_FORMAT).to_string(),
                    end: end.format(DATE_FORMAT).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Fill absent fields from the default policy, leaving supplied values as-is.
    pub fn fill_missing(mut self, today: NaiveDate) -> Self {
        let fallback = FormDefaults::resolve(&self, today).to_form();
        if present(&self.rotation).is_none() {
            self.rotation = fallback.rotation;
        }
        if present(&self.location).is_none() {
            self.location = fallback.location;
        }
        if present(&self.academic_year).is_none() {
            self.academic_year = fallback.academic_year;
        }
        self.start_date = self.start_date.or(fallback.start_date);
        self.end_date = self.end_date.or(fallback.end_date);
        self
    }
}

// =============================================================================
// Actions and notices
// =============================================================================

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Collect-data form submitted. Without an upload the previously
    /// cleaned table is reused.
    Submit {
        upload: Option<Upload>,
        form: ContextForm,
    },
    /// Splice blank rows into the table being edited.
    InsertRows { index: usize, count: usize },
    /// Replace the table with the editor's contents.
    Edit { table: RotationTable },
    /// Open an output screen, optionally saving edits first.
    Show {
        kind: OutputKind,
        table: Option<RotationTable>,
    },
    /// Go back one screen, optionally saving edits first.
    Return { table: Option<RotationTable> },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Submit { .. } => "submit",
            Action::InsertRows { .. } => "insertRows",
            Action::Edit { .. } => "edit",
            Action::Show { .. } => "show",
            Action::Return { .. } => "return",
        }
    }
}

/// Message displayed on the next screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: LogLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into() }
    }
}

/// Last output produced for each shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs {
    ttps: Option<OutputTable>,
    tracker: Option<OutputTable>,
    one45: Option<OutputTable>,
}

impl Outputs {
    pub fn get(&self, kind: OutputKind) -> Option<&OutputTable> {
        match kind {
            OutputKind::Ttps => self.ttps.as_ref(),
            OutputKind::Tracker => self.tracker.as_ref(),
            OutputKind::One45 => self.one45.as_ref(),
        }
    }

    pub fn set(&mut self, output: OutputTable) {
        let slot = match output.kind {
            OutputKind::Ttps => &mut self.ttps,
            OutputKind::Tracker => &mut self.tracker,
            OutputKind::One45 => &mut self.one45,
        };
        *slot = Some(output);
    }
}

// =============================================================================
// Session context
// =============================================================================

/// Everything one wizard session knows, as of one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionContext {
    screen: Screen,
    form: ContextForm,
    source: Option<String>,
    table: Option<RotationTable>,
    cleaned: Option<RotationTable>,
    outputs: Outputs,
    notice: Option<Notice>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn form(&self) -> &ContextForm {
        &self.form
    }

    /// Name of the uploaded file the table came from.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn table(&self) -> Option<&RotationTable> {
        self.table.as_ref()
    }

    /// Table cleaned on the last return from the editor.
    pub fn cleaned(&self) -> Option<&RotationTable> {
        self.cleaned.as_ref()
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// Output displayed on the current screen.
    pub fn current_output(&self) -> Option<&OutputTable> {
        self.screen.output_kind().and_then(|kind| self.outputs.get(kind))
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Compute the context that follows `action`.
    pub fn transition(&self, action: Action, options: &ExtractOptions) -> SessionResult<Self> {
        let from = self.screen;
        let name = action.name();
        let mut next = self.clone();
        next.notice = None;

        match (from, action) {
            (Screen::CollectData, Action::Submit { upload, form }) => {
                next.submit(upload, form, options)?;
            }
            (Screen::Edit, Action::InsertRows { index, count }) => match next.table.take() {
                Some(table) => {
                    next.table = Some(insert_blank_rows(&table, index, count)?);
                    next.notice = Some(Notice::success(format!(
                        "Inserted {} row(s) at index {}.",
                        count, index
                    )));
                }
                None => next.reset(Notice::error(TABLE_NOT_FOUND)),
            },
            (Screen::Edit, Action::Edit { table }) => {
                next.table = Some(table);
            }
            (Screen::Edit, Action::Show { kind, table }) => {
                if table.is_some() {
                    next.table = table;
                }
                next.show(kind)?;
            }
            (Screen::Edit, Action::Return { table }) => {
                if table.is_some() {
                    next.table = table;
                }
                match next.table.as_ref() {
                    Some(table) => {
                        next.cleaned = Some(clean(table));
                        next.screen = Screen::CollectData;
                    }
                    None => next.reset(Notice::error(TABLE_NOT_FOUND)),
                }
            }
            (Screen::Ttps | Screen::Tracker | Screen::One45, Action::Return { .. }) => {
                if next.table.is_some() {
                    next.screen = Screen::Edit;
                } else {
                    next.reset(Notice::error(TABLE_NOT_FOUND));
                }
            }
            (screen, action) => {
                return Err(SessionError::InvalidAction {
                    screen: screen.to_string(),
                    action: action.name().to_string(),
                });
            }
        }

        log_info(format!("🔀 {} --{}--> {}", from, name, next.screen));
        Ok(next)
    }

    fn submit(
        &mut self,
        upload: Option<Upload>,
        form: ContextForm,
        options: &ExtractOptions,
    ) -> SessionResult<()> {
        if upload.is_none() && self.cleaned.is_none() {
            return Err(SessionError::MissingInput("file"));
        }
        if present(&form.rotation).is_none() {
            return Err(SessionError::MissingInput("rotation"));
        }
        form.validate()?;

        match upload {
            Some(upload) => {
                let extraction = extract_bytes(&upload.bytes, options)?;
                self.table = Some(extraction.table);
                self.source = upload.name;
            }
            None => {
                self.table = self.cleaned.clone();
            }
        }

        self.form = form;
        self.outputs = Outputs::default();
        self.screen = Screen::Edit;
        Ok(())
    }

    fn show(&mut self, kind: OutputKind) -> SessionResult<()> {
        let Some(table) = self.table.as_ref() else {
            self.reset(Notice::error(TABLE_NOT_FOUND));
            return Ok(());
        };

        let context = if kind.needs_context() {
            match self.form.to_context() {
                Ok(context) => Some(context),
                Err(e) => {
                    log_warning(format!("Cannot build {} output: {}", kind.title(), e));
                    self.reset(Notice::warning(format!(
                        "{}. Please complete the rotation details.",
                        e
                    )));
                    return Ok(());
                }
            }
        } else {
            None
        };

        let output = clean_and_shape(kind, table, context.as_ref())?;
        self.outputs.set(output);
        self.notice = kind.note().map(Notice::info);
        self.screen = Screen::for_output(kind);
        Ok(())
    }

    fn reset(&mut self, notice: Notice) {
        log_warning(&notice.message);
        self.screen = Screen::CollectData;
        self.notice = Some(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use crate::transform::TTPS_SENTINEL;

    const CSV: &str = "Preceptor,Email,Discipline,Site,# Students,Notes\n\
        Dr. Jane Smith,jane@x.ca,Family Medicine,VGH,2,\n\
        Dr. Bob Lee,bob@x.ca,Surgery,SPH,1,* Cannot Input into TTP *\n\
        Dr. Ann Wu,ann@x.ca,Pediatrics,SMH,3,\n";

    fn upload(content: &str) -> Option<Upload> {
        Some(Upload {
            name: Some("block.csv".to_string()),
            bytes: content.as_bytes().to_vec(),
        })
    }

    fn full_form() -> ContextForm {
        ContextForm {
            rotation: Some("C1".into()),
            location: Some("VGH".into()),
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 9, 28),
            academic_year: Some("2025-2026".into()),
        }
    }

    fn editing() -> SessionContext {
        SessionContext::new()
            .transition(
                Action::Submit { upload: upload(CSV), form: full_form() },
                &ExtractOptions::default(),
            )
            .unwrap()
    }

    fn step(session: &SessionContext, action: Action) -> SessionResult<SessionContext> {
        session.transition(action, &ExtractOptions::default())
    }

    #[test]
    fn test_submit_requires_file_and_rotation() {
        let session = SessionContext::new();
        let err = step(&session, Action::Submit { upload: None, form: full_form() }).unwrap_err();
        assert!(matches!(err, SessionError::MissingInput("file")));

        let form = ContextForm { rotation: Some("  ".into()), ..full_form() };
        let err = step(&session, Action::Submit { upload: upload(CSV), form }).unwrap_err();
        assert!(matches!(err, SessionError::MissingInput("rotation")));
        assert_eq!(session.screen(), Screen::CollectData);
    }

    #[test]
    fn test_submit_moves_to_edit() {
        let session = editing();
        assert_eq!(session.screen(), Screen::Edit);
        assert_eq!(session.source(), Some("block.csv"));
        assert_eq!(session.table().unwrap().row_count(), 3);
        assert_eq!(session.form().rotation.as_deref(), Some("C1"));
    }

    #[test]
    fn test_submit_parse_failure_keeps_state() {
        let session = SessionContext::new();
        let err = step(
            &session,
            Action::Submit { upload: upload("a,b\n1,2\n"), form: full_form() },
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::Parse(_)));
        assert_eq!(session, SessionContext::new());
    }

    #[test]
    fn test_submit_rejects_invalid_context_fields() {
        let form = ContextForm { location: Some("Richmond".into()), ..full_form() };
        let err = step(&SessionContext::new(), Action::Submit { upload: upload(CSV), form })
            .unwrap_err();
        assert!(matches!(err, SessionError::Context(ContextError::Location(_))));
    }

    #[test]
    fn test_insert_rows() {
        let session = editing();
        let next = step(&session, Action::InsertRows { index: 1, count: 2 }).unwrap();
        let table = next.table().unwrap();
        assert_eq!(table.row_count(), 5);
        assert!(table.row(1).unwrap().iter().all(Cell::is_blank));
        assert!(table.row(2).unwrap().iter().all(Cell::is_blank));
        assert_eq!(table.get(3, "Preceptor"), Some(&Cell::text("Dr. Bob Lee")));
        assert_eq!(next.notice().unwrap().level, LogLevel::Success);

        let err = step(&session, Action::InsertRows { index: 4, count: 1 }).unwrap_err();
        assert!(matches!(err, SessionError::Range(_)));
        assert_eq!(session.table().unwrap().row_count(), 3);
    }

    #[test]
    fn test_show_ttps() {
        let next = step(&editing(), Action::Show { kind: OutputKind::Ttps, table: None }).unwrap();
        assert_eq!(next.screen(), Screen::Ttps);

        let output = next.current_output().unwrap();
        assert_eq!(output.table.row_count(), 2);
        assert_eq!(output.table.get(0, "Location"), Some(&Cell::text("VGH")));
        assert_eq!(output.table.get(1, "Rotation"), Some(&Cell::text("C1")));
        assert!(output
            .table
            .rows()
            .iter()
            .flatten()
            .all(|cell| cell.display() != TTPS_SENTINEL));
        assert_eq!(next.notice().unwrap().level, LogLevel::Info);
    }

    #[test]
    fn test_show_saves_edited_table() {
        let session = editing();
        let mut edited = session.table().unwrap().clone();
        edited.set(0, "Preceptor", Cell::text("  Dr. Jane Doe  "));

        let next = step(&session, Action::Show { kind: OutputKind::One45, table: Some(edited) })
            .unwrap();
        assert_eq!(next.screen(), Screen::One45);
        // raw edit is stored, output is built from the cleaned copy
        assert_eq!(next.table().unwrap().get(0, "Preceptor"), Some(&Cell::text("  Dr. Jane Doe  ")));
        let output = next.outputs().get(OutputKind::One45).unwrap();
        assert_eq!(output.table.get(0, "Last Name"), Some(&Cell::text("Doe")));
        assert_eq!(output.table.row_count(), 3);
    }

    #[test]
    fn test_show_with_incomplete_context_resets() {
        let form = ContextForm { location: None, ..full_form() };
        let session = step(&SessionContext::new(), Action::Submit { upload: upload(CSV), form })
            .unwrap();

        let next = step(&session, Action::Show { kind: OutputKind::Tracker, table: None }).unwrap();
        assert_eq!(next.screen(), Screen::CollectData);
        assert_eq!(next.notice().unwrap().level, LogLevel::Warning);
        assert!(next.outputs().get(OutputKind::Tracker).is_none());

        // One45 needs no context
        let next = step(&session, Action::Show { kind: OutputKind::One45, table: None }).unwrap();
        assert_eq!(next.screen(), Screen::One45);
    }

    #[test]
    fn test_edit_screen_without_table_resets() {
        let session = SessionContext { screen: Screen::Edit, ..SessionContext::default() };
        let next = step(&session, Action::Show { kind: OutputKind::One45, table: None }).unwrap();
        assert_eq!(next.screen(), Screen::CollectData);
        assert_eq!(next.notice().unwrap().message, TABLE_NOT_FOUND);
    }

    #[test]
    fn test_return_paths() {
        let shown = step(&editing(), Action::Show { kind: OutputKind::Tracker, table: None }).unwrap();
        let back = step(&shown, Action::Return { table: None }).unwrap();
        assert_eq!(back.screen(), Screen::Edit);

        let collected = step(&back, Action::Return { table: None }).unwrap();
        assert_eq!(collected.screen(), Screen::CollectData);
        let cleaned = collected.cleaned().unwrap();
        assert_eq!(cleaned.get(0, "# Students"), Some(&Cell::Number(2.0)));

        // resubmitting without an upload reuses the cleaned table
        let again = step(&collected, Action::Submit { upload: None, form: full_form() }).unwrap();
        assert_eq!(again.screen(), Screen::Edit);
        assert_eq!(again.table(), Some(cleaned));
    }

    #[test]
    fn test_invalid_actions() {
        let err = step(&SessionContext::new(), Action::InsertRows { index: 0, count: 1 })
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidAction { .. }));

        let shown = step(&editing(), Action::Show { kind: OutputKind::One45, table: None }).unwrap();
        let err = step(&shown, Action::Show { kind: OutputKind::Ttps, table: None }).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Action 'show' is not available on screen 'one45'"
        );
    }

    #[test]
    fn test_fill_missing_keeps_supplied_values() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let form = ContextForm { rotation: Some("B2".into()), ..ContextForm::default() };
        let filled = form.fill_missing(today);
        assert_eq!(filled.rotation.as_deref(), Some("B2"));
        assert_eq!(filled.location.as_deref(), Some("VGH"));
        assert_eq!(filled.start_date, Some(today));
        assert_eq!(filled.academic_year.as_deref(), Some("2026-2027"));
        assert!(filled.to_context().is_ok());
    }
}
