//! Request and response bodies for the HTTP API.
//!
//! Every table in a response has already been through
//! [`RotationTable::for_display`], so `# Students` arrives as text.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{OutputKind, OutputTable, RotationTable};
use crate::session::{ContextForm, Notice, Screen, SessionContext};
use crate::transform::MAX_INSERT_ROWS;

/// Snapshot of one wizard session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub screen: Screen,
    pub form: ContextForm,
    /// Uploaded file name
    pub source: Option<String>,
    /// Table being edited
    pub table: Option<RotationTable>,
    /// Whether a cleaned table can be reused on the next submit
    pub has_cleaned: bool,
    /// Output for the current screen, if it is an output screen
    pub output: Option<OutputView>,
    pub notice: Option<Notice>,
    pub max_insert_rows: usize,
}

impl SessionView {
    pub fn new(id: Uuid, session: &SessionContext) -> Self {
        Self {
            id,
            screen: session.screen(),
            form: session.form().clone(),
            source: session.source().map(str::to_string),
            table: session.table().map(RotationTable::for_display),
            has_cleaned: session.cleaned().is_some(),
            output: session.current_output().map(OutputView::from),
            notice: session.notice().cloned(),
            max_insert_rows: MAX_INSERT_ROWS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputView {
    pub kind: OutputKind,
    pub title: &'static str,
    pub note: Option<&'static str>,
    pub row_count: usize,
    pub table: RotationTable,
}

impl From<&OutputTable> for OutputView {
    fn from(output: &OutputTable) -> Self {
        Self {
            kind: output.kind,
            title: output.kind.title(),
            note: output.kind.note(),
            row_count: output.table.row_count(),
            table: output.table.for_display(),
        }
    }
}

/// Body of `POST /api/sessions/{id}/rows`.
#[derive(Debug, Clone, Deserialize)]
pub struct InsertRowsRequest {
    pub index: usize,
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    1
}

/// Optional body of the show and return endpoints: the editor's table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableRequest {
    #[serde(default)]
    pub table: Option<RotationTable>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
