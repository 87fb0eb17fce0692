//! HTTP server for the rotation wizard.
//!
//! Each session lives in memory, keyed by a UUID handed out on upload.
//! Past `max_sessions` the least recently updated session is evicted.
//! Handlers translate requests into [`Action`]s and swap in the context
//! returned by [`SessionContext::transition`].
//!
//! # API Endpoints
//!
//! | Method | Path                              | Description                      |
//! |--------|-----------------------------------|----------------------------------|
//! | GET    | `/health`                         | Health check                     |
//! | GET    | `/api/defaults`                   | Resolved form defaults           |
//! | POST   | `/api/sessions`                   | Upload file + form (multipart)   |
//! | GET    | `/api/sessions/{id}`              | Current session view             |
//! | DELETE | `/api/sessions/{id}`              | Drop a session                   |
//! | POST   | `/api/sessions/{id}/submit`       | Resubmit the form (multipart)    |
//! | POST   | `/api/sessions/{id}/rows`         | Insert blank rows                |
//! | PUT    | `/api/sessions/{id}/table`        | Save the edited table            |
//! | POST   | `/api/sessions/{id}/show/{kind}`  | Open the ttps/tracker/one45 view |
//! | POST   | `/api/sessions/{id}/return`       | Go back one screen               |
//! | GET    | `/api/logs`                       | SSE stream for real-time logs    |

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post, put},
    Router,
};
use chrono::Local;
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{
    collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration,
};
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, InsertRowsRequest, SessionView, TableRequest};
use crate::config::Config;
use crate::error::{ParseError, ServerError, ServerResult, SessionError};
use crate::models::context::parse_date;
use crate::models::{OutputKind, RotationTable};
use crate::parser::ExtractOptions;
use crate::session::{Action, ContextForm, FormDefaults, SessionContext, Upload};

#[derive(Debug)]
struct StoredSession {
    session: SessionContext,
    updated: u64,
}

/// In-memory sessions with a least-recently-updated eviction order.
#[derive(Debug, Default)]
struct SessionStore {
    entries: HashMap<Uuid, StoredSession>,
    tick: u64,
}

impl SessionStore {
    fn get(&self, id: &Uuid) -> Option<&SessionContext> {
        self.entries.get(id).map(|entry| &entry.session)
    }

    /// Insert or replace a session, then evict down to `capacity`.
    fn put(&mut self, id: Uuid, session: SessionContext, capacity: usize) {
        self.tick += 1;
        self.entries.insert(
            id,
            StoredSession {
                session,
                updated: self.tick,
            },
        );

        while self.entries.len() > capacity.max(1) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.updated)
                .map(|(id, _)| *id);
            match oldest {
                Some(old) => {
                    self.entries.remove(&old);
                    log_info(format!("🗑️  Evicted idle session {}", old));
                }
                None => break,
            }
        }
    }

    fn remove(&mut self, id: &Uuid) -> Option<SessionContext> {
        self.entries.remove(id).map(|entry| entry.session)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<RwLock<SessionStore>>,
    options: Arc<ExtractOptions>,
    max_upload_bytes: usize,
    max_sessions: usize,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            sessions: Arc::default(),
            options: Arc::new(config.extract_options()),
            max_upload_bytes: config.max_upload_bytes,
            max_sessions: config.max_sessions,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Session(SessionError::Parse(ParseError::Io(_))) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::Session(_) => StatusCode::BAD_REQUEST,
        };
        if status.is_server_error() {
            log_error(self.to_string());
        }
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/defaults", get(defaults))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/submit", post(resubmit))
        .route("/api/sessions/{id}/rows", post(insert_rows))
        .route("/api/sessions/{id}/table", put(save_table))
        .route("/api/sessions/{id}/show/{kind}", post(show_output))
        .route("/api/sessions/{id}/return", post(return_back))
        .route("/api/logs", get(sse_logs))
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::new(config.host, config.port);
    let app = router(AppState::new(&config));

    println!("🚀 Rotaprep server running on http://{}", addr);
    println!("   POST /api/sessions              - Upload rotation spreadsheet");
    println!("   POST /api/sessions/{{id}}/submit  - Resubmit the collect-data form");
    println!("   POST /api/sessions/{{id}}/show/*  - ttps | tracker | one45");
    println!("   GET  /api/logs                  - SSE log stream");
    println!("   GET  /health                    - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "rotaprep",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Form defaults, seeded with whatever the client already has.
async fn defaults(Query(form): Query<ContextForm>) -> Json<FormDefaults> {
    Json(FormDefaults::resolve(&form, Local::now().date_naive()))
}

/// Upload a spreadsheet with the collect-data form and open a session.
async fn create_session(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ServerResult<Json<SessionView>> {
    let (upload, form) = read_submission(multipart).await?;

    log_info(format!(
        "📄 New upload: {}",
        upload
            .as_ref()
            .and_then(|u| u.name.as_deref())
            .unwrap_or("(none)")
    ));

    let session = SessionContext::new().transition(Action::Submit { upload, form }, &state.options)?;

    let id = Uuid::new_v4();
    let view = SessionView::new(id, &session);
    state
        .sessions
        .write()
        .await
        .put(id, session, state.max_sessions);
    Ok(Json(view))
}

/// Submit the collect-data form again for an existing session. Without a
/// file the table cleaned on the last return from the editor is reused.
async fn resubmit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ServerResult<Json<SessionView>> {
    let (upload, form) = read_submission(multipart).await?;
    apply(&state, id, Action::Submit { upload, form }).await
}

async fn read_submission(mut multipart: Multipart) -> ServerResult<(Option<Upload>, ContextForm)> {
    let mut upload = None;
    let mut form = ContextForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            // browsers send an empty part when no file was picked
            if !bytes.is_empty() || file_name.as_deref().is_some_and(|n| !n.is_empty()) {
                upload = Some(Upload {
                    name: file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }

        match name.as_str() {
            "rotation" => form.rotation = Some(value),
            "location" => form.location = Some(value),
            "academicYear" | "academic_year" => form.academic_year = Some(value),
            "startDate" | "start_date" => form.start_date = Some(parse_form_date(&value)?),
            "endDate" | "end_date" => form.end_date = Some(parse_form_date(&value)?),
            _ => {}
        }
    }

    Ok((upload, form))
}

fn parse_form_date(value: &str) -> ServerResult<chrono::NaiveDate> {
    parse_date(value).map_err(|e| ServerError::BadRequest(e.to_string()))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServerResult<Json<SessionView>> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&id)
        .ok_or_else(|| ServerError::NotFound(id.to_string()))?;
    Ok(Json(SessionView::new(id, session)))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ServerResult<StatusCode> {
    state
        .sessions
        .write()
        .await
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ServerError::NotFound(id.to_string()))
}

async fn insert_rows(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<InsertRowsRequest>,
) -> ServerResult<Json<SessionView>> {
    apply(
        &state,
        id,
        Action::InsertRows {
            index: request.index,
            count: request.count,
        },
    )
    .await
}

async fn save_table(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(table): Json<RotationTable>,
) -> ServerResult<Json<SessionView>> {
    apply(&state, id, Action::Edit { table }).await
}

async fn show_output(
    State(state): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
    body: Bytes,
) -> ServerResult<Json<SessionView>> {
    let kind: OutputKind = kind.parse().map_err(ServerError::BadRequest)?;
    let table = optional_table(&body)?;
    apply(&state, id, Action::Show { kind, table }).await
}

async fn return_back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> ServerResult<Json<SessionView>> {
    let table = optional_table(&body)?;
    apply(&state, id, Action::Return { table }).await
}

/// An empty body means "no edits to save".
fn optional_table(body: &[u8]) -> ServerResult<Option<RotationTable>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let request: TableRequest = serde_json::from_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("Invalid table: {}", e)))?;
    Ok(request.table)
}

/// Run one transition under the store's write lock.
async fn apply(state: &AppState, id: Uuid, action: Action) -> ServerResult<Json<SessionView>> {
    let mut sessions = state.sessions.write().await;
    let current = sessions
        .get(&id)
        .ok_or_else(|| ServerError::NotFound(id.to_string()))?;

    let next = current.transition(action, &state.options)?;
    let view = SessionView::new(id, &next);
    sessions.put(id, next, state.max_sessions);
    Ok(Json(view))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
