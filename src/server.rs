//! HTTP API over a single shared session.
//!
//! The session sits behind a `tokio::sync::Mutex`, so requests are served
//! one at a time, matching the console's request/response model.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/research/upload` | Replace the active document |
//! | `POST` | `/research/ask` | Ask a question about the active document |
//! | `POST` | `/timeline/analyze` | Build a timeline from raw artifacts |
//! | `POST` | `/timeline/ask` | Follow-up question about the timeline |
//! | `POST` | `/timeline/reset` | Clear the timeline workspace |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `backend_unavailable` (502).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::ChatError;
use crate::session::{Assistant, Session};

#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
    session: Arc<Mutex<Session>>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let assistant = Assistant::from_config(config)?;
    let session = Session::new(config.history.policy());
    let app = router(assistant, session);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        chat_model = %config.ollama.chat_model,
        "server started"
    );
    println!("Sherlock server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router around an assistant and its session.
pub fn router(assistant: Assistant, session: Session) -> Router {
    let state = AppState {
        assistant: Arc::new(assistant),
        session: Arc::new(Mutex::new(session)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/research/upload", post(handle_upload))
        .route("/research/ask", post(handle_research_ask))
        .route("/timeline/analyze", post(handle_timeline_analyze))
        .route("/timeline/ask", post(handle_timeline_ask))
        .route("/timeline/reset", post(handle_timeline_reset))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "backend_unavailable".to_string(),
            message: format!("{}. {}", err, err.remediation()),
        }
    }
}

fn require(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(bad_request(format!("{} must not be empty", field)));
    }
    Ok(())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /research/upload ============

#[derive(Deserialize)]
struct UploadRequest {
    name: String,
    text: String,
}

#[derive(Serialize)]
struct UploadResponse {
    chunks: usize,
    rebuilt: bool,
    message: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    require(&req.name, "name")?;

    let mut session = state.session.lock().await;
    let outcome = state
        .assistant
        .upload(&mut session, &req.name, &req.text)
        .await?;

    Ok(Json(UploadResponse {
        chunks: outcome.chunks(),
        rebuilt: outcome.rebuilt(),
        message: outcome.message(),
    }))
}

// ============ POST /research/ask ============

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    blocked: bool,
    segments: Vec<String>,
}

async fn handle_research_ask(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<AskResponse>, AppError> {
    require(&req.question, "question")?;

    let mut session = state.session.lock().await;
    let answer = state.assistant.ask(&mut session, &req.question).await?;

    Ok(Json(AskResponse {
        blocked: answer.verdict.is_blocked(),
        segments: answer.segments,
    }))
}

// ============ POST /timeline/* ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    input: String,
}

#[derive(Serialize)]
struct ReportResponse {
    report: String,
}

async fn handle_timeline_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    require(&req.input, "input")?;

    let mut session = state.session.lock().await;
    let report = state
        .assistant
        .analyze_timeline(&mut session, &req.input, |_| {})
        .await?;
    Ok(Json(ReportResponse { report }))
}

async fn handle_timeline_ask(
    State(state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    require(&req.question, "question")?;

    let mut session = state.session.lock().await;
    let report = state
        .assistant
        .follow_up_timeline(&mut session, &req.question, |_| {})
        .await?;
    Ok(Json(ReportResponse { report }))
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
}

async fn handle_timeline_reset(State(state): State<AppState>) -> Json<StatusResponse> {
    state.session.lock().await.reset_timeline();
    Json(StatusResponse {
        status: "reset".to_string(),
    })
}
