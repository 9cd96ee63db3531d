//! Scribe HTTP REST API
//!
//! Axum-based HTTP server for the session-note lifecycle.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to an
//! inner function returning `(StatusCode, serde_json::Value)`. The inner
//! functions are directly testable without axum dispatch machinery.
//!
//! Endpoints:
//! - GET   /                         — liveness check, always `{"status": "healthy"}`
//! - GET   /health                   — health check with store status
//! - GET   /version                  — server version info
//! - POST  /session-notes/           — store a draft and generate the clinical note
//! - GET   /session-notes/{note_id}  — fetch a note with its lifecycle status
//! - PATCH /session-notes/{note_id}  — store the clinician's final note

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use scribe_core::contracts::{CreateNoteRequest, FinalizeNoteRequest};
use scribe_core::{NoteService, ScribeConfig, ScribeError};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub service: NoteService,
    pub config: ScribeConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let cors = build_cors_layer(&state.config.http.cors_origin);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/session-notes/", post(create_note_handler))
        .route(
            "/session-notes/:note_id",
            get(get_note_handler).patch(finalize_note_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS restricted to the one configured browser origin. Anything other than a
/// single `scheme://host[:port]` origin (including `*`, which tower-http refuses
/// to combine with credentials) yields a layer that allows no origins.
pub fn build_cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true);

    if !is_single_origin(origin) {
        tracing::warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
        return cors;
    }

    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

/// `http(s)://host[:port]` with no path, wildcard, list or whitespace.
pub fn is_single_origin(origin: &str) -> bool {
    let rest = match origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))
    {
        Some(rest) => rest,
        None => return false,
    };

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (rest, None),
    };

    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let port_ok = port.map_or(true, |p| p.parse::<u16>().is_ok());

    host_ok && port_ok
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    service: NoteService,
    config: ScribeConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(HttpState { service, config });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Scribe HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Error mapping
// ============================================================================

pub fn error_status(err: &ScribeError) -> StatusCode {
    match err {
        ScribeError::Validation(_) => StatusCode::BAD_REQUEST,
        ScribeError::NotFound(_) => StatusCode::NOT_FOUND,
        ScribeError::AlreadyGenerated(_) => StatusCode::CONFLICT,
        ScribeError::Persistence(_) | ScribeError::GenerationFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// `(status, body)` for a failed operation. Generation failures also report
/// the id of the draft that was kept.
pub fn error_response(err: &ScribeError) -> (StatusCode, serde_json::Value) {
    let mut body = serde_json::json!({
        "error": err.to_string(),
        "status": "error",
    });
    if let ScribeError::GenerationFailed { note_id, .. } = err {
        body["note_id"] = serde_json::json!(note_id);
    }
    (error_status(err), body)
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

pub fn root_inner() -> serde_json::Value {
    serde_json::json!({ "status": "healthy" })
}

/// Inner health check against the note store.
pub async fn health_inner(service: &NoteService) -> (StatusCode, serde_json::Value) {
    let store = service.store();
    match store.health().await {
        Ok(database) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "store": store.name(),
                "database": database,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "service": "scribe",
    })
}

pub async fn create_note_inner(
    service: &NoteService,
    req: CreateNoteRequest,
) -> (StatusCode, serde_json::Value) {
    match service.create_note(req).await {
        Ok(resp) => (StatusCode::OK, serde_json::json!(resp)),
        Err(e) => error_response(&e),
    }
}

pub async fn finalize_note_inner(
    service: &NoteService,
    note_id: i64,
    req: FinalizeNoteRequest,
) -> (StatusCode, serde_json::Value) {
    match service.finalize_note(note_id, req).await {
        Ok(resp) => (StatusCode::OK, serde_json::json!(resp)),
        Err(e) => error_response(&e),
    }
}

pub async fn get_note_inner(service: &NoteService, note_id: i64) -> (StatusCode, serde_json::Value) {
    match service.get_note(note_id).await {
        Ok(note) => {
            let mut body = serde_json::json!(note);
            body["status"] = serde_json::json!(note.status());
            (StatusCode::OK, body)
        }
        Err(e) => error_response(&e),
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(root_inner()))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.service).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

/// Extractor rejections (bad JSON, wrong content type, non-numeric id) become
/// the same JSON error body as a validation failure.
fn rejection_response(message: String) -> (StatusCode, serde_json::Value) {
    tracing::debug!(error = %message, "Request rejected before reaching the service");
    error_response(&ScribeError::Validation(message))
}

pub async fn create_note_handler(
    State(state): State<Arc<HttpState>>,
    req: std::result::Result<Json<CreateNoteRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match req {
        Ok(Json(req)) => create_note_inner(&state.service, req).await,
        Err(rejection) => rejection_response(rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn get_note_handler(
    State(state): State<Arc<HttpState>>,
    note_id: std::result::Result<Path<i64>, PathRejection>,
) -> impl IntoResponse {
    let (status, body) = match note_id {
        Ok(Path(note_id)) => get_note_inner(&state.service, note_id).await,
        Err(rejection) => rejection_response(rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn finalize_note_handler(
    State(state): State<Arc<HttpState>>,
    note_id: std::result::Result<Path<i64>, PathRejection>,
    req: std::result::Result<Json<FinalizeNoteRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match (note_id, req) {
        (Ok(Path(note_id)), Ok(Json(req))) => finalize_note_inner(&state.service, note_id, req).await,
        (Err(rejection), _) => rejection_response(rejection.body_text()),
        (_, Err(rejection)) => rejection_response(rejection.body_text()),
    };
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
