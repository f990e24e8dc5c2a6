//! HTTP surface of the gateway.
//!
//! Maps pipeline errors to JSON envelopes, wires the admin surface, and
//! installs the cross-cutting layers: permissive CORS, a per-request
//! tracing span carrying a generated request id, and a panic-recovery
//! boundary that turns any unexpected fault into a plain 500.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info_span, Instrument};

use crate::admin;
use crate::auth::KeyValidator;
use crate::error::Error;
use crate::keystore::KeyStore;
use crate::pipeline::VerificationPipeline;

/// Shared state handed to every handler.
pub struct AppState {
    /// The verification pipeline.
    pub pipeline: VerificationPipeline,
    /// Validator reused by the admin surface.
    pub validator: KeyValidator,
    /// Key store for admin CRUD.
    pub keystore: Arc<dyn KeyStore>,
    /// Server start time, reported by `/health`.
    pub started_at: Instant,
}

/// Build the gateway router.
#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/verify", post(verify))
        .route("/admin/add-key", post(admin::add_key))
        .route("/admin/remove-key", post(admin::remove_key))
        .route("/admin/get-key", post(admin::get_key))
        .route("/health", get(health))
        .layer(middleware::from_fn(request_span))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(recover_panic))
        .with_state(state)
}

/// Wrap each request in a span carrying a generated request id.
async fn request_span(request: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().simple());
    let span = info_span!("request", request_id = %request_id);
    next.run(request).instrument(span).await
}

/// Recovery boundary: unexpected faults become a generic 500.
fn recover_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// `POST /verify`: the verification pipeline entry point.
async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match state.pipeline.handle(auth_header(&headers), &body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// `GET /health`.
async fn health(State(state): State<Arc<AppState>>) -> Response {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.started_at.elapsed().as_secs_f64(),
        "cached_entries": state.pipeline.cache().len(),
    }))
    .into_response()
}

/// Convert a pipeline error into its HTTP envelope.
///
/// Verification failure is a 200; only pipeline and infrastructure faults
/// reach this function. Client faults map to 4xx, backend faults to 500.
pub fn error_response(err: &Error) -> Response {
    let (status, message) = match err {
        Error::BadRequest | Error::MissingField(_) | Error::UnsupportedModel(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        Error::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason.clone()),
        Error::Forbidden(reason) => (StatusCode::FORBIDDEN, reason.clone()),
        Error::NotFound(reason) => (StatusCode::NOT_FOUND, reason.clone()),
        Error::Conflict(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
        Error::Upstream(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Verification service error: {detail}"),
        ),
        Error::KeyStore(_) | Error::Config(_) | Error::Io(_) => {
            error!(error = %err, "internal error while handling request");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    (
        status,
        Json(json!({"verified": false, "error": message})),
    )
        .into_response()
}
