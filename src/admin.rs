//! Administrative API-key CRUD surface.
//!
//! Every endpoint requires an admin credential. Key issuance generates a
//! 32-character alphanumeric value; callers never pick their own keys.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Error;
use crate::keystore::ApiKey;
use crate::server::{error_response, AppState};

/// Length of generated API key values.
const KEY_LENGTH: usize = 32;

/// Body shape shared by all admin endpoints.
#[derive(Debug, Deserialize)]
struct HotkeyRequest {
    #[serde(default)]
    hotkey: String,
}

fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

fn parse_hotkey(body: &[u8]) -> Result<String, Response> {
    let request: HotkeyRequest = serde_json::from_slice(body)
        .map_err(|_| error_response(&Error::BadRequest))?;
    if request.hotkey.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "hotkey is required"})),
        )
            .into_response());
    }
    Ok(request.hotkey)
}

fn duplicate_hotkey_response(hotkey: &str) -> Response {
    warn!(hotkey, "attempted to create duplicate hotkey");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Hotkey already exists. Use a different hotkey or remove the existing one first."
        })),
    )
        .into_response()
}

fn generate_key_value() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// `POST /admin/add-key`: issue a new non-admin key for a hotkey.
pub async fn add_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if let Err(err) = state.validator.require_admin(auth_header(&headers)).await {
        return error_response(&err);
    }
    let hotkey = match parse_hotkey(&body) {
        Ok(hotkey) => hotkey,
        Err(response) => return response,
    };

    match state.keystore.lookup_by_hotkey(&hotkey).await {
        Ok(Some(_)) => return duplicate_hotkey_response(&hotkey),
        Ok(None) => {}
        Err(err) => return error_response(&err),
    }

    let record = ApiKey::new(hotkey, generate_key_value());
    if let Err(err) = state.keystore.insert(&record).await {
        // A concurrent add-key can win between the lookup above and this
        // insert; the store reports that as a conflict, not a failure.
        if matches!(err, Error::Conflict(_)) {
            return duplicate_hotkey_response(&record.hotkey);
        }
        return error_response(&err);
    }

    info!(hotkey = %record.hotkey, "API key created");
    (StatusCode::OK, Json(record)).into_response()
}

/// `POST /admin/remove-key`: delete the key for a hotkey.
pub async fn remove_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if let Err(err) = state.validator.require_admin(auth_header(&headers)).await {
        return error_response(&err);
    }
    let hotkey = match parse_hotkey(&body) {
        Ok(hotkey) => hotkey,
        Err(response) => return response,
    };

    match state.keystore.remove(&hotkey).await {
        Ok(true) => {
            info!(hotkey, "API key removed");
            (
                StatusCode::OK,
                Json(json!({"message": "API key removed successfully"})),
            )
                .into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "API key not found"})),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

/// `POST /admin/get-key`: look up the key value for a hotkey.
pub async fn get_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if let Err(err) = state.validator.require_admin(auth_header(&headers)).await {
        return error_response(&err);
    }
    let hotkey = match parse_hotkey(&body) {
        Ok(hotkey) => hotkey,
        Err(response) => return response,
    };

    match state.keystore.lookup_by_hotkey(&hotkey).await {
        Ok(Some(record)) => (
            StatusCode::OK,
            Json(json!({"hotkey": record.hotkey, "key_value": record.key_value})),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "API key not found"})),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}
