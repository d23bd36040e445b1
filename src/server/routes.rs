//! HTTP route handlers for the relay.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{Instrument, debug, info_span, warn};

use crate::line::errors::LineError;
use crate::line::event::WebhookPayload;
use crate::line::signature::SIGNATURE_HEADER;

use super::state::AppState;
use super::webhook;

/// Create the router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/callback", post(callback))
        .with_state(state)
}

/// Greeting endpoint.
async fn index() -> &'static str {
    "hello world!"
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry.len(),
        "started_at": state.started_at,
    }))
}

/// LINE webhook endpoint.
///
/// The signature is checked against the raw body before anything is decoded;
/// a request that fails the check never reaches the conversation registry.
async fn callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, (StatusCode, String)> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("callback", %request_id);

    async move {
        match authenticate(&state, &headers, &body) {
            Ok(payload) => {
                webhook::dispatch(&state, &payload).await;
                Ok("OK")
            }
            Err(err) => {
                warn!("Rejected webhook: {err}");
                Err((StatusCode::BAD_REQUEST, err.to_string()))
            }
        }
    }
    .instrument(span)
    .await
}

fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<WebhookPayload, LineError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(LineError::MissingSignature)?;
    state.verifier.verify(body, signature)?;

    debug!("Request body: {}", String::from_utf8_lossy(body));
    Ok(serde_json::from_slice(body)?)
}
