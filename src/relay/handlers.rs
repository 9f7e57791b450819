//! HTTP request handlers

use super::types::{ChatRequest, ErrorResponse};
use super::AppState;
use crate::error::{ChatError, ErrorKind};
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{
        header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Create the relay router.
///
/// Every response, errors and preflight included, carries permissive CORS
/// headers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(relay_chat).options(preflight))
        .route("/functions/v1/chat", post(relay_chat).options(preflight))
        .route("/health", get(health))
        .route("/version", get(get_version))
        // Conversations are unbounded; axum's 2 MB default would answer 413 text/plain
        .layer(DefaultBodyLimit::disable())
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .with_state(state)
}

// ============================================================
// Relay
// ============================================================

async fn relay_chat(State(state): State<AppState>, body: Bytes) -> Result<Response, RelayError> {
    // Parsed by hand so a malformed body gets the same `{error}` shape as
    // every other failure
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| ChatError::invalid_request(format!("Invalid request body: {e}")))?;

    let Some(api_key) = state.credential.resolve() else {
        return Err(ChatError::config(format!(
            "{} is not configured",
            state.credential.name()
        ))
        .into());
    };

    let upstream = state
        .upstream
        .open_stream(&api_key, &request.messages)
        .await?;

    tracing::info!(turns = request.messages.len(), "Relaying upstream stream");

    Ok((
        [(CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

// ============================================================
// Probes
// ============================================================

async fn health() -> &'static str {
    "ok"
}

async fn get_version() -> &'static str {
    concat!("chat-relay ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

/// Flattens any failure into `{error}` with the matching status
struct RelayError(ChatError);

impl From<ChatError> for RelayError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self.0.kind {
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(kind = ?self.0.kind, error = %self.0.message, "chat error");
        } else {
            tracing::warn!(kind = ?self.0.kind, error = %self.0.message, "Upstream refused request");
        }

        (status, Json(ErrorResponse::new(self.0.message))).into_response()
    }
}
