//! Request guards for API routes.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::error::ErrorResponse;
use crate::nonce::NONCE_HEADER;
use crate::state::AppState;

/// Reject requests without a current form nonce in the `x-tpv-nonce` header.
pub async fn require_nonce(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let nonce = match request.headers().get(NONCE_HEADER) {
        Some(header) => match header.to_str() {
            Ok(s) => s,
            Err(_) => {
                return forbidden_response("Invalid nonce header encoding");
            }
        },
        None => {
            return forbidden_response("Missing nonce");
        }
    };

    if !state.nonces.verify(nonce, Utc::now()) {
        tracing::warn!(uri = %request.uri(), "Rejected request with stale or forged nonce");
        return forbidden_response("Invalid or expired nonce");
    }

    next.run(request).await
}

/// Helper to create a forbidden (403) response.
fn forbidden_response(message: &str) -> Response {
    let body = ErrorResponse::new("FORBIDDEN", message);
    (StatusCode::FORBIDDEN, Json(body)).into_response()
}
