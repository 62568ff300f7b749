use axum::extract::{Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;

use crate::observability::metrics::get_metrics;
use crate::server::server::AppState;

/// Shared-secret gate; a no-op when no secret is configured.
///
/// The secret is accepted from the configured header or as
/// `Authorization: Bearer <secret>`.
pub async fn require_shared_secret(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(secret) = state.gate.secret() else {
        return next.run(request).await;
    };

    let headers = request.headers();
    let provided = headers
        .get(state.gate.secret_header.as_str())
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        });

    let authorized = matches!(provided, Some(provided) if secrets_match(provided, secret));
    if authorized {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "request rejected by shared-secret gate");
    get_metrics().await.gate_rejections.inc();
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized", "detail": "missing or invalid shared secret"})),
    )
        .into_response()
}

// compares every byte so timing does not reveal the matching prefix
fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
