use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::error::ProxyResult;
use crate::server::proxy::upstream_response;
use crate::server::server::AppState;

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub token_preview: String,
    pub expires_at: Option<String>,
    pub expires_at_ms: i64,
}

/// `GET /auth/status`: logs in if needed, never reveals the full token.
pub async fn auth_status(State(state): State<AppState>) -> Response {
    let tokens = &state.proxy_state.tokens;
    if let Err(err) = tokens.get_token().await {
        return err.into_response();
    }
    match tokens.snapshot().await {
        Some(token) => Json(AuthStatus {
            authenticated: true,
            token_preview: token.preview(),
            expires_at: token.expires_at_rfc3339(),
            expires_at_ms: token.expires_at_ms,
        })
        .into_response(),
        None => Json(json!({"authenticated": false})).into_response(),
    }
}

/// `GET /schema/metadata`
pub async fn schema_metadata(State(state): State<AppState>) -> Response {
    let path = state.proxy_state.discovery.config().metadata_path.clone();
    passthrough(&state, &path, "application/xml").await.unwrap_or_else(IntoResponse::into_response)
}

/// `GET /schema/service`
pub async fn schema_service(State(state): State<AppState>) -> Response {
    let path = state.proxy_state.discovery.config().service_path.clone();
    passthrough(&state, &path, "application/json").await.unwrap_or_else(IntoResponse::into_response)
}

async fn passthrough(state: &AppState, path: &str, accept: &str) -> ProxyResult<Response> {
    let proxy = &state.proxy_state;
    let token = proxy.tokens.get_token().await?;
    let upstream = proxy.discovery.fetch_raw(path, accept, &token).await?;
    Ok(upstream_response(upstream, path))
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
