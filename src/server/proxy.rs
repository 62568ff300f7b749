use axum::body::Body;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header::CONTENT_TYPE, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::resolver::resolver::Resolution;
use crate::server::server::AppState;
use crate::sources::fetch::UpstreamResponse;
use crate::utils::constants::{HEADER_ATTEMPTS, HEADER_CANDIDATE, HEADER_UPSTREAM_URL};

/// `GET /proxy/{resource}`
pub async fn proxy_collection(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    relay(&state, &resource, None, query.as_deref()).await
}

/// `GET /proxy/{resource}/{id}`
pub async fn proxy_entity(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Response {
    relay(&state, &resource, Some(&id), query.as_deref()).await
}

async fn relay(state: &AppState, resource: &str, id: Option<&str>, query: Option<&str>) -> Response {
    let proxy = &state.proxy_state;
    match proxy.resolver.resolve(resource, id, query, &proxy.tokens).await {
        Ok(resolution) => resolution_response(resolution),
        Err(err) => err.into_response(),
    }
}

/// Upstream status, content type and body unchanged, plus diagnostic headers.
pub fn resolution_response(resolution: Resolution) -> Response {
    let mut response = Response::new(Body::from(resolution.body));
    *response.status_mut() = resolution.status;

    let headers = response.headers_mut();
    if let Some(content_type) = resolution.content_type.as_deref() {
        insert_header(headers, CONTENT_TYPE, content_type);
    }
    insert_header(headers, HeaderName::from_static(HEADER_ATTEMPTS), &resolution.attempts.to_string());
    if let Some(candidate) = resolution.candidate.as_deref() {
        insert_header(headers, HeaderName::from_static(HEADER_CANDIDATE), candidate);
    }
    if let Some(url) = resolution.upstream_url.as_deref() {
        insert_header(headers, HeaderName::from_static(HEADER_UPSTREAM_URL), url);
    }
    response
}

/// Raw upstream answer, used by the schema passthrough routes.
pub fn upstream_response(upstream: UpstreamResponse, path: &str) -> Response {
    let mut response = Response::new(Body::from(upstream.body));
    *response.status_mut() = upstream.status;
    let headers = response.headers_mut();
    if let Some(content_type) = upstream.content_type.as_deref() {
        insert_header(headers, CONTENT_TYPE, content_type);
    }
    insert_header(headers, HeaderName::from_static(HEADER_CANDIDATE), path);
    response
}

// values that are not valid header text are dropped
fn insert_header(headers: &mut axum::http::HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
