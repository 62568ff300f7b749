use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by token management and resource resolution.
///
/// A resolution where every candidate misses is not an error: it is relayed
/// as a normal [`crate::resolver::resolver::Resolution`] with the last
/// upstream status and body.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("upstream login failed ({}): {body}", describe_status(.status))]
    UpstreamAuth { status: Option<u16>, body: String },

    #[error("resource '{0}' is not permitted")]
    NotPermitted(String),

    #[error("invalid entity id '{0}'")]
    InvalidId(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::UpstreamAuth { .. } => StatusCode::BAD_GATEWAY,
            ProxyError::NotPermitted(_) => StatusCode::FORBIDDEN,
            ProxyError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Configuration(_) => "configuration_error",
            ProxyError::UpstreamAuth { .. } => "upstream_auth_error",
            ProxyError::NotPermitted(_) => "not_permitted",
            ProxyError::InvalidId(_) => "invalid_id",
            ProxyError::Transport(_) => "transport_error",
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Transport(err.to_string())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut payload = json!({
            "error": self.kind(),
            "detail": self.to_string(),
        });
        if let ProxyError::UpstreamAuth { status, body } = &self {
            payload["upstream_status"] = json!(status);
            payload["upstream_body"] = json!(body);
        }
        (self.status_code(), Json(payload)).into_response()
    }
}

fn describe_status(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "no response".to_owned())
}

pub type ProxyResult<T> = Result<T, ProxyError>;
