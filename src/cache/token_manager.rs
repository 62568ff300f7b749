use std::sync::Arc;

use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::cache::token::Token;
use crate::config::vendor::{AuthConfig, Credentials, VendorConfig};
use crate::error::{ProxyError, ProxyResult};
use crate::helpers::time::{get_instant, now_ms};
use crate::observability::metrics::get_metrics;
use crate::parser::login::parse_login_response;
use crate::sources::fetch::{Fetch, HttpFetcher, UpstreamRequest};

static SUCCESS_MSG: &str = "success";
static ERROR_MSG: &str = "error";

/// Process-wide owner of the vendor bearer token.
///
/// The token is refreshed on demand when the cache is empty or within the
/// safety margin of expiring. Concurrent callers that find the cache stale
/// share a single login.
pub struct TokenManager<F = HttpFetcher> {
    fetcher: Arc<F>,
    vendor: Arc<VendorConfig>,
    auth: AuthConfig,
    state: RwLock<Option<Token>>,
    refresh: Mutex<()>,
}

impl<F: Fetch> TokenManager<F> {
    pub fn new(fetcher: Arc<F>, vendor: Arc<VendorConfig>, auth: AuthConfig) -> Self {
        Self {
            fetcher,
            vendor,
            auth,
            state: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    fn safety_margin_ms(&self) -> i64 {
        (self.auth.safety_margin_seconds as i64).saturating_mul(1000)
    }

    /// Cached token if it is still outside the safety margin.
    async fn cached(&self) -> Option<String> {
        let margin = self.safety_margin_ms();
        self.state
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh(now_ms(), margin))
            .map(|token| token.value.clone())
    }

    /// Return a usable bearer token, logging in when needed.
    pub async fn get_token(&self) -> ProxyResult<String> {
        if let Some(value) = self.cached().await {
            return Ok(value);
        }

        let _guard = self.refresh.lock().await;
        // another caller may have refreshed while we waited
        if let Some(value) = self.cached().await {
            debug!("token refreshed by concurrent caller");
            return Ok(value);
        }

        let token = self.login().await?;
        let value = token.value.clone();
        get_metrics().await.token_expiry_unix.set(token.expires_at_ms / 1000);
        *self.state.write().await = Some(token);
        Ok(value)
    }

    /// Current token state without refreshing.
    pub async fn snapshot(&self) -> Option<Token> {
        self.state.read().await.clone()
    }

    async fn login(&self) -> ProxyResult<Token> {
        let credentials = Credentials::from_vendor(&self.vendor)?;
        let base_url = self.vendor.base_url()?;
        let url = reqwest::Url::parse(&format!("{}{}", base_url, self.auth.login_path))
            .map_err(|e| ProxyError::Configuration(format!("invalid login url: {}", e)))?;

        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        let request = UpstreamRequest::post_json(url.clone(), &body)
            .header(&self.vendor.api_key_header, &credentials.api_key)?
            .header("accept", "application/json")?;

        let metrics = get_metrics().await;
        let start = get_instant();
        info!(url = %url, "logging in to vendor");

        let result = match self.fetcher.fetch(request).await {
            Ok(response) if response.status.is_success() => {
                parse_login_response(&response.body_text(), &self.auth, now_ms())
            }
            Ok(response) => Err(ProxyError::UpstreamAuth {
                status: Some(response.status.as_u16()),
                body: response.body_text(),
            }),
            Err(err) => Err(ProxyError::UpstreamAuth {
                status: None,
                body: err.to_string(),
            }),
        };

        metrics.login_duration.observe(start.elapsed().as_secs_f64());
        match &result {
            Ok(token) => {
                metrics.login_requests.with_label_values(&[SUCCESS_MSG]).inc();
                info!(expires_at = ?token.expires_at_rfc3339(), "vendor login succeeded");
            }
            Err(err) => {
                metrics.login_requests.with_label_values(&[ERROR_MSG]).inc();
                match err {
                    ProxyError::UpstreamAuth { status: None, .. } => warn!(error = %err, "vendor login failed"),
                    _ => error!(error = %err, "vendor login failed"),
                }
            }
        }
        result
    }
}
