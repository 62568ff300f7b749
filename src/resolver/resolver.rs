use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::cache::token_manager::TokenManager;
use crate::config::resources::ResourceConfig;
use crate::config::vendor::VendorConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::resolver::attempts::AttemptTrace;
use crate::resolver::candidates::{build_candidates, is_valid_id, Candidate};
use crate::resolver::discovery::Discovery;
use crate::sources::fetch::{Fetch, HttpFetcher, UpstreamRequest, UpstreamResponse};

static MATCHED_MSG: &str = "matched";
static EXHAUSTED_MSG: &str = "exhausted";
static NO_MATCH_MSG: &str = "no_match";

/// How a resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// a candidate answered 2xx
    Matched,
    /// every candidate missed; the last upstream response is relayed
    Exhausted,
    /// no candidate produced any upstream response
    NoUpstream,
}

/// Result of one resolution, relayed to the caller as-is.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
    pub outcome: Outcome,
    pub attempts: AttemptTrace,
    /// winning candidate path, or the last one that answered
    pub candidate: Option<String>,
    /// full upstream URL behind `candidate`
    pub upstream_url: Option<String>,
}

impl Resolution {
    fn from_response(response: UpstreamResponse, outcome: Outcome, attempts: AttemptTrace, candidate: &str, url: &Url) -> Self {
        Self {
            status: response.status,
            content_type: response.content_type,
            body: response.body,
            outcome,
            attempts,
            candidate: Some(candidate.to_owned()),
            upstream_url: Some(url.to_string()),
        }
    }

    fn no_upstream(resource: &str, attempts: AttemptTrace) -> Self {
        let body = serde_json::json!({
            "error": "no_upstream_matched",
            "detail": format!("no upstream candidate answered for resource '{}'", resource),
            "attempts": attempts.to_string(),
        });
        Self {
            status: StatusCode::BAD_GATEWAY,
            content_type: Some("application/json".to_owned()),
            body: Bytes::from(body.to_string()),
            outcome: Outcome::NoUpstream,
            attempts,
            candidate: None,
            upstream_url: None,
        }
    }
}

/// Tries candidate upstream paths for a logical resource, in order, until one
/// answers 2xx.
pub struct ResourceResolver<F = HttpFetcher> {
    fetcher: Arc<F>,
    vendor: Arc<VendorConfig>,
    resources: ResourceConfig,
    discovery: Option<Arc<Discovery<F>>>,
}

impl<F: Fetch> ResourceResolver<F> {
    pub fn new(
        fetcher: Arc<F>,
        vendor: Arc<VendorConfig>,
        resources: ResourceConfig,
        discovery: Option<Arc<Discovery<F>>>,
    ) -> Self {
        Self { fetcher, vendor, resources, discovery }
    }

    pub fn is_permitted(&self, resource: &str) -> bool {
        self.resources.is_permitted(resource)
    }

    /// Candidate list for a resolution: static templates, then discovered names.
    pub async fn candidates(&self, resource: &str, id: Option<&str>, token: &str) -> Vec<Candidate> {
        let static_templates = self.resources.static_templates(resource);
        let discovered = match &self.discovery {
            Some(discovery) if discovery.applies_to(resource) => discovery.matching(resource, token).await,
            _ => Vec::new(),
        };
        build_candidates(&static_templates, &discovered, id)
    }

    /// Resolve `resource` (and optional entity `id`) against the vendor.
    ///
    /// `query` is the raw inbound query string, attached unchanged to every
    /// candidate URL. Resources outside the allow-list are rejected before
    /// any network call, including the login.
    pub async fn resolve(
        &self,
        resource: &str,
        id: Option<&str>,
        query: Option<&str>,
        tokens: &TokenManager<F>,
    ) -> ProxyResult<Resolution> {
        if !self.is_permitted(resource) {
            warn!(resource, "rejected resource outside allow-list");
            get_metrics()
                .await
                .resolutions
                .with_label_values(&["forbidden", "not_permitted"])
                .inc();
            return Err(ProxyError::NotPermitted(resource.to_owned()));
        }
        if let Some(id) = id.filter(|id| !is_valid_id(id)) {
            warn!(resource, id, "rejected dot-segment entity id");
            return Err(ProxyError::InvalidId(id.to_owned()));
        }

        let base_url = self.vendor.base_url()?.to_owned();
        let token = tokens.get_token().await?;
        let candidates = self.candidates(resource, id, &token).await;
        debug!(resource, total = candidates.len(), "resolving candidates");

        let metrics = get_metrics().await;
        let start = get_instant();
        let resolution = self.attempt(resource, &base_url, &candidates, query, &token).await;

        let outcome = match resolution.outcome {
            Outcome::Matched => MATCHED_MSG,
            Outcome::Exhausted => EXHAUSTED_MSG,
            Outcome::NoUpstream => NO_MATCH_MSG,
        };
        metrics.resolutions.with_label_values(&[resource, outcome]).inc();
        metrics
            .resolution_duration
            .with_label_values(&[resource])
            .observe(start.elapsed().as_secs_f64());
        info!(
            resource,
            outcome,
            status = resolution.status.as_u16(),
            attempts = %resolution.attempts,
            "resolution finished"
        );

        Ok(resolution)
    }

    /// Sequential attempt loop; stops at the first 2xx.
    async fn attempt(
        &self,
        resource: &str,
        base_url: &str,
        candidates: &[Candidate],
        query: Option<&str>,
        token: &str,
    ) -> Resolution {
        let metrics = get_metrics().await;
        let mut attempts = AttemptTrace::new();
        let mut last: Option<(UpstreamResponse, &Candidate, Url)> = None;

        for candidate in candidates {
            let url = match candidate_url(base_url, &candidate.path, query) {
                Ok(url) => url,
                Err(err) => {
                    warn!(path = %candidate.path, error = %err, "skipping malformed candidate url");
                    attempts.record(&candidate.path, None);
                    continue;
                }
            };

            let response = match UpstreamRequest::vendor_get(url.clone(), &self.vendor, token, "application/json") {
                Ok(request) => self.fetcher.fetch(request).await,
                Err(err) => Err(err),
            };

            match response {
                Ok(response) => {
                    let status = response.status;
                    attempts.record(&candidate.path, Some(status.as_u16()));
                    metrics
                        .candidate_attempts
                        .with_label_values(&[resource, status_class(status)])
                        .inc();

                    if status.is_success() {
                        debug!(path = %candidate.path, %status, "candidate matched");
                        return Resolution::from_response(response, Outcome::Matched, attempts, &candidate.path, &url);
                    }
                    debug!(path = %candidate.path, %status, "candidate missed");
                    last = Some((response, candidate, url));
                }
                Err(err) => {
                    warn!(path = %candidate.path, error = %err, "candidate request failed");
                    attempts.record(&candidate.path, None);
                    metrics
                        .candidate_attempts
                        .with_label_values(&[resource, "error"])
                        .inc();
                }
            }
        }

        match last {
            Some((response, candidate, url)) => {
                Resolution::from_response(response, Outcome::Exhausted, attempts, &candidate.path, &url)
            }
            None => Resolution::no_upstream(resource, attempts),
        }
    }
}

/// base + candidate path, with the raw query string attached.
///
/// The query goes through `Url::set_query`, which applies the URL standard's
/// query percent-encode set: bytes already valid in a query are kept, while
/// a few (such as `'` in http(s) URLs) are rewritten as `%27`. The rewrite is
/// deterministic, so every candidate carries the same query bytes.
pub fn candidate_url(base_url: &str, path: &str, query: Option<&str>) -> ProxyResult<Url> {
    let mut url = Url::parse(&format!("{}{}", base_url.trim_end_matches('/'), path))
        .map_err(|e| ProxyError::Configuration(format!("invalid candidate url for '{}': {}", path, e)))?;
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.set_query(Some(query));
    }
    Ok(url)
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
