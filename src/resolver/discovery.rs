use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::resources::DiscoveryConfig;
use crate::config::vendor::VendorConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::observability::metrics::get_metrics;
use crate::parser::schema::{entity_sets_from_metadata, entity_sets_from_service_document, matching_names};
use crate::sources::fetch::{Fetch, HttpFetcher, UpstreamRequest, UpstreamResponse};

static METADATA_DOC: &str = "metadata";
static SERVICE_DOC: &str = "service";

struct CachedEntitySets {
    names: Vec<String>,
    fetched_at: Instant,
}

/// Best-effort lookup of real entity-set names from the vendor's schema.
///
/// Never fails: any network or parse problem yields fewer (or no) names.
pub struct Discovery<F = HttpFetcher> {
    fetcher: Arc<F>,
    vendor: Arc<VendorConfig>,
    config: DiscoveryConfig,
    cache: RwLock<Option<CachedEntitySets>>,
}

impl<F: Fetch> Discovery<F> {
    pub fn new(fetcher: Arc<F>, vendor: Arc<VendorConfig>, config: DiscoveryConfig) -> Self {
        Self {
            fetcher,
            vendor,
            config,
            cache: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Whether a resolution for `resource` should consult discovery at all.
    pub fn applies_to(&self, resource: &str) -> bool {
        self.config.enabled && self.config.keywords_for(resource).is_some()
    }

    /// Discovered entity-set names matching the resource's keywords.
    pub async fn matching(&self, resource: &str, token: &str) -> Vec<String> {
        let Some(keywords) = self.config.keywords_for(resource).filter(|_| self.config.enabled) else {
            return Vec::new();
        };
        let names = self.entity_sets(token).await;
        let matched = matching_names(&names, keywords);
        debug!(resource, matched = ?matched, "discovery matched entity sets");
        matched
    }

    /// All entity-set names from the metadata and service documents,
    /// metadata first. Cached for `cache_ttl_seconds`; empty results are not cached.
    pub async fn entity_sets(&self, token: &str) -> Vec<String> {
        let ttl = Duration::from_secs(self.config.cache_ttl_seconds);
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < ttl {
                return cached.names.clone();
            }
        }

        let mut names = Vec::new();
        match self.fetch_document(&self.config.metadata_path, "application/xml", token).await {
            Ok(response) => names.extend(entity_sets_from_metadata(&response.body_text())),
            Err(err) => self.record_failure(METADATA_DOC, &err).await,
        }
        match self.fetch_document(&self.config.service_path, "application/json", token).await {
            Ok(response) => names.extend(entity_sets_from_service_document(&response.body_text())),
            Err(err) => self.record_failure(SERVICE_DOC, &err).await,
        }

        let mut seen = HashSet::new();
        names.retain(|name| seen.insert(name.clone()));

        if !names.is_empty() {
            info!(total = names.len(), "discovered vendor entity sets");
            *self.cache.write().await = Some(CachedEntitySets {
                names: names.clone(),
                fetched_at: Instant::now(),
            });
        }
        names
    }

    /// GET a schema document; non-2xx statuses are reported as transport errors.
    pub async fn fetch_document(&self, path: &str, accept: &str, token: &str) -> ProxyResult<UpstreamResponse> {
        let response = self.fetch_raw(path, accept, token).await?;
        if !response.status.is_success() {
            return Err(ProxyError::Transport(format!(
                "{} returned {}",
                path, response.status
            )));
        }
        Ok(response)
    }

    /// GET a schema document and return whatever the vendor answered.
    pub async fn fetch_raw(&self, path: &str, accept: &str, token: &str) -> ProxyResult<UpstreamResponse> {
        let base_url = self.vendor.base_url()?;
        let url = reqwest::Url::parse(&format!("{}{}", base_url, path))
            .map_err(|e| ProxyError::Configuration(format!("invalid discovery url: {}", e)))?;
        let request = UpstreamRequest::vendor_get(url, &self.vendor, token, accept)?;
        self.fetcher.fetch(request).await
    }

    async fn record_failure(&self, document: &str, err: &ProxyError) {
        warn!(document, error = %err, "schema discovery failed");
        get_metrics()
            .await
            .discovery_failures
            .with_label_values(&[document])
            .inc();
    }
}
