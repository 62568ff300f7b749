use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::token_manager::TokenManager;
use crate::config::service::ServiceConfig;
use crate::config::settings::{GateConfig, SettingsConfig};
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;
use crate::resolver::discovery::Discovery;
use crate::resolver::resolver::ResourceResolver;
use crate::server::{diagnostics, gate, proxy};
use crate::sources::fetch::HttpFetcher;

/// Components shared by every proxied request.
#[derive(Clone)]
pub struct ProxyState {
    pub tokens: Arc<TokenManager>,
    pub resolver: Arc<ResourceResolver>,
    pub discovery: Arc<Discovery>,
}

impl ProxyState {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let vendor = Arc::new(config.vendor.clone());
        let fetcher = Arc::new(HttpFetcher::new(&vendor)?);

        let tokens = Arc::new(TokenManager::new(fetcher.clone(), vendor.clone(), config.auth.clone()));
        let discovery = Arc::new(Discovery::new(fetcher.clone(), vendor.clone(), config.discovery.clone()));
        let resolver = Arc::new(ResourceResolver::new(
            fetcher,
            vendor,
            config.resources.clone(),
            Some(discovery.clone()),
        ));

        Ok(Self { tokens, resolver, discovery })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
    pub proxy_state: ProxyState,
    pub gate: Arc<GateConfig>,
}

impl AppState {
    pub fn new(config: &ServiceConfig, metrics: &Metrics) -> Result<Self> {
        Ok(Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
            proxy_state: ProxyState::new(config)?,
            gate: Arc::new(config.settings.gate.clone()),
        })
    }
}

/// Proxy and diagnostic routes sit behind the shared-secret gate;
/// health and metrics do not.
pub fn router(state: AppState, settings: &SettingsConfig) -> Router {
    let gated = Router::new()
        .route("/proxy/{resource}", get(proxy::proxy_collection))
        .route("/proxy/{resource}/{id}", get(proxy::proxy_entity))
        .route("/auth/status", get(diagnostics::auth_status))
        .route("/schema/metadata", get(diagnostics::schema_metadata))
        .route("/schema/service", get(diagnostics::schema_service))
        .route_layer(middleware::from_fn_with_state(state.clone(), gate::require_shared_secret));

    Router::new()
        .merge(gated)
        .route("/health", get(diagnostics::health))
        .merge(state.metrics_state.router(&settings.metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until ctrl-c.
pub async fn start(config: &ServiceConfig) -> Result<()> {
    let metrics = get_metrics().await;
    let state = AppState::new(config, metrics)?;
    let app = router(state, &config.settings);

    let bind_addr = format!("{}:{}", config.settings.server.host, config.settings.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    info!(address = %bind_addr, "proxy listening");

    metrics.up.set(1);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;
    metrics.up.set(0);
    info!("proxy stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
