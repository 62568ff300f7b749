use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Login metrics
    pub login_requests: IntCounterVec,
    pub login_duration: Histogram,
    pub token_expiry_unix: IntGauge,

    // Resolution metrics
    pub resolutions: IntCounterVec,
    pub resolution_duration: HistogramVec,
    pub candidate_attempts: IntCounterVec,
    pub discovery_failures: IntCounterVec,

    // Inbound
    pub gate_rejections: IntCounter,

    // Config/runtime
    pub parse_failures: IntCounter,
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("odatarelay".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Login
            login_requests: IntCounterVec::new(Opts::new("login_requests_total", "Vendor login exchanges by outcome"),&["outcome"],).unwrap(),
            login_duration: Histogram::with_opts(HistogramOpts::new("login_duration_seconds", "Vendor login duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])).unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry of the cached bearer token").unwrap(),

            // Resolution
            resolutions: IntCounterVec::new(Opts::new("resolutions_total", "Resolutions by resource and outcome"),&["resource", "outcome"],).unwrap(),
            resolution_duration: HistogramVec::new(HistogramOpts::new("resolution_duration_seconds", "Time spent walking candidate paths").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 30.0]),&["resource"],).unwrap(),
            candidate_attempts: IntCounterVec::new(Opts::new("candidate_attempts_total", "Upstream candidate requests by status class"),&["resource", "status_class"],).unwrap(),
            discovery_failures: IntCounterVec::new(Opts::new("discovery_failures_total", "Schema documents that could not be fetched"),&["document"],).unwrap(),

            gate_rejections: IntCounter::new("gate_rejections_total", "Requests rejected by the shared-secret gate").unwrap(),

            // Config/runtime
            parse_failures: IntCounter::new("config_parse_failures_total","Config file parse failures",).unwrap(),
            config_validation_errors: IntCounter::new("config_validation_errors_total","Validation errors during startup",).unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.login_requests.clone())).unwrap();
        reg.register(Box::new(metrics.login_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.resolutions.clone())).unwrap();
        reg.register(Box::new(metrics.resolution_duration.clone())).unwrap();
        reg.register(Box::new(metrics.candidate_attempts.clone())).unwrap();
        reg.register(Box::new(metrics.discovery_failures.clone())).unwrap();
        reg.register(Box::new(metrics.gate_rejections.clone())).unwrap();
        reg.register(Box::new(metrics.parse_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
