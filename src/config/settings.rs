use serde::Deserialize;

/// ================================
/// Global service-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub gate: GateConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            is_enabled: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: String,
}

/// Shared-secret gate in front of the proxy and diagnostic routes.
/// Disabled when `shared_secret` is absent or empty.
#[derive(Debug, Deserialize, Clone)]
pub struct GateConfig {
    pub shared_secret: Option<String>,
    #[serde(default = "default_secret_header")]
    pub secret_header: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            shared_secret: None,
            secret_header: default_secret_header(),
        }
    }
}

impl GateConfig {
    pub fn secret(&self) -> Option<&str> {
        self.shared_secret.as_deref().filter(|s| !s.is_empty())
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new (level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> String {
    "8080".to_string()
}

fn default_secret_header() -> String {
    "x-proxy-secret".to_string()
}
