use serde::Deserialize;

use crate::config::resources::{DiscoveryConfig, ResourceConfig};
use crate::config::settings::SettingsConfig;
use crate::config::vendor::{AuthConfig, VendorConfig};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    #[serde(default)]
    pub vendor: VendorConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}
