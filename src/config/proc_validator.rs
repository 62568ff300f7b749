//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Vendor credentials are deliberately not required here; they are checked
//!   when the first login happens.

use std::collections::HashSet;
use tracing::{error, info};

use crate::config::resources::{DiscoveryConfig, ResourceConfig};
use crate::config::service::ServiceConfig;
use crate::config::settings::SettingsConfig;
use crate::config::vendor::{AuthConfig, VendorConfig};
use crate::observability::metrics::get_metrics;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_vendor(&cfg.vendor, &mut errors);
    validate_auth(&cfg.auth, &mut errors);
    validate_resources(&cfg.resources, &mut errors);
    validate_discovery(&cfg.discovery, &cfg.resources, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.server.host.is_empty() {
        errors.push(format!(
            "settings.server.host '{}' must be valid",
            settings.server.host
        ));
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' must be an integer in range 0-65535",
            settings.server.port
        ));
    }

    // metrics endpoint start with '/'
    let metrics = &settings.metrics;
    if !metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            metrics.path
        ));
    }

    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }

    if settings.gate.secret().is_some() && settings.gate.secret_header.trim().is_empty() {
        errors.push("settings.gate.secret_header must not be empty when a shared secret is set".to_owned());
    }
}

fn validate_vendor(vendor: &VendorConfig, errors: &mut Vec<String>) {
    if let Some(base_url) = vendor.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
        if reqwest::Url::parse(base_url.trim()).is_err() {
            errors.push(format!("vendor.base_url '{}' is not a valid URL", base_url));
        }
    }
    if vendor.timeout_ms == 0 {
        errors.push("vendor.timeout_ms must be > 0".to_owned());
    }
    if vendor.api_key_header.trim().is_empty() {
        errors.push("vendor.api_key_header must not be empty".to_owned());
    }
}

fn validate_auth(auth: &AuthConfig, errors: &mut Vec<String>) {
    if !auth.login_path.starts_with('/') {
        errors.push(format!("auth.login_path '{}' must start with '/'", auth.login_path));
    }
    if auth.fallback_ttl_seconds == 0 {
        errors.push("auth.fallback_ttl_seconds must be > 0".to_owned());
    }
    // safety margin sane bounds
    if auth.safety_margin_seconds > 60 * 60 * 24 {
        errors.push(format!(
            "auth.safety_margin_seconds ({}) is unreasonably large",
            auth.safety_margin_seconds
        ));
    }
    if auth.token_fields.is_empty() {
        errors.push("auth.token_fields must contain at least one field".to_owned());
    }
}

fn validate_resources(resources: &ResourceConfig, errors: &mut Vec<String>) {
    if resources.allow.is_empty() {
        errors.push("resources.allow is empty; at least one resource required".to_owned());
    }

    let mut seen = HashSet::new();
    for resource in &resources.allow {
        if resource.is_empty() || resource.contains('/') {
            errors.push(format!("resources.allow entry '{}' must be a single path segment", resource));
        }
        if !seen.insert(resource.as_str()) {
            errors.push(format!("resources.allow lists '{}' more than once", resource));
        }
    }

    for (resource, aliases) in &resources.aliases {
        if !resources.is_permitted(resource) {
            errors.push(format!(
                "resources.aliases['{}'] refers to a resource missing from resources.allow",
                resource
            ));
        }
        for alias in aliases {
            if alias.trim_matches('/').is_empty() {
                errors.push(format!("resources.aliases['{}'] contains an empty path", resource));
            }
        }
    }
}

fn validate_discovery(discovery: &DiscoveryConfig, resources: &ResourceConfig, errors: &mut Vec<String>) {
    if !discovery.metadata_path.starts_with('/') {
        errors.push(format!(
            "discovery.metadata_path '{}' must start with '/'",
            discovery.metadata_path
        ));
    }
    if !discovery.service_path.starts_with('/') {
        errors.push(format!(
            "discovery.service_path '{}' must start with '/'",
            discovery.service_path
        ));
    }
    for resource in discovery.keywords.keys() {
        if !resources.is_permitted(resource) {
            errors.push(format!(
                "discovery.keywords['{}'] refers to a resource missing from resources.allow",
                resource
            ));
        }
    }
}
