use serde::Deserialize;
use std::collections::HashMap;

use crate::utils::constants::{DEFAULT_ALLOWED_RESOURCES, DEFAULT_DISCOVERY_CACHE_TTL_SECS};

/// ================================
/// Resources exposed through /proxy
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ResourceConfig {
    /// logical resource names the proxy will serve, nothing else
    #[serde(default = "default_allow")]
    pub allow: Vec<String>,
    /// prefixes tried for every resource after the bare name, e.g. "odata"
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// resource-specific known paths, tried after the namespaced variants
    #[serde(default)]
    pub aliases: HashMap<String, Vec<String>>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            allow: default_allow(),
            namespaces: Vec::new(),
            aliases: HashMap::new(),
        }
    }
}

impl ResourceConfig {
    pub fn is_permitted(&self, resource: &str) -> bool {
        self.allow.iter().any(|allowed| allowed == resource)
    }

    /// Static path templates for a resource in priority order:
    /// the name itself, namespaced variants, then known aliases.
    pub fn static_templates(&self, resource: &str) -> Vec<String> {
        let mut templates = Vec::with_capacity(1 + self.namespaces.len());
        templates.push(resource.to_owned());
        for namespace in &self.namespaces {
            let namespace = namespace.trim_matches('/');
            if namespace.is_empty() {
                continue;
            }
            templates.push(format!("{}/{}", namespace, resource));
        }
        if let Some(aliases) = self.aliases.get(resource) {
            templates.extend(aliases.iter().cloned());
        }
        templates
    }
}

/// ================================
/// Schema discovery
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metadata_path")]
    pub metadata_path: String,
    #[serde(default = "default_service_path")]
    pub service_path: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// resource -> case-insensitive substrings matched against entity-set names;
    /// resources without keywords never trigger discovery
    #[serde(default)]
    pub keywords: HashMap<String, Vec<String>>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            metadata_path: default_metadata_path(),
            service_path: default_service_path(),
            cache_ttl_seconds: default_cache_ttl(),
            keywords: HashMap::new(),
        }
    }
}

impl DiscoveryConfig {
    pub fn keywords_for(&self, resource: &str) -> Option<&[String]> {
        self.keywords
            .get(resource)
            .map(Vec::as_slice)
            .filter(|keywords| !keywords.is_empty())
    }
}

fn default_allow() -> Vec<String> {
    DEFAULT_ALLOWED_RESOURCES.iter().map(|r| r.to_string()).collect()
}

fn default_metadata_path() -> String {
    "/$metadata".to_owned()
}

fn default_service_path() -> String {
    "/".to_owned()
}

fn default_cache_ttl() -> u64 {
    DEFAULT_DISCOVERY_CACHE_TTL_SECS
}
