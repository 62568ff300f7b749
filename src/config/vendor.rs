use serde::Deserialize;

use crate::error::{ProxyError, ProxyResult};
use crate::utils::constants::{
    DEFAULT_FALLBACK_TTL_SECS, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_SAFETY_MARGIN_SECS,
};

/// ================================
/// Vendor API connection
/// ================================
///
/// Every value is optional at load time. A missing value only becomes an
/// error when an operation needs it.
#[derive(Debug, Deserialize, Clone)]
pub struct VendorConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            username: None,
            password: None,
            api_key_header: default_api_key_header(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl VendorConfig {
    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> ProxyResult<&str> {
        present(&self.base_url)
            .map(|url| url.trim_end_matches('/'))
            .ok_or_else(|| ProxyError::Configuration("vendor.base_url is not set".to_owned()))
    }

    pub fn api_key(&self) -> ProxyResult<&str> {
        present(&self.api_key)
            .ok_or_else(|| ProxyError::Configuration("vendor.api_key is not set".to_owned()))
    }
}

/// Login credentials, checked as a whole at first use.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_vendor(vendor: &VendorConfig) -> ProxyResult<Self> {
        let missing: Vec<&str> = [
            ("vendor.api_key", &vendor.api_key),
            ("vendor.username", &vendor.username),
            ("vendor.password", &vendor.password),
        ]
        .into_iter()
        .filter(|(_, value)| present(value).is_none())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ProxyError::Configuration(format!(
                "missing credentials: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            api_key: vendor.api_key.clone().unwrap_or_default(),
            username: vendor.username.clone().unwrap_or_default(),
            password: vendor.password.clone().unwrap_or_default(),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// ================================
/// Login exchange and token lifetime
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// refresh this many seconds before the token expires
    #[serde(default = "default_safety_margin")]
    pub safety_margin_seconds: u64,
    /// lifetime assumed when the login response carries no usable expiry
    #[serde(default = "default_fallback_ttl")]
    pub fallback_ttl_seconds: u64,
    /// field names (or JSON pointers starting with '/') tried in order
    #[serde(default = "default_token_fields")]
    pub token_fields: Vec<String>,
    #[serde(default = "default_expiry_fields")]
    pub expiry_fields: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_path(),
            safety_margin_seconds: default_safety_margin(),
            fallback_ttl_seconds: default_fallback_ttl(),
            token_fields: default_token_fields(),
            expiry_fields: default_expiry_fields(),
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn default_api_key_header() -> String {
    "x-api-key".to_owned()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_login_path() -> String {
    "/login".to_owned()
}

fn default_safety_margin() -> u64 {
    DEFAULT_SAFETY_MARGIN_SECS
}

fn default_fallback_ttl() -> u64 {
    DEFAULT_FALLBACK_TTL_SECS
}

fn default_token_fields() -> Vec<String> {
    ["access_token", "token", "accessToken"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_expiry_fields() -> Vec<String> {
    ["expires_in", "expiresIn", "expires_at", "expiresAt", "expires", "expiration"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}
