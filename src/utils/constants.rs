//! Shared constants and invariants

pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 120;
pub const DEFAULT_FALLBACK_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_DISCOVERY_CACHE_TTL_SECS: u64 = 300;

pub const DEFAULT_ALLOWED_RESOURCES: [&str; 10] = [
    "applicants",
    "businesses",
    "candidates",
    "contacts",
    "documents",
    "hires",
    "jobs",
    "notes",
    "offers",
    "projects",
];

// Diagnostic response headers
pub const HEADER_ATTEMPTS: &str = "x-proxy-attempts";
pub const HEADER_CANDIDATE: &str = "x-proxy-candidate";
pub const HEADER_UPSTREAM_URL: &str = "x-proxy-upstream-url";
