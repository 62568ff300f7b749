use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::token::Token;
use crate::config::vendor::AuthConfig;
use crate::error::{ProxyError, ProxyResult};

/// Parse a successful login response body into a token.
///
/// The token field is mandatory; the expiry falls back to the configured
/// lifetime when absent or unparseable.
pub fn parse_login_response(body: &str, auth: &AuthConfig, now_ms: i64) -> ProxyResult<Token> {
    let json: Value = serde_json::from_str(body).map_err(|e| ProxyError::UpstreamAuth {
        status: None,
        body: format!("login response is not valid JSON ({}): {}", e, body),
    })?;

    let value = auth
        .token_fields
        .iter()
        .filter_map(|field| lookup(&json, field))
        .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
        .ok_or_else(|| ProxyError::UpstreamAuth {
            status: None,
            body: format!("login response has no token field: {}", body),
        })?;

    let expiry = auth
        .expiry_fields
        .iter()
        .find_map(|field| lookup(&json, field).filter(|v| !v.is_null()));

    let fallback_ms = (auth.fallback_ttl_seconds as i64).saturating_mul(1000);
    Ok(Token::new(value.to_owned(), parse_expiry(expiry, now_ms, fallback_ms)))
}

/// Compute an absolute expiry in milliseconds.
///
/// - number or numeric string `N`: relative, `now + N * 1000`
/// - RFC 3339 / `YYYY-MM-DDTHH:MM:SS[.fff]` string: that instant (UTC when no offset)
/// - anything else: `now + fallback_ms`
pub fn parse_expiry(value: Option<&Value>, now_ms: i64, fallback_ms: i64) -> i64 {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map(|seconds| now_ms.saturating_add(seconds.saturating_mul(1000))),
        Some(Value::String(s)) => parse_expiry_str(s.trim(), now_ms),
        _ => None,
    };

    match parsed {
        Some(expires_at_ms) => {
            debug!(expires_at_ms, "login expiry parsed");
            expires_at_ms
        }
        None => {
            if let Some(v) = value {
                warn!(value = %v, "unparseable login expiry, using fallback lifetime");
            }
            now_ms.saturating_add(fallback_ms)
        }
    }
}

fn parse_expiry_str(s: &str, now_ms: i64) -> Option<i64> {
    if let Ok(seconds) = s.parse::<i64>() {
        return Some(now_ms.saturating_add(seconds.saturating_mul(1000)));
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(s) {
        return Some(date_time.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Field name, or JSON pointer when it starts with '/'.
fn lookup<'a>(json: &'a Value, field: &str) -> Option<&'a Value> {
    if field.starts_with('/') {
        json.pointer(field)
    } else {
        json.get(field)
    }
}
