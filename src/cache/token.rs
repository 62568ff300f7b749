use crate::helpers::time::ms_to_rfc3339;

/// Bearer token with its absolute expiry.
#[derive(Clone)]
pub struct Token {
    pub value: String,
    pub expires_at_ms: i64, // UNIX TIMESTAMP, milliseconds
}

impl Token {
    pub fn new(value: String, expires_at_ms: i64) -> Self {
        Self { value, expires_at_ms }
    }

    /// Instant after which the token must be refreshed.
    pub fn refresh_at_ms(&self, safety_margin_ms: i64) -> i64 {
        self.expires_at_ms.saturating_sub(safety_margin_ms)
    }

    /// Check if the token can still be handed out
    pub fn is_fresh(&self, now_ms: i64, safety_margin_ms: i64) -> bool {
        now_ms < self.refresh_at_ms(safety_margin_ms)
    }

    /// Masked form for diagnostics: first and last four characters at most,
    /// never more than a third of the token.
    pub fn preview(&self) -> String {
        let chars: Vec<char> = self.value.chars().collect();
        let visible = (chars.len() / 3).min(4);
        if visible == 0 {
            return "***".to_owned();
        }
        let head: String = chars[..visible].iter().collect();
        let tail: String = chars[chars.len() - visible..].iter().collect();
        format!("{}...{}", head, tail)
    }

    pub fn expires_at_rfc3339(&self) -> Option<String> {
        ms_to_rfc3339(self.expires_at_ms)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &self.preview())
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}
