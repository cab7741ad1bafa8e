// Authentication types

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Short-lived CSP bearer token
///
/// Age is measured on the tokio clock so paused-time tests can drive expiry.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    issued_at: Instant,
    issued_at_utc: DateTime<Utc>,
    validity: Duration,
}

impl AccessToken {
    /// Create a token issued now
    pub fn new(value: impl Into<String>, validity: Duration) -> Self {
        Self {
            value: value.into(),
            issued_at: Instant::now(),
            issued_at_utc: Utc::now(),
            validity,
        }
    }

    /// Raw bearer value for the `csp-auth-token` header
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Short prefix safe to log
    pub fn preview(&self) -> &str {
        let end = self
            .value
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len());
        &self.value[..end]
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Time since issuance
    pub fn age(&self) -> Duration {
        self.issued_at.elapsed()
    }

    /// True when the token will be past its validity window `margin` from now
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.age() + margin >= self.validity
    }

    /// Wall-clock expiry, for display
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at_utc + chrono::Duration::seconds(self.validity.as_secs() as i64)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &format_args!("{}...", self.preview()))
            .field("expires_at", &self.expires_at().to_rfc3339())
            .finish()
    }
}

/// CSP api-tokens/authorize response
#[derive(Debug, Deserialize)]
pub struct CspTokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_token_expiration_check() {
        let token = AccessToken::new("token", Duration::from_secs(1800));
        assert!(!token.expires_within(Duration::ZERO));

        tokio::time::advance(Duration::from_secs(1799)).await;
        assert!(!token.expires_within(Duration::ZERO));
        assert!(token.expires_within(Duration::from_secs(1)));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(token.expires_within(Duration::ZERO));
    }

    #[test]
    fn test_preview_truncates() {
        let token = AccessToken::new("abcdefghijklmnop", Duration::from_secs(60));
        assert_eq!(token.preview(), "abcdefgh");

        let short = AccessToken::new("abc", Duration::from_secs(60));
        assert_eq!(short.preview(), "abc");
    }

    #[test]
    fn test_debug_hides_token_value() {
        let token = AccessToken::new("super-secret-bearer-value", Duration::from_secs(60));
        let rendered = format!("{:?}", token);
        assert!(rendered.contains("super-se..."));
        assert!(!rendered.contains("super-secret-bearer-value"));
    }

    #[test]
    fn test_expires_at_offset() {
        let token = AccessToken::new("t", Duration::from_secs(1800));
        let delta = token.expires_at() - token.issued_at_utc;
        assert_eq!(delta.num_seconds(), 1800);
    }

    #[test]
    fn test_token_response_without_access_token() {
        let parsed: CspTokenResponse =
            serde_json::from_str(r#"{"token_type":"bearer"}"#).unwrap();
        assert!(parsed.access_token.is_none());
        assert!(parsed.expires_in.is_none());
    }
}
