use std::time::Duration;

use crate::auth::AccessToken;

/// When a poll session mints a replacement token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenewalPolicy {
    /// Renew whenever the current token is older than the threshold
    Periodic,
    /// Renew at most once per session, after the threshold
    Once,
}

/// Tuning for a poll session
#[derive(Clone, Debug)]
pub struct PollOptions {
    /// Fixed delay between status queries
    pub interval: Duration,

    /// Age at which the token is replaced; must stay below the token validity
    pub renewal_threshold: Duration,

    pub renewal_policy: RenewalPolicy,

    /// State names treated as terminal success
    pub completed_states: Vec<String>,

    /// State names treated as terminal failure
    pub failed_states: Vec<String>,

    /// Give up after this long; `None` polls until the task is terminal
    pub deadline: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            renewal_threshold: Duration::from_secs(1700),
            renewal_policy: RenewalPolicy::Periodic,
            completed_states: vec!["COMPLETED".to_string()],
            failed_states: vec!["FAILED".to_string()],
            deadline: None,
        }
    }
}

impl PollOptions {
    pub fn is_completed(&self, name: &str) -> bool {
        self.completed_states.iter().any(|s| s == name)
    }

    pub fn is_failed(&self, name: &str) -> bool {
        self.failed_states.iter().any(|s| s == name)
    }

    /// Whether `token` must be replaced before the next request
    ///
    /// A token is due at the threshold age, or one interval before its own
    /// validity ends when the identity service issued a shorter-lived one.
    pub fn token_needs_renewal(&self, token: &AccessToken) -> bool {
        token.age() >= self.renewal_threshold || token.expires_within(self.interval)
    }
}
