// Authentication module
// Exchanges the long-lived CSP API token for short-lived access tokens

mod manager;
mod refresh;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use manager::CredentialManager;
pub use types::AccessToken;

/// Source of fresh access tokens
///
/// The poller only depends on this seam, so tests can count renewals without
/// standing up an identity service.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Mint a new access token
    async fn issue_token(&self) -> Result<AccessToken>;
}
