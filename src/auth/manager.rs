use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::refresh;
use super::types::AccessToken;
use super::TokenIssuer;
use crate::error::ApiError;

/// Credential manager
/// Mints CSP access tokens from the long-lived API token. Holds no token state.
pub struct CredentialManager {
    /// HTTP client for authorize requests
    client: Client,

    /// CSP api-tokens/authorize endpoint
    auth_url: String,

    /// Long-lived API token (CSP refresh token)
    api_token: String,

    /// Validity assumed for minted tokens (default: 1800 = 30 minutes)
    token_validity: Duration,
}

impl CredentialManager {
    /// Create a new CredentialManager
    pub fn new(
        auth_url: impl Into<String>,
        api_token: impl Into<String>,
        token_validity: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            auth_url: auth_url.into(),
            api_token: api_token.into(),
            token_validity,
        })
    }

    /// Exchange `secret` for a fresh access token
    ///
    /// No retry: the caller decides whether to try again.
    pub async fn authenticate(&self, secret: &str) -> std::result::Result<AccessToken, ApiError> {
        let data = refresh::exchange_api_token(&self.client, &self.auth_url, secret)
            .await
            .map_err(|e| ApiError::AuthError(format!("{:#}", e)))?;

        let access_token = match data.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                return Err(ApiError::AuthError(
                    "CSP response does not contain access_token".to_string(),
                ))
            }
        };

        // Trust the shorter of the advertised and configured lifetimes
        let validity = data
            .expires_in
            .map(|secs| Duration::from_secs(secs).min(self.token_validity))
            .unwrap_or(self.token_validity);

        let token = AccessToken::new(access_token, validity);
        tracing::info!(
            token = %token.preview(),
            expires = %token.expires_at().to_rfc3339(),
            "CSP access token issued"
        );

        Ok(token)
    }
}

#[async_trait]
impl TokenIssuer for CredentialManager {
    async fn issue_token(&self) -> std::result::Result<AccessToken, ApiError> {
        self.authenticate(&self.api_token).await
    }
}
