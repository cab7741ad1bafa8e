// CSP token exchange

use anyhow::{Context, Result};
use reqwest::Client;

use super::types::CspTokenResponse;

/// Exchange a CSP API token (refresh token) for an access token response
pub async fn exchange_api_token(
    client: &Client,
    auth_url: &str,
    api_token: &str,
) -> Result<CspTokenResponse> {
    tracing::debug!(url = %auth_url, "Requesting CSP access token");

    let response = client
        .post(auth_url)
        .query(&[("refresh_token", api_token)])
        .header("Content-Type", "application/json")
        .send()
        .await
        .context("Failed to send CSP authorize request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            status = status.as_u16(),
            body = %error_text,
            "CSP authorize request failed"
        );

        // CSP errors carry a human readable message field
        if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(&error_text) {
            if let Some(message) = error_json.get("message").and_then(|v| v.as_str()) {
                anyhow::bail!("CSP authorize failed: {} - {}", status, message);
            }
        }

        anyhow::bail!("CSP authorize failed: {} - {}", status, error_text);
    }

    let body = response
        .text()
        .await
        .context("Failed to read CSP authorize response")?;

    serde_json::from_str(&body).context("Failed to parse CSP authorize response")
}
