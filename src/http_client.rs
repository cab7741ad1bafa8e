use anyhow::Context;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::auth::AccessToken;
use crate::error::{error_kind, ApiError, Result};

/// Header CSP-protected VMC endpoints read the bearer token from
pub const AUTH_HEADER: &str = "csp-auth-token";

/// HTTP client for the VMC API
///
/// Every call is a single attempt: failures propagate to the caller.
pub struct VmcHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// API root, e.g. https://vmc.vmware.com/api
    base_url: String,
}

impl VmcHttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        token: &AccessToken,
    ) -> Result<T> {
        let request = self
            .client
            .get(self.url(path))
            .query(query)
            .header(AUTH_HEADER, token.as_str());
        self.execute(request).await
    }

    /// POST a JSON body and parse the JSON response
    pub async fn post_json<B, T>(&self, path: &str, body: &B, token: &AccessToken) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .client
            .post(self.url(path))
            .header(AUTH_HEADER, token.as_str())
            .json(body);
        self.execute(request).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = request
            .build()
            .map_err(|e| ApiError::TransportError(format!("Failed to build request: {}", e)))?;

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let kind = error_kind(&e);
                tracing::warn!(
                    error_kind = kind,
                    error = %e,
                    url = %url,
                    "HTTP request error"
                );
                return Err(ApiError::TransportError(format!(
                    "{} {} failed: {} (kind: {})",
                    method, url, e, kind
                )));
            }
        };

        let status = response.status();
        tracing::debug!(status = %status, "Received HTTP response");

        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = status.as_u16(),
                url = %url,
                response_body = %body,
                "HTTP request failed with error response"
            );
            return Err(ApiError::RemoteError {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Unparseable response body");
            ApiError::TransportError(format!("Failed to parse response from {}: {}", url, e))
        })
    }
}
