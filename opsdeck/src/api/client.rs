//! HTTP transport against the backend API root.
//!
//! [`ApiClient`] wraps a pooled `reqwest::Client` bound to a base URL
//! (typically `http://host:port/api`) and provides the GET/POST helpers the
//! resource clients are built from. It is stateless per call; retry and
//! polling live in [`crate::sync`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use super::error::ApiError;

/// Default HTTP timeout for backend calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin HTTP client for the backend API.
///
/// Uses a reusable `reqwest::Client` with connection pooling and a default
/// timeout. Cheap to clone via `Arc` and share across resource clients.
pub struct ApiClient {
    /// Reusable HTTP client with connection pooling.
    http: reqwest::Client,

    /// API root, without a trailing slash.
    base_url: String,
}

impl ApiClient {
    /// Create a new client bound to the given API root.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self::with_http(http, base_url)
    }

    /// Create a client with a caller-supplied `reqwest::Client`.
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url }
    }

    /// Perform a GET against an endpoint and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let url = self.build_url(endpoint);
        trace!(url = %url, "API GET");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        Self::decode(endpoint, response).await
    }

    /// Perform a POST with a JSON body and decode the JSON response.
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.build_url(endpoint);
        trace!(url = %url, "API POST");
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        Self::decode(endpoint, response).await
    }

    /// Perform a POST with query parameters and no body.
    pub async fn post_with_params<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.build_url(endpoint);
        trace!(url = %url, "API POST");
        let response = self
            .http
            .post(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        Self::decode(endpoint, response).await
    }

    /// Build the full URL for an endpoint, with or without a leading slash.
    fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Check the status code and decode the response body.
    async fn decode<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}
