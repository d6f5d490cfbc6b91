//! HTTP transport for provider API calls.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use deskbrief_auth::BoxFuture;

/// A provider API request.
///
/// The surfaces this service exposes are read-only, so the method is
/// always GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Absolute request URL without query parameters.
    pub url: String,
    /// Query parameters, appended in order.
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    /// Creates a GET request for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
        }
    }

    /// Appends a query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// One raw provider response, before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
    /// Retry-After header value in seconds, when the provider sent one.
    pub retry_after: Option<u64>,
}

/// Transport-level failures. All of these are transient from the caller's
/// perspective.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The bounded request timeout elapsed.
    #[error("request timeout")]
    Timeout,

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other request failure.
    #[error("request failed: {0}")]
    Request(String),
}

/// Sends one provider API request with a bearer token attached.
pub trait Transport: Send + Sync {
    /// Performs the request and returns the raw response.
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        access_token: &'a str,
    ) -> BoxFuture<'a, Result<RawResponse, TransportError>>;
}

/// reqwest-backed transport with a bounded per-request timeout.
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self { http }
    }

    async fn perform(
        &self,
        request: &ApiRequest,
        access_token: &str,
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .http
            .get(&request.url)
            .bearer_auth(access_token)
            .query(&request.query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else if e.is_connect() {
                    TransportError::Connect(e.to_string())
                } else {
                    TransportError::Request(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(format!("failed to read response: {}", e)))?;

        debug!(status, url = %request.url, "provider call completed");
        Ok(RawResponse {
            status,
            body,
            retry_after,
        })
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        access_token: &'a str,
    ) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
        Box::pin(self.perform(request, access_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_accumulates_params() {
        let request = ApiRequest::get("https://example.com/api")
            .with_param("a", "1")
            .with_param("b", "two");

        assert_eq!(request.url, "https://example.com/api");
        assert_eq!(
            request.query,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two".to_string())
            ]
        );
    }

    #[test]
    fn transport_errors_display() {
        assert_eq!(TransportError::Timeout.to_string(), "request timeout");
        assert!(
            TransportError::Connect("refused".to_string())
                .to_string()
                .contains("refused")
        );
    }
}
