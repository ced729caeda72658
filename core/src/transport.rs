//! Async execution of [`HttpRequest`] values.
//!
//! `Transport` is the single I/O seam of the crate. Production code uses
//! [`ReqwestTransport`]; tests substitute an in-memory implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::{debug, warn};

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Failures where no HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("timeout of {timeout_ms}ms exceeded")]
    Timeout { timeout_ms: u128 },

    /// The connection could not be established.
    #[error("network error: {0}")]
    Connect(String),

    /// The HTTP client could not be built or the request was rejected locally.
    #[error("http client error: {0}")]
    Client(String),

    /// Any other transport-level failure.
    #[error("transport failure: {0}")]
    Other(String),
}

/// Executes a plain-data request and returns a plain-data response.
///
/// Non-2xx statuses are *not* errors at this layer: any received response is
/// returned as `Ok` so the caller can interpret the status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport with a fixed request timeout and default headers
/// applied to every request.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
    default_headers: Vec<(String, String)>,
}

impl ReqwestTransport {
    /// Build a transport whose requests fail after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the reqwest client cannot be
    /// constructed.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self {
            client,
            timeout,
            default_headers: vec![("accept".to_string(), "application/json".to_string())],
        })
    }

    /// Add a header sent with every request (request headers win on conflict).
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    fn map_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                timeout_ms: self.timeout.as_millis(),
            }
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else if error.is_builder() {
            TransportError::Client(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &self.default_headers {
            if !request.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            let mapped = self.map_error(e);
            warn!(url = %request.url, error = %mapped, "request did not complete");
            mapped
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| self.map_error(e))?;

        debug!(url = %request.url, status, "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_error_mentions_the_limit() {
        let err = TransportError::Timeout { timeout_ms: 10_000 };
        assert_eq!(err.to_string(), "timeout of 10000ms exceeded");
    }

    #[test]
    fn methods_map_onto_reqwest() {
        assert_eq!(to_reqwest_method(HttpMethod::Get), Method::GET);
        assert_eq!(to_reqwest_method(HttpMethod::Patch), Method::PATCH);
        assert_eq!(to_reqwest_method(HttpMethod::Delete), Method::DELETE);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = ReqwestTransport::new(Duration::from_millis(500)).unwrap();
        let request = HttpRequest {
            method: HttpMethod::Get,
            // Port 9 on loopback is the discard service and is closed on test hosts.
            url: "http://127.0.0.1:9/users".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let err = transport.execute(request).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect(_) | TransportError::Timeout { .. } | TransportError::Other(_)
        ));
    }
}
