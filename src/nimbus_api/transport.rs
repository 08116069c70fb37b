//! Transports for Nimbus Cloud requests.
//!
//! Two implementations of [`Transport`] ship with the crate.
//! [`HttpTransport`] is the rich client: it sends JSON bodies and reports
//! the HTTP status so the manager can enforce its strict 200 policy.
//! [`FallbackTransport`] is the minimal path kept for environments where
//! the rich capability is unavailable: GET parameters travel as a query
//! string, POST bodies as JSON with an explicit content type and the SDK
//! user-agent, and the HTTP status is not examined.
//!
//! The manager selects a transport at construction time, never at call
//! time, so tests can inject their own implementation.

use crate::nimbus_api::types::{Method, Params, TransportError};
use async_trait::async_trait;
use serde_json::Value;

/// User-agent sent by the fallback transport.
const FALLBACK_USER_AGENT: &str = concat!("nimbus-sdk/", env!("CARGO_PKG_VERSION"));

/// A raw HTTP exchange result, before JSON decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status, when the transport examines it. The fallback
    /// transport leaves this as `None`.
    pub status: Option<u16>,
    /// The raw response body.
    pub body: String,
}

/// A mechanism for delivering one request and collecting its raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` to `url` with the given method and return the raw
    /// response.
    async fn send(
        &self,
        url: &str,
        method: Method,
        body: &Params,
    ) -> Result<RawResponse, TransportError>;
}

/// Rich transport backed by a default-configured `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a rich transport with default TLS verification.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        url: &str,
        method: Method,
        body: &Params,
    ) -> Result<RawResponse, TransportError> {
        tracing::debug!("sending {} {} via rich transport", method, url);

        let request = match method {
            Method::Post => self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .json(body),
            Method::Get => self.client.get(url).query(&query_pairs(body)),
        };

        let response = request.send().await.map_err(TransportError::from)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(TransportError::from)?;

        tracing::debug!("rich transport received status {}", status);

        Ok(RawResponse {
            status: Some(status),
            body,
        })
    }
}

/// Minimal fallback transport.
///
/// TLS certificate verification is disabled on this path so the fallback
/// still works in environments without a usable certificate store. That
/// is a documented trade-off inherited from the wire contract, not a
/// recommendation; prefer [`HttpTransport`] wherever it is available.
#[derive(Debug, Clone)]
pub struct FallbackTransport {
    client: reqwest::Client,
}

impl FallbackTransport {
    /// Create the fallback transport.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .user_agent(FALLBACK_USER_AGENT)
            .build()
            .expect("failed to construct fallback HTTP client");
        Self { client }
    }
}

impl Default for FallbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for FallbackTransport {
    async fn send(
        &self,
        url: &str,
        method: Method,
        body: &Params,
    ) -> Result<RawResponse, TransportError> {
        tracing::debug!("sending {} {} via fallback transport", method, url);

        let request = match method {
            Method::Get => self.client.get(url).query(&query_pairs(body)),
            Method::Post => self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .json(body),
        };

        let response = request.send().await.map_err(TransportError::from)?;
        let body = response.text().await.map_err(TransportError::from)?;

        // Status intentionally not examined on this path.
        Ok(RawResponse { status: None, body })
    }
}

/// Flatten a JSON object into query pairs.
///
/// Nulls are dropped, scalars are rendered verbatim, and nested values
/// are JSON-encoded.
fn query_pairs(body: &Params) -> Vec<(String, String)> {
    body.iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            Some((key.clone(), rendered))
        })
        .collect()
}
