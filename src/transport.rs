//! The outbound HTTP seam.
//!
//! [`Transport`] is the injected collaborator the client issues calls
//! through; it owns connection establishment, TLS, keep-alive, and the
//! per-request timeout. [`HttpTransport`] is the production implementation;
//! tests substitute scripted transports.

use crate::config::{ClientConfig, ConfigError};
use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::Semaphore;
use tokio::time::{Duration, Instant};

/// One outbound request, fully assembled by the client.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

/// The raw outcome of a transport call. Status interpretation happens in the
/// client, not here.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Transport-level failure: the request never produced an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
    #[error("connection error: {0}")]
    Connect(String),
    #[error("request error: {0}")]
    Request(String),
}

/// Issues HTTP calls on behalf of the client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, request: RawRequest) -> Result<RawResponse, TransportError>;

    /// Release transport resources at client shutdown. Default is a no-op.
    async fn close(&self) {}
}

/// Production transport backed by a pooled reqwest client.
///
/// The pool is configured once at construction and never mutated afterwards.
/// reqwest only bounds idle connections per host, so total in-flight calls
/// are additionally capped by a semaphore of `max_connections` permits.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    permits: Semaphore,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.max_keepalive_connections)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;
        Ok(Self { client, permits: Semaphore::new(config.max_connections) })
    }

    fn map_error(err: reqwest::Error, elapsed: Duration) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout { elapsed }
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, request: RawRequest) -> Result<RawResponse, TransportError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TransportError::Request("transport has been shut down".into()))?;

        let started = Instant::now();
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(e, started.elapsed()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Self::map_error(e, started.elapsed()))?;
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_config() {
        let config = ClientConfig::new("tskey-api-test", "example.com");
        let transport = HttpTransport::new(&config).expect("transport");
        assert_eq!(transport.permits.available_permits(), config.max_connections);
    }

    #[test]
    fn error_display_names_the_failure_mode() {
        let timeout = TransportError::Timeout { elapsed: Duration::from_secs(30) };
        assert!(timeout.to_string().contains("timed out"));

        let connect = TransportError::Connect("refused".into());
        assert!(connect.to_string().contains("connection error"));
    }
}
