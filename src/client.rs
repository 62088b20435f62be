//! The public entry point: a rate-limited, retrying request executor.
//!
//! [`ApiClient`] owns one [`RateLimiter`] and one [`RetryPolicy`] for its
//! lifetime and issues every call through an injected [`Transport`]. The
//! rate-limiter acquisition happens inside the retried unit of work, so every
//! attempt — not just the first — is paced; a retry storm cannot itself
//! violate the provider's limit.
//!
//! Higher-level domain operations (device, DNS, policy, service CRUD) are
//! thin pass-throughs over [`ApiClient::execute`] and live outside this
//! crate; they never touch the pacing or retry internals.

use crate::classify::{classify_status, classify_transport};
use crate::config::{ClientConfig, ConfigError};
use crate::error::{ApiError, ErrorKind};
use crate::rate_limit::{RateLimiter, RateLimiterStats};
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, RawRequest, RawResponse, Transport};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

/// A successful, decoded API response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    /// Decode the response body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            ApiError::new(ErrorKind::Unknown, format!("failed to decode response body: {e}"))
                .with_status(self.status)
                .with_source(e)
        })
    }
}

/// Client for a tailnet-scoped control-plane API.
///
/// One instance per credential set; instances are independent, so clients
/// for different tailnets coexist without sharing any pacing state.
pub struct ApiClient {
    base_url: String,
    api_key: String,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client with the production HTTP transport.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(config, transport)
    }

    /// Build a client over an injected transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let retry = RetryPolicy::builder()
            .max_retries(config.max_retries)
            .backoff_factor(config.backoff_factor)
            .jitter(config.jitter)
            .build()?;
        let rate_limiter = RateLimiter::new(config.rate, config.window);
        let base_url = format!(
            "{}/api/v2/tailnet/{}",
            config.base_url.trim_end_matches('/'),
            config.tailnet
        );

        info!(tailnet = %config.tailnet, base_url = %base_url, "API client initialized");

        Ok(Self { base_url, api_key: config.api_key, rate_limiter, retry, transport })
    }

    /// Issue a request against the tailnet-scoped API.
    ///
    /// `path` is relative to the tailnet root (e.g. `/devices`). The call is
    /// paced by the rate limiter and transient failures are retried; any
    /// failure surfaces as a classified [`ApiError`].
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, ApiError> {
        self.execute_with_headers(method, path, body, &[]).await
    }

    /// Like [`execute`](Self::execute), with extra headers merged over the
    /// defaults.
    pub async fn execute_with_headers(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: &[(&str, &str)],
    ) -> Result<ApiResponse, ApiError> {
        let url = self.request_url(path);
        let mut headers = vec![
            ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        headers.extend(extra_headers.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let limiter = &self.rate_limiter;
        let transport = &self.transport;

        self.retry
            .execute(|| {
                let request = RawRequest {
                    method: method.clone(),
                    url: url.clone(),
                    headers: headers.clone(),
                    body: body.clone(),
                };
                let transport = Arc::clone(transport);
                async move {
                    limiter.acquire().await;

                    debug!(method = %request.method, url = %request.url, "issuing API request");
                    let started = Instant::now();

                    let response =
                        transport.call(request).await.map_err(classify_transport)?;
                    if !(200..300).contains(&response.status) {
                        return Err(classify_status(response.status, &response.body));
                    }

                    let bytes = response.body.len();
                    let parsed = parse_body(&response)?;
                    debug!(
                        status = response.status,
                        bytes,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "API request succeeded"
                    );
                    Ok(ApiResponse { status: response.status, body: parsed })
                }
            })
            .await
    }

    /// Rate limiter snapshot, for observability.
    pub async fn rate_limit_stats(&self) -> RateLimiterStats {
        self.rate_limiter.stats().await
    }

    /// Release transport resources. Call once at shutdown.
    pub async fn close(&self) {
        self.transport.close().await;
    }

    fn request_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Empty and 204 responses decode as an empty object; everything else must be
/// valid JSON.
fn parse_body(response: &RawResponse) -> Result<Value, ApiError> {
    if response.status == 204 || response.body.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(&response.body).map_err(|e| {
        ApiError::new(ErrorKind::Unknown, format!("response was not valid JSON: {e}"))
            .with_status(response.status)
            .with_source(e)
    })
}
