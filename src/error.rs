//! Error types for the API client.
//!
//! Every failure surfaced by this crate is an [`ApiError`] carrying a closed
//! [`ErrorKind`], so callers match on the kind instead of string-parsing
//! messages. Retry eligibility is a property of the kind: only
//! [`ErrorKind::TransientServer`] failures are ever retried.

use std::fmt;

/// Closed classification of API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The credentials were rejected (401) or lack access (403).
    Authentication,
    /// The requested resource does not exist (404).
    NotFound,
    /// The provider returned 429. The client paces its own requests, so a 429
    /// indicates pacing misconfiguration and is surfaced immediately rather
    /// than retried.
    RateLimitExceeded,
    /// The request was rejected as malformed (400).
    Validation,
    /// A 5xx response, connection failure, or timeout. Retryable.
    TransientServer,
    /// Any other status or unexpected response shape. Not retried.
    Unknown,
}

impl ErrorKind {
    /// Whether failures of this kind are eligible for retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientServer)
    }

    /// Stable machine-readable name for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimitExceeded => "rate_limit_exceeded",
            ErrorKind::Validation => "validation",
            ErrorKind::TransientServer => "transient_server",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified API failure.
///
/// Constructed at the moment a failure is observed (see [`crate::classify`])
/// and propagated unchanged up the call stack. The original cause, when one
/// exists, is reachable through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Construct an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), status: None, source: None }
    }

    /// Attach the HTTP status that produced this error.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The HTTP status code, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Whether this error is eligible for retry.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
