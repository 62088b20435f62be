//! Maps raw transport outcomes to classified [`ApiError`]s.
//!
//! This is the single place where HTTP statuses and transport-level failures
//! become domain errors. Everything downstream (retry decisions, caller
//! matching) works off the resulting [`ErrorKind`].
//!
//! Status mapping:
//!
//! | Status | Kind | Retryable |
//! |---|---|---|
//! | 401, 403 | `Authentication` | no |
//! | 404 | `NotFound` | no |
//! | 400 | `Validation` | no |
//! | 429 | `RateLimitExceeded` | no |
//! | 500, 502, 503, 504 | `TransientServer` | yes |
//! | anything else | `Unknown` | no |
//!
//! Transport failures (connection errors, timeouts) all classify as
//! `TransientServer`. A 429 is deliberately fatal: the client already paces
//! itself below the provider limit, so repeated 429s mean the pacing
//! configuration is wrong, and retrying would only mask that.

use crate::error::{ApiError, ErrorKind};
use crate::transport::TransportError;

/// Error messages keep at most this many characters of the response body.
const BODY_SNIPPET_LEN: usize = 200;

/// Classify a non-success HTTP response.
pub fn classify_status(status: u16, body: &str) -> ApiError {
    match status {
        401 => ApiError::new(ErrorKind::Authentication, "invalid API key or authentication failed")
            .with_status(status),
        403 => ApiError::new(ErrorKind::Authentication, "access denied for the supplied credentials")
            .with_status(status),
        404 => ApiError::new(ErrorKind::NotFound, "resource not found").with_status(status),
        400 => ApiError::new(
            ErrorKind::Validation,
            with_snippet("request validation failed", body),
        )
        .with_status(status),
        429 => ApiError::new(ErrorKind::RateLimitExceeded, "provider rate limit exceeded")
            .with_status(status),
        500 | 502 | 503 | 504 => ApiError::new(
            ErrorKind::TransientServer,
            with_snippet(&format!("server error {status}"), body),
        )
        .with_status(status),
        _ => ApiError::new(
            ErrorKind::Unknown,
            with_snippet(&format!("unexpected status {status}"), body),
        )
        .with_status(status),
    }
}

/// Classify a transport-level failure (connection error or timeout).
pub fn classify_transport(err: TransportError) -> ApiError {
    ApiError::new(ErrorKind::TransientServer, format!("network error: {err}")).with_source(err)
}

fn with_snippet(prefix: &str, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return prefix.to_string();
    }
    let snippet: String = trimmed.chars().take(BODY_SNIPPET_LEN).collect();
    format!("{prefix}: {snippet}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn auth_statuses_map_to_authentication() {
        for status in [401, 403] {
            let err = classify_status(status, "");
            assert_eq!(err.kind(), ErrorKind::Authentication);
            assert_eq!(err.status(), Some(status));
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn not_found_maps_to_not_found() {
        let err = classify_status(404, "");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_retryable());
    }

    #[test]
    fn bad_request_maps_to_validation() {
        let err = classify_status(400, r#"{"message":"missing field"}"#);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("missing field"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn too_many_requests_is_fatal() {
        let err = classify_status(429, "");
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [500, 502, 503, 504] {
            let err = classify_status(status, "upstream exploded");
            assert_eq!(err.kind(), ErrorKind::TransientServer);
            assert_eq!(err.status(), Some(status));
            assert!(err.is_retryable());
            assert!(err.message().contains("upstream exploded"));
        }
    }

    #[test]
    fn unexpected_statuses_map_to_unknown() {
        for status in [301, 402, 418, 501, 599] {
            let err = classify_status(status, "");
            assert_eq!(err.kind(), ErrorKind::Unknown);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn transport_failures_are_transient() {
        let timeout = classify_transport(TransportError::Timeout {
            elapsed: Duration::from_secs(30),
        });
        assert_eq!(timeout.kind(), ErrorKind::TransientServer);
        assert!(timeout.is_retryable());

        let connect = classify_transport(TransportError::Connect("connection refused".into()));
        assert_eq!(connect.kind(), ErrorKind::TransientServer);
        assert!(connect.message().contains("connection refused"));
    }

    #[test]
    fn body_snippets_are_bounded() {
        let body = "x".repeat(5000);
        let err = classify_status(500, &body);
        assert!(err.message().len() < 300);
    }
}
