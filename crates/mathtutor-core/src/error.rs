//! Error types shared across mathtutor.
//!
//! `ProviderError` lives here rather than in `mathtutor-providers` so the
//! lifecycle controller can downcast provider failures and make retry
//! decisions without string matching.

use thiserror::Error;

use crate::model::SessionId;
use crate::parser::ParseFailure;

/// Errors that can occur when talking to a generation service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid or missing API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` for failures worth retrying: rate limits, timeouts,
    /// network errors and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::NetworkError(_) => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_) => false,
        }
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Failures surfaced by the problem lifecycle controller.
///
/// Feedback generation problems are deliberately absent: they degrade to
/// fallback feedback instead of failing the submission.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A required request field was missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The generation service call failed after retries.
    #[error("generation service failed: {0:#}")]
    Generation(anyhow::Error),

    /// The generation service answered, but no problem could be read from it.
    #[error("could not parse a problem from the generated text: {0}")]
    UnparsableProblem(ParseFailure),

    /// The store could not be read while looking up a session.
    #[error("failed to look up session {id}: {source:#}")]
    SessionLookup {
        id: SessionId,
        source: anyhow::Error,
    },

    /// No session (and so no correct answer) exists for this id.
    #[error("no session found for id {0}")]
    SessionNotFound(SessionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(ProviderError::RateLimited { retry_after_ms: 0 }.is_transient());
        assert!(ProviderError::Timeout(120).is_transient());
        assert!(ProviderError::NetworkError("reset".into()).is_transient());
        let api = |status| ProviderError::ApiError {
            status,
            message: String::new(),
        };
        assert!(api(500).is_transient());
        assert!(api(503).is_transient());
        assert!(!api(400).is_transient());
        assert!(!api(404).is_transient());
        assert!(!api(200).is_transient());
        assert!(!api(0).is_transient());
        assert!(!ProviderError::AuthenticationFailed("bad key".into()).is_transient());
        assert!(!ProviderError::ModelNotFound("gemini-x".into()).is_transient());
    }

    #[test]
    fn retry_after_only_for_rate_limits() {
        let err = ProviderError::RateLimited {
            retry_after_ms: 5000,
        };
        assert_eq!(err.retry_after_ms(), Some(5000));
        assert_eq!(ProviderError::NetworkError("reset".into()).retry_after_ms(), None);
    }

    #[test]
    fn missing_field_message() {
        assert_eq!(
            LifecycleError::MissingField("prompt").to_string(),
            "prompt is required"
        );
    }
}
