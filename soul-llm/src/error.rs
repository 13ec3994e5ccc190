//! Provider and resolver error types.

use std::time::Duration;

use thiserror::Error;

/// Errors a single cognitive provider call can produce.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Rate limit or quota hit (HTTP 429, `RESOURCE_EXHAUSTED`).
    #[error("Provider quota exceeded")]
    QuotaExceeded,

    /// Credential rejected (HTTP 401/403, `API_KEY_INVALID`).
    #[error("Provider rejected the credential")]
    AuthInvalid,

    /// Model or endpoint not found (HTTP 404).
    #[error("Provider model or endpoint not found")]
    NotFound,

    /// Request timed out.
    #[error("Provider request timed out after {0}ms")]
    Timeout(u64),

    /// The provider answered but produced no text.
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// Provider unreachable or failing server-side.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Any other failure.
    #[error("Provider request failed: {0}")]
    RequestFailed(String),
}

/// Failure classes surfaced to callers for messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFault {
    /// Quota or rate limit.
    QuotaExceeded,
    /// Invalid credential.
    AuthInvalid,
    /// Unknown model or endpoint.
    NotFound,
}

impl ProviderError {
    /// Classify a non-success HTTP response by status and body markers.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
            ProviderError::QuotaExceeded
        } else if status == 401 || status == 403 || body.contains("API_KEY_INVALID") {
            ProviderError::AuthInvalid
        } else if status == 404 {
            ProviderError::NotFound
        } else if status >= 500 {
            ProviderError::Unavailable(format!("HTTP {status}"))
        } else {
            ProviderError::RequestFailed(format!("HTTP {status}: {}", excerpt(body, 120)))
        }
    }

    /// Classify a transport failure. Timeouts report `timeout_ms`, the
    /// budget the request was sent with.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout_ms)
        } else if err.is_connect() {
            ProviderError::Unavailable(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::from_status(status.as_u16(), "")
        } else {
            ProviderError::RequestFailed(err.to_string())
        }
    }

    /// The messaging class of this failure, if it has one.
    #[must_use]
    pub fn fault(&self) -> Option<ProviderFault> {
        match self {
            ProviderError::QuotaExceeded => Some(ProviderFault::QuotaExceeded),
            ProviderError::AuthInvalid => Some(ProviderFault::AuthInvalid),
            ProviderError::NotFound => Some(ProviderFault::NotFound),
            _ => None,
        }
    }
}

/// Errors from [`crate::CognitiveResolver::resolve`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The shared cooldown has not elapsed; no provider was called.
    #[error("Cooldown active: {}s remaining", ceil_secs(.remaining))]
    CooldownActive {
        /// Time left before the call class is admitted again.
        remaining: Duration,
    },

    /// Every provider was tried and none produced text.
    #[error("All {attempts} cognitive providers failed")]
    AllProvidersExhausted {
        /// Providers attempted.
        attempts: usize,
        /// First classified failure seen, if any.
        fault: Option<ProviderFault>,
    },

    /// No provider is configured.
    #[error("No cognitive provider configured")]
    NoProviders,
}

impl ResolveError {
    /// Remaining cooldown in whole seconds, rounded up.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<u64> {
        match self {
            ResolveError::CooldownActive { remaining } => Some(ceil_secs(remaining)),
            _ => None,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn ceil_secs(d: &Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// First `max_chars` characters of `text`.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(ProviderError::from_status(429, ""), ProviderError::QuotaExceeded));
        assert!(matches!(
            ProviderError::from_status(400, "{\"status\":\"RESOURCE_EXHAUSTED\"}"),
            ProviderError::QuotaExceeded
        ));
        assert!(matches!(ProviderError::from_status(403, ""), ProviderError::AuthInvalid));
        assert!(matches!(
            ProviderError::from_status(400, "API_KEY_INVALID"),
            ProviderError::AuthInvalid
        ));
        assert!(matches!(ProviderError::from_status(404, ""), ProviderError::NotFound));
        assert!(matches!(ProviderError::from_status(503, ""), ProviderError::Unavailable(_)));
        assert!(matches!(ProviderError::from_status(418, "teapot"), ProviderError::RequestFailed(_)));
    }

    #[test]
    fn only_three_kinds_carry_a_fault() {
        assert_eq!(ProviderError::AuthInvalid.fault(), Some(ProviderFault::AuthInvalid));
        assert_eq!(ProviderError::EmptyResponse.fault(), None);
        assert_eq!(ProviderError::Timeout(10_000).fault(), None);
    }

    #[test]
    fn cooldown_seconds_round_up() {
        let err = ResolveError::CooldownActive {
            remaining: Duration::from_millis(4_200),
        };
        assert_eq!(err.remaining_secs(), Some(5));
        assert_eq!(err.to_string(), "Cooldown active: 5s remaining");
    }
}
