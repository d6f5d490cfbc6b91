//! Provider call outcomes.

use serde::de::DeserializeOwned;

use crate::transport::RawResponse;

/// Classified result of one provider API call.
///
/// Only [`CallOutcome::AuthError`] warrants a refresh-and-retry; rate
/// limits and outages are transient, and permanent errors indicate the
/// request itself is at fault. The variants are never conflated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    /// The call succeeded.
    Success(T),
    /// The provider rejected the credential (invalid or expired access
    /// token).
    AuthError { reason: String },
    /// Rate limiting, connectivity failure, or a provider-side outage.
    TransientError { reason: String },
    /// The request itself is at fault (malformed, not found, missing
    /// permission); retrying or refreshing will not change the result.
    PermanentError { reason: String },
}

impl<T> CallOutcome<T> {
    /// Returns true for a credential rejection.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthError { .. })
    }

    /// Returns true for a successful call.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Maps the success payload, leaving error variants untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U> {
        match self {
            Self::Success(payload) => CallOutcome::Success(f(payload)),
            Self::AuthError { reason } => CallOutcome::AuthError { reason },
            Self::TransientError { reason } => CallOutcome::TransientError { reason },
            Self::PermanentError { reason } => CallOutcome::PermanentError { reason },
        }
    }
}

impl CallOutcome<String> {
    /// Classifies a raw provider response. Applied exactly once, at the
    /// transport boundary.
    pub fn classify(response: RawResponse) -> Self {
        match response.status {
            200..=299 => Self::Success(response.body),
            401 => Self::AuthError {
                reason: "access token rejected by provider".to_string(),
            },
            429 => {
                let reason = match response.retry_after {
                    Some(secs) => format!("rate limit exceeded, retry after {} seconds", secs),
                    None => "rate limit exceeded".to_string(),
                };
                Self::TransientError { reason }
            }
            500..=599 => Self::TransientError {
                reason: format!(
                    "provider error ({}): {}",
                    response.status,
                    excerpt(&response.body)
                ),
            },
            status => Self::PermanentError {
                reason: format!("request rejected ({}): {}", status, excerpt(&response.body)),
            },
        }
    }

    /// Decodes a successful body into a typed payload.
    ///
    /// A body that does not match the expected shape is deterministic for
    /// the request and becomes a permanent error.
    pub fn decode<T: DeserializeOwned>(self) -> CallOutcome<T> {
        match self {
            Self::Success(body) => match serde_json::from_str(&body) {
                Ok(payload) => CallOutcome::Success(payload),
                Err(e) => CallOutcome::PermanentError {
                    reason: format!("unexpected response shape: {}", e),
                },
            },
            Self::AuthError { reason } => CallOutcome::AuthError { reason },
            Self::TransientError { reason } => CallOutcome::TransientError { reason },
            Self::PermanentError { reason } => CallOutcome::PermanentError { reason },
        }
    }
}

/// Trims a response body down to a loggable excerpt.
fn excerpt(body: &str) -> String {
    body.trim().chars().take(160).collect()
}
