//! Error taxonomy for the token lifecycle.

use std::fmt;

use thiserror::Error;

/// Reason a refresh-token exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshErrorKind {
    /// The refresh token is revoked or expired. Not retryable: the user
    /// must re-authenticate.
    InvalidGrant,
    /// The token endpoint could not be reached (timeout, DNS failure,
    /// connection reset).
    NetworkFailure,
    /// The token endpoint answered but is unhealthy (5xx, or a success
    /// body that could not be decoded).
    ProviderUnavailable,
}

impl RefreshErrorKind {
    /// Returns true if the caller may retry the refresh later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidGrant)
    }

    /// Returns a stable machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidGrant => "invalid_grant",
            Self::NetworkFailure => "network_failure",
            Self::ProviderUnavailable => "provider_unavailable",
        }
    }
}

impl fmt::Display for RefreshErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed refresh-token exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("token refresh failed ({kind}): {detail}")]
pub struct RefreshError {
    /// What went wrong, for retry decisions.
    pub kind: RefreshErrorKind,
    /// Human-readable detail, including the provider's error code when
    /// one was returned.
    pub detail: String,
}

impl RefreshError {
    /// Creates an invalid-grant error (refresh token revoked/expired).
    pub fn invalid_grant(detail: impl Into<String>) -> Self {
        Self {
            kind: RefreshErrorKind::InvalidGrant,
            detail: detail.into(),
        }
    }

    /// Creates a network failure error.
    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: RefreshErrorKind::NetworkFailure,
            detail: detail.into(),
        }
    }

    /// Creates a provider-unavailable error.
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            kind: RefreshErrorKind::ProviderUnavailable,
            detail: detail.into(),
        }
    }

    /// Returns true if the caller may retry the refresh later.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// A failed authorization-code exchange.
///
/// Always terminal: the user must restart the login flow.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The provider rejected the code (expired, already used, invalid
    /// client).
    #[error("authorization code rejected: {detail}")]
    Rejected { detail: String },

    /// The token endpoint could not be reached.
    #[error("token endpoint request failed: {detail}")]
    Network { detail: String },

    /// The token endpoint answered with a server error.
    #[error("token endpoint unavailable ({status}): {detail}")]
    Unavailable { status: u16, detail: String },

    /// The token endpoint returned a body that could not be decoded.
    #[error("unexpected token endpoint response: {detail}")]
    InvalidResponse { detail: String },
}

/// Why session resolution could not produce a token.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No usable token and no recoverable path. The caller must surface
    /// an authentication-required outcome; stored credentials are left
    /// untouched (only explicit logout clears them).
    #[error("re-authentication required")]
    AuthRequired,

    /// The refresh attempt failed transiently. Retrying is at the
    /// caller's discretion; the resolver never retries internally.
    #[error(transparent)]
    Refresh(RefreshError),
}
