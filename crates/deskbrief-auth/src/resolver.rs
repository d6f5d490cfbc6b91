//! Session resolution and refresh.
//!
//! The resolver is the only component that mutates stored credentials. It
//! is evaluated fresh per incoming request: the credential store is the
//! source of truth and there is no process-wide session cache.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::credentials::CredentialStore;
use crate::error::{RefreshErrorKind, SessionError};
use crate::issuer::TokenIssuer;

/// Where a resolved access token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// The token was already stored and is returned optimistically,
    /// without pre-validation. The provider call is the validator.
    Existing,
    /// The token was obtained by a refresh exchange during resolution.
    Refreshed,
}

/// An access token ready to be attached to a provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    /// The access token.
    pub token: String,
    /// How the token was obtained.
    pub source: TokenSource,
}

/// Resolves a usable access token for one session.
pub struct SessionResolver {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<dyn TokenIssuer>,
    /// Serializes refresh exchanges so concurrent callers coalesce into a
    /// single issuer call per stale token.
    refresh_gate: Mutex<()>,
}

impl SessionResolver {
    /// Creates a resolver over the session's store and the token issuer.
    pub fn new(store: Arc<dyn CredentialStore>, issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            store,
            issuer,
            refresh_gate: Mutex::new(()),
        }
    }

    /// Resolves a token for the session.
    ///
    /// A stored access token is returned as-is, even when its recorded
    /// expiry has passed; validation is delegated to the actual provider
    /// call to avoid an extra round trip. Without an access token, a
    /// stored refresh token recovers the session. `AuthRequired` leaves
    /// the stored credentials untouched.
    pub async fn resolve(&self) -> Result<ResolvedToken, SessionError> {
        let credentials = self.store.read();
        if let Some(token) = credentials.access_token {
            return Ok(ResolvedToken {
                token,
                source: TokenSource::Existing,
            });
        }
        self.refresh_and_store(None).await
    }

    /// Refreshes even though an access token may be stored.
    ///
    /// Used after the provider rejected `stale_token`. If another caller
    /// already replaced it, the replacement is returned without a second
    /// exchange.
    pub async fn force_refresh(&self, stale_token: &str) -> Result<ResolvedToken, SessionError> {
        self.refresh_and_store(Some(stale_token)).await
    }

    async fn refresh_and_store(
        &self,
        stale_token: Option<&str>,
    ) -> Result<ResolvedToken, SessionError> {
        let _gate = self.refresh_gate.lock().await;

        // Re-read after acquiring the gate: a concurrent caller may have
        // finished a refresh while this one waited.
        let mut credentials = self.store.read();
        if let Some(current) = credentials.access_token.as_deref() {
            match stale_token {
                None => {
                    return Ok(ResolvedToken {
                        token: current.to_string(),
                        source: TokenSource::Existing,
                    });
                }
                Some(stale) if current != stale => {
                    debug!("access token already replaced by a concurrent refresh");
                    return Ok(ResolvedToken {
                        token: current.to_string(),
                        source: TokenSource::Refreshed,
                    });
                }
                Some(_) => {}
            }
        }

        let Some(refresh_token) = credentials.refresh_token.clone() else {
            debug!("no refresh token stored, session requires re-authentication");
            return Err(SessionError::AuthRequired);
        };

        let exchange = match self.issuer.refresh(&refresh_token).await {
            Ok(exchange) => exchange,
            Err(e) if e.kind == RefreshErrorKind::InvalidGrant => {
                // Terminal for the session. Credentials stay in place:
                // clearing is reserved for explicit logout.
                warn!(detail = %e, "refresh token no longer valid");
                return Err(SessionError::AuthRequired);
            }
            Err(e) => {
                warn!(detail = %e, "token refresh failed transiently");
                return Err(SessionError::Refresh(e));
            }
        };

        credentials.apply_exchange(&exchange);
        self.store.write(credentials);
        debug!("stored refreshed access token");

        Ok(ResolvedToken {
            token: exchange.access_token,
            source: TokenSource::Refreshed,
        })
    }
}
