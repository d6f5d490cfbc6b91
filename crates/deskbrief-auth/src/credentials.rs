//! Session credentials and the credential store abstraction.
//!
//! A session holds at most one access token and one refresh token. The
//! store only holds and returns values; pushing them to the outside world
//! (cookies, session records) happens at the transport boundary.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::issuer::TokenExchange;

/// Credentials held for one authorized session.
///
/// If the access token is absent the session is unauthenticated, unless a
/// refresh token is present, in which case it is recoverable without user
/// interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    /// Short-lived token attached to provider API calls.
    pub access_token: Option<String>,

    /// Long-lived token used to obtain new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires, if the provider reported it.
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionCredentials {
    /// Creates empty (unauthenticated) credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if neither token is present.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// Returns true if the session can be recovered without user
    /// interaction: no access token, but a refresh token is present.
    pub fn is_recoverable(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_some()
    }

    /// Seconds until the access token expires, if expiry is known.
    ///
    /// Already-expired tokens yield zero rather than a negative value.
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|at| (at - now).num_seconds().max(0))
    }

    /// Applies a token exchange result.
    ///
    /// Refresh exchanges may omit a new refresh token; the stored one
    /// remains valid and is never overwritten with absence.
    pub fn apply_exchange(&mut self, exchange: &TokenExchange) {
        self.access_token = Some(exchange.access_token.clone());
        self.expires_at = exchange.expires_at;
        if exchange.refresh_token.is_some() {
            self.refresh_token = exchange.refresh_token.clone();
        }
    }
}

/// Holds the credentials for one session.
///
/// A write replaces the whole value and is visible to the next read within
/// the same request lifecycle; there are no partial updates.
/// Implementations use interior mutability so a store can be shared behind
/// an `Arc` between the resolver and the boundary.
pub trait CredentialStore: Send + Sync {
    /// Returns the current credentials.
    fn read(&self) -> SessionCredentials;

    /// Replaces the stored credentials.
    fn write(&self, credentials: SessionCredentials);
}

/// Request-scoped in-memory store.
///
/// Seeded from the inbound credential bundle at the start of a request.
/// Nothing is persisted here; after the request ran, the boundary collects
/// rotated credentials via [`RequestStore::rotated`] and persists them
/// with the transport's own mechanism.
#[derive(Debug)]
pub struct RequestStore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    current: SessionCredentials,
    written: bool,
}

impl RequestStore {
    /// Creates a store seeded with the inbound credentials.
    pub fn new(credentials: SessionCredentials) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: credentials,
                written: false,
            }),
        }
    }

    /// Returns the rotated credentials if any write occurred since the
    /// store was created.
    pub fn rotated(&self) -> Option<SessionCredentials> {
        let inner = self.inner.lock().unwrap();
        inner.written.then(|| inner.current.clone())
    }
}

impl CredentialStore for RequestStore {
    fn read(&self) -> SessionCredentials {
        self.inner.lock().unwrap().current.clone()
    }

    fn write(&self, credentials: SessionCredentials) {
        let mut inner = self.inner.lock().unwrap();
        inner.current = credentials;
        inner.written = true;
    }
}
