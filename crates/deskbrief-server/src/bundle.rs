//! Signed session credential bundles.
//!
//! Credentials travel between requests as an opaque value (typically a
//! cookie): base64url-encoded JSON followed by a keyed BLAKE3 tag over the
//! encoded payload. Opening verifies the tag before touching the payload;
//! a malformed or tampered value reads as no session at all.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng as _;
use thiserror::Error;

use deskbrief_auth::SessionCredentials;

/// Length of the bundle signing key in bytes.
const KEY_LENGTH: usize = 32;

/// Cookie name carrying the session bundle.
pub const SESSION_COOKIE: &str = "deskbrief_session";

/// Errors opening an inbound bundle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BundleError {
    /// The value is not a well-formed bundle.
    #[error("malformed bundle")]
    Malformed,

    /// The tag does not match the payload.
    #[error("bundle signature mismatch")]
    Signature,
}

/// Secret key for sealing and opening session bundles.
///
/// Each deployment generates one and keeps it stable across restarts so
/// sessions survive; rotating the key invalidates every outstanding
/// bundle.
#[derive(Clone)]
pub struct BundleKey([u8; KEY_LENGTH]);

impl BundleKey {
    /// Generates a random key.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut bytes = [0u8; KEY_LENGTH];
        rng.fill(&mut bytes[..]);
        Self(bytes)
    }

    /// Parses a base64url-encoded 32-byte key.
    pub fn from_base64(encoded: &str) -> Result<Self, String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| format!("invalid key encoding: {}", e))?;
        let bytes: [u8; KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| format!("key must be {} bytes", KEY_LENGTH))?;
        Ok(Self(bytes))
    }

    /// Encodes the key for storage in deployment configuration.
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }
}

impl fmt::Debug for BundleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BundleKey(..)")
    }
}

/// Seals credentials into an opaque transportable value.
pub fn seal(credentials: &SessionCredentials, key: &BundleKey) -> String {
    let payload = serde_json::to_vec(credentials).expect("credentials serialize to JSON");
    let body = URL_SAFE_NO_PAD.encode(&payload);
    let tag = blake3::keyed_hash(&key.0, body.as_bytes());
    format!("{}.{}", body, URL_SAFE_NO_PAD.encode(tag.as_bytes()))
}

/// Opens and verifies an inbound bundle.
pub fn open(value: &str, key: &BundleKey) -> Result<SessionCredentials, BundleError> {
    let (body, tag) = value.split_once('.').ok_or(BundleError::Malformed)?;

    let tag_bytes = URL_SAFE_NO_PAD
        .decode(tag)
        .map_err(|_| BundleError::Malformed)?;
    let tag_bytes: [u8; blake3::OUT_LEN] =
        tag_bytes.try_into().map_err(|_| BundleError::Malformed)?;

    // blake3::Hash comparison is constant-time.
    let expected = blake3::keyed_hash(&key.0, body.as_bytes());
    if expected != blake3::Hash::from(tag_bytes) {
        return Err(BundleError::Signature);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|_| BundleError::Malformed)?;
    serde_json::from_slice(&payload).map_err(|_| BundleError::Malformed)
}

/// A Set-Cookie value for the session bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    /// The sealed bundle, or empty when clearing.
    pub value: String,
    /// Cookie lifetime in seconds.
    pub max_age: u64,
}

impl SetCookie {
    /// Builds the cookie for freshly rotated credentials.
    ///
    /// Lifetime is capped at the access token's remaining validity, with
    /// `default_ttl` applied when the provider reported no expiry.
    pub fn for_credentials(
        credentials: &SessionCredentials,
        key: &BundleKey,
        default_ttl: Duration,
    ) -> Self {
        let max_age = match credentials.seconds_until_expiry(Utc::now()) {
            Some(secs) => secs as u64,
            None => default_ttl.as_secs(),
        };

        Self {
            value: seal(credentials, key),
            max_age,
        }
    }

    /// A cookie that clears the session bundle (logout).
    pub fn clearing() -> Self {
        Self {
            value: String::new(),
            max_age: 0,
        }
    }

    /// Renders the Set-Cookie header value.
    pub fn header_value(&self) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=Lax",
            SESSION_COOKIE, self.value, self.max_age
        )
    }
}
