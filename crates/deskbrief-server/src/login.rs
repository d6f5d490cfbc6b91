//! Server-side OAuth2 login flow.
//!
//! [`LoginFlow::begin`] produces the authorization URL the UI redirects
//! the user to; [`LoginFlow::finish`] validates the returned state and
//! exchanges the authorization code for the session's initial
//! credentials.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use thiserror::Error;
use tracing::info;

use deskbrief_auth::{ExchangeError, SessionCredentials, TokenIssuer};

use crate::config::AppConfig;

/// Length of the state nonce before encoding.
const STATE_LENGTH: usize = 16;

/// A started login.
///
/// Send the user to `authorization_url`; keep `state` server-side (or in
/// a short-lived cookie) to verify the callback.
#[derive(Debug, Clone)]
pub struct LoginStart {
    /// The provider's consent page URL for this deployment.
    pub authorization_url: String,
    /// Random state echoed back in the callback.
    pub state: String,
}

/// Errors completing a login.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The state parameter did not match; possible CSRF.
    #[error("login state mismatch")]
    StateMismatch,

    /// The authorization code exchange failed. Terminal: the user must
    /// restart the login.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// The OAuth2 authorization-code flow for this deployment.
pub struct LoginFlow {
    config: AppConfig,
}

impl LoginFlow {
    /// Creates a login flow over the service configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Builds the authorization URL with a fresh CSRF state.
    ///
    /// Requests offline access with a consent prompt so the provider
    /// issues a refresh token alongside the first access token.
    pub fn begin(&self) -> LoginStart {
        let state = generate_state();
        let scope = self.config.scopes.join(" ");

        let authorization_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&\
             access_type=offline&prompt=consent",
            self.config.auth_url,
            urlencoding::encode(&self.config.credentials.client_id),
            urlencoding::encode(self.config.redirect_uri.as_str()),
            urlencoding::encode(&scope),
            urlencoding::encode(&state),
        );

        LoginStart {
            authorization_url,
            state,
        }
    }

    /// Completes the flow after the provider redirected back.
    pub async fn finish(
        &self,
        issuer: &dyn TokenIssuer,
        code: &str,
        state: &str,
        expected_state: &str,
    ) -> Result<SessionCredentials, LoginError> {
        if state != expected_state {
            return Err(LoginError::StateMismatch);
        }

        let exchange = issuer.exchange_authorization_code(code).await?;

        let mut credentials = SessionCredentials::new();
        credentials.apply_exchange(&exchange);

        info!("session authorized");
        Ok(credentials)
    }
}

/// Random URL-safe state for CSRF protection.
fn generate_state() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..STATE_LENGTH).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}
