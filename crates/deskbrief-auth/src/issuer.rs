//! Token endpoint client.
//!
//! The issuer performs the two OAuth2 grants this service uses: exchanging
//! an authorization code after login, and exchanging a refresh token when
//! an access token went stale. It is stateless, pure request/response, and
//! never touches a credential store.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{ExchangeError, RefreshError};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Tokens produced by one token endpoint exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenExchange {
    /// The new access token.
    pub access_token: String,

    /// A new refresh token, when the endpoint issued one. Refresh
    /// exchanges usually omit this and the previous token stays valid.
    pub refresh_token: Option<String>,

    /// Expiry of the new access token, when reported.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenExchange {
    /// Buffer subtracted from the reported lifetime so tokens read as
    /// stale slightly before the provider would reject them.
    const EXPIRY_BUFFER_SECS: i64 = 60;

    /// Builds an exchange result from token endpoint response fields.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> Self {
        let expires_at = expires_in_secs
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs - Self::EXPIRY_BUFFER_SECS));

        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
        }
    }
}

/// Performs OAuth2 exchanges against the provider's token endpoint.
pub trait TokenIssuer: Send + Sync {
    /// Exchanges an authorization code for an initial token set.
    fn exchange_authorization_code<'a>(
        &'a self,
        code: &'a str,
    ) -> BoxFuture<'a, Result<TokenExchange, ExchangeError>>;

    /// Exchanges a refresh token for a new access token.
    ///
    /// Transient failures are reported, never retried here.
    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<TokenExchange, RefreshError>>;
}

/// Token endpoint configuration.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    /// OAuth2 client ID.
    pub client_id: String,

    /// OAuth2 client secret.
    pub client_secret: String,

    /// The provider's token endpoint.
    pub token_url: Url,

    /// Redirect URI registered for the authorization-code flow.
    pub redirect_uri: Url,

    /// Timeout applied to each token endpoint request.
    pub timeout: Duration,
}

impl IssuerConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a new issuer configuration.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: Url,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url,
            redirect_uri,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.is_empty() {
            return Err("client_id is required".to_string());
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required".to_string());
        }
        Ok(())
    }
}

/// reqwest-backed token issuer.
#[derive(Debug)]
pub struct HttpTokenIssuer {
    config: IssuerConfig,
    http: reqwest::Client,
}

impl HttpTokenIssuer {
    /// Creates a new issuer with the given configuration.
    pub fn new(config: IssuerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");

        Self { config, http }
    }

    async fn exchange(&self, code: String) -> Result<TokenExchange, ExchangeError> {
        let redirect_uri = self.config.redirect_uri.to_string();
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code.as_str()),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| ExchangeError::Network {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ExchangeError::Network {
            detail: format!("failed to read response: {}", e),
        })?;

        if status.is_server_error() {
            return Err(ExchangeError::Unavailable {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }
        if !status.is_success() {
            return Err(ExchangeError::Rejected {
                detail: error_detail(&body),
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ExchangeError::InvalidResponse {
                detail: e.to_string(),
            })?;

        info!("exchanged authorization code for tokens");
        Ok(TokenExchange::new(
            token.access_token,
            token.refresh_token,
            token.expires_in,
        ))
    }

    async fn refresh_grant(&self, refresh_token: String) -> Result<TokenExchange, RefreshError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RefreshError::network("token endpoint timeout")
                } else {
                    RefreshError::network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RefreshError::network(format!("failed to read response: {}", e)))?;

        if status.is_server_error() {
            return Err(RefreshError::unavailable(format!(
                "{}: {}",
                status,
                error_detail(&body)
            )));
        }
        if !status.is_success() {
            // A 4xx means the grant itself was rejected. invalid_grant is
            // the usual code for a revoked or expired refresh token.
            return Err(RefreshError::invalid_grant(error_detail(&body)));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            RefreshError::unavailable(format!("undecodable token response: {}", e))
        })?;

        debug!("refreshed access token");
        Ok(TokenExchange::new(
            token.access_token,
            token.refresh_token,
            token.expires_in,
        ))
    }
}

impl TokenIssuer for HttpTokenIssuer {
    fn exchange_authorization_code<'a>(
        &'a self,
        code: &'a str,
    ) -> BoxFuture<'a, Result<TokenExchange, ExchangeError>> {
        Box::pin(self.exchange(code.to_string()))
    }

    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<TokenExchange, RefreshError>> {
        Box::pin(self.refresh_grant(refresh_token.to_string()))
    }
}

/// Successful token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Error body returned by the token endpoint on rejection.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Extracts the provider's error code and description from a rejection
/// body, falling back to a trimmed excerpt of the raw body.
fn error_detail(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<TokenErrorResponse>(body)
        && let Some(error) = parsed.error
    {
        return match parsed.error_description {
            Some(description) => format!("{}: {}", error, description),
            None => error,
        };
    }
    body.trim().chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> IssuerConfig {
        IssuerConfig::new(
            "client-id",
            "client-secret",
            "https://oauth2.googleapis.com/token".parse().unwrap(),
            "https://app.example.com/oauth/callback".parse().unwrap(),
        )
    }

    #[test]
    fn exchange_expiry_carries_buffer() {
        let before = Utc::now();
        let exchange = TokenExchange::new("at", None, Some(3600));
        let expires_at = exchange.expires_at.unwrap();

        assert!(expires_at > before + chrono::Duration::seconds(3600 - 120));
        assert!(expires_at <= Utc::now() + chrono::Duration::seconds(3600 - 60));
    }

    #[test]
    fn exchange_without_expiry() {
        let exchange = TokenExchange::new("at", Some("rt".to_string()), None);
        assert!(exchange.expires_at.is_none());
        assert_eq!(exchange.refresh_token.as_deref(), Some("rt"));
    }

    #[test]
    fn config_validation() {
        assert!(test_config().validate().is_ok());

        let mut config = test_config();
        config.client_id = String::new();
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.client_secret = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_timeout_builder() {
        let config = test_config().with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn token_response_parsing() {
        let json = r#"{
            "access_token": "ya29.abc",
            "expires_in": 3599,
            "refresh_token": "1//rt",
            "scope": "https://www.googleapis.com/auth/calendar.readonly",
            "token_type": "Bearer"
        }"#;

        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "ya29.abc");
        assert_eq!(token.refresh_token.as_deref(), Some("1//rt"));
        assert_eq!(token.expires_in, Some(3599));
    }

    #[test]
    fn token_response_refresh_grant_omits_refresh_token() {
        let json = r#"{ "access_token": "ya29.def", "expires_in": 3599 }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn error_detail_prefers_provider_error_code() {
        let body = r#"{ "error": "invalid_grant", "error_description": "Token has been revoked." }"#;
        assert_eq!(error_detail(body), "invalid_grant: Token has been revoked.");

        let body = r#"{ "error": "invalid_client" }"#;
        assert_eq!(error_detail(body), "invalid_client");
    }

    #[test]
    fn error_detail_falls_back_to_excerpt() {
        assert_eq!(error_detail(" oops \n"), "oops");
    }
}
