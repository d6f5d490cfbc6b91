//! Service configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use deskbrief_auth::IssuerConfig;

/// Google OAuth endpoints.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Default OAuth scopes: read-only calendar and mail.
pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/gmail.readonly",
];

/// OAuth 2.0 client credentials.
///
/// Registered in the Google Cloud Console; the client secret never leaves
/// the server side.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
}

/// Structure of Google's OAuth credentials JSON download.
///
/// Supports the Cloud Console format with an "installed" or "web" section,
/// and the flat format with client_id and client_secret at the root.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read credentials file: {}", e))?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a credentials JSON string.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| format!("failed to parse credentials JSON: {}", e))?;

        if let Some(nested) = file.web.or(file.installed) {
            return Ok(Self::new(nested.client_id, nested.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err("credentials file must contain a 'web'/'installed' section or \
             'client_id'/'client_secret' at the root"
            .to_string())
    }

    /// Validates that the credentials appear correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the deskbrief service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OAuth client credentials.
    pub credentials: OAuthCredentials,

    /// The provider's authorization endpoint.
    pub auth_url: Url,

    /// The provider's token endpoint.
    pub token_url: Url,

    /// Redirect URI registered for this deployment.
    pub redirect_uri: Url,

    /// OAuth scopes to request at login.
    pub scopes: Vec<String>,

    /// Timeout applied to every outbound network call.
    pub timeout: Duration,

    /// Session bundle lifetime when the provider does not report token
    /// expiry.
    pub default_bundle_ttl: Duration,
}

impl AppConfig {
    /// Default network timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default session bundle lifetime in seconds.
    pub const DEFAULT_BUNDLE_TTL_SECS: u64 = 3600;

    /// Creates a configuration with Google's endpoints and the default
    /// read-only scopes.
    pub fn new(credentials: OAuthCredentials, redirect_uri: Url) -> Self {
        Self {
            credentials,
            auth_url: GOOGLE_AUTH_URL.parse().expect("valid endpoint URL"),
            token_url: GOOGLE_TOKEN_URL.parse().expect("valid endpoint URL"),
            redirect_uri,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            default_bundle_ttl: Duration::from_secs(Self::DEFAULT_BUNDLE_TTL_SECS),
        }
    }

    /// Overrides the authorization endpoint.
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Overrides the token endpoint.
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the network timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the fallback session bundle lifetime.
    pub fn with_bundle_ttl(mut self, ttl: Duration) -> Self {
        self.default_bundle_ttl = ttl;
        self
    }

    /// Token endpoint configuration for the issuer.
    pub fn issuer_config(&self) -> IssuerConfig {
        IssuerConfig::new(
            self.credentials.client_id.clone(),
            self.credentials.client_secret.clone(),
            self.token_url.clone(),
            self.redirect_uri.clone(),
        )
        .with_timeout(self.timeout)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.credentials
            .validate()
            .map_err(|e| format!("invalid credentials: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }

        Ok(())
    }
}
