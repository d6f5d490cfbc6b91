//! Route handler layer.
//!
//! Thin glue between the transport (whatever web framework the deployment
//! embeds this in) and the token/execution core: open the inbound bundle,
//! run the requested provider operation, map the classified outcome to a
//! transport status, and hand back a re-sealed bundle when credentials
//! rotated during the request.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use serde::Serialize;
use tracing::debug;

use deskbrief_auth::{
    HttpTokenIssuer, RequestStore, SessionCredentials, SessionResolver, TokenIssuer,
};
use deskbrief_google::{
    CalendarApi, CallOutcome, Executor, HttpTransport, MailApi, Transport,
};

use crate::bundle::{self, BundleKey, SetCookie};
use crate::config::AppConfig;
use crate::error::{ServerError, ServerResult};
use crate::login::{LoginError, LoginFlow, LoginStart};

/// Hours of calendar looked ahead for the briefing view.
const BRIEFING_WINDOW_HOURS: i64 = 48;

/// Items requested per provider listing.
const LISTING_LIMIT: usize = 20;

/// Machine-readable error codes surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The session cannot be recovered; the user must log in again.
    ReauthRequired,
    /// The provider is unreachable or rate limiting; retry later.
    ProviderUnavailable,
    /// The request was invalid.
    BadRequest,
}

impl ErrorCode {
    /// Transport status for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ReauthRequired => 401,
            Self::ProviderUnavailable => 503,
            Self::BadRequest => 400,
        }
    }
}

/// A transport-agnostic response produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: String,
    /// Set-Cookie to emit, when the session bundle changed.
    pub set_cookie: Option<SetCookie>,
}

impl Reply {
    fn ok(body: String, set_cookie: Option<SetCookie>) -> Self {
        Self {
            status: 200,
            body,
            set_cookie,
        }
    }

    fn error(code: ErrorCode, message: &str) -> Self {
        Self {
            status: code.http_status(),
            body: serde_json::json!({ "error": code, "message": message }).to_string(),
            set_cookie: None,
        }
    }
}

/// Shared wiring for all route handlers.
pub struct AppContext {
    config: AppConfig,
    key: BundleKey,
    issuer: Arc<dyn TokenIssuer>,
    transport: Arc<dyn Transport>,
}

impl AppContext {
    /// Builds a context with HTTP-backed issuer and transport.
    pub fn new(config: AppConfig, key: BundleKey) -> ServerResult<Self> {
        let issuer = Arc::new(HttpTokenIssuer::new(config.issuer_config()));
        let transport = Arc::new(HttpTransport::new(config.timeout));
        Self::with_backends(config, key, issuer, transport)
    }

    /// Builds a context over explicit issuer and transport
    /// implementations.
    pub fn with_backends(
        config: AppConfig,
        key: BundleKey,
        issuer: Arc<dyn TokenIssuer>,
        transport: Arc<dyn Transport>,
    ) -> ServerResult<Self> {
        config.validate().map_err(ServerError::config)?;

        Ok(Self {
            config,
            key,
            issuer,
            transport,
        })
    }

    /// GET /api/calendar - upcoming events for the briefing window.
    pub async fn upcoming_events(&self, bundle: Option<&str>) -> Reply {
        let (store, executor) = self.executor_for(self.session_from(bundle));
        let now = Utc::now();

        let outcome = CalendarApi::new(&executor)
            .list_events(
                "primary",
                now,
                now + ChronoDuration::hours(BRIEFING_WINDOW_HOURS),
                Some(LISTING_LIMIT),
            )
            .await
            .map(|events| serde_json::json!({ "events": events }).to_string());

        self.reply(outcome, &store)
    }

    /// GET /api/mail - recent inbox threads.
    pub async fn recent_threads(&self, bundle: Option<&str>) -> Reply {
        let (store, executor) = self.executor_for(self.session_from(bundle));

        let outcome = MailApi::new(&executor)
            .list_threads(LISTING_LIMIT, Some("in:inbox"))
            .await
            .map(|threads| serde_json::json!({ "threads": threads }).to_string());

        self.reply(outcome, &store)
    }

    /// GET /login - starts the authorization flow.
    pub fn begin_login(&self) -> LoginStart {
        LoginFlow::new(self.config.clone()).begin()
    }

    /// GET /oauth/callback - completes login and issues the bundle.
    pub async fn oauth_callback(&self, code: &str, state: &str, expected_state: &str) -> Reply {
        let flow = LoginFlow::new(self.config.clone());

        match flow
            .finish(self.issuer.as_ref(), code, state, expected_state)
            .await
        {
            Ok(credentials) => {
                let cookie = SetCookie::for_credentials(
                    &credentials,
                    &self.key,
                    self.config.default_bundle_ttl,
                );
                Reply::ok(
                    serde_json::json!({ "authorized": true }).to_string(),
                    Some(cookie),
                )
            }
            Err(LoginError::StateMismatch) => Reply::error(ErrorCode::BadRequest, "state mismatch"),
            Err(LoginError::Exchange(e)) => {
                Reply::error(ErrorCode::ReauthRequired, &e.to_string())
            }
        }
    }

    /// POST /api/logout - clears the session bundle.
    ///
    /// The only place credentials are discarded; no failure path in the
    /// core ever clears them implicitly.
    pub fn logout(&self) -> Reply {
        Reply {
            status: 200,
            body: serde_json::json!({ "logged_out": true }).to_string(),
            set_cookie: Some(SetCookie::clearing()),
        }
    }

    /// Opens the inbound bundle. Absent or invalid bundles mean an
    /// unauthenticated session rather than an error.
    fn session_from(&self, bundle: Option<&str>) -> SessionCredentials {
        match bundle {
            Some(value) => match bundle::open(value, &self.key) {
                Ok(credentials) => credentials,
                Err(e) => {
                    debug!(error = %e, "rejecting inbound session bundle");
                    SessionCredentials::new()
                }
            },
            None => SessionCredentials::new(),
        }
    }

    fn executor_for(&self, credentials: SessionCredentials) -> (Arc<RequestStore>, Executor) {
        let store = Arc::new(RequestStore::new(credentials));
        let resolver = SessionResolver::new(store.clone(), self.issuer.clone());
        let executor = Executor::new(resolver, self.transport.clone());
        (store, executor)
    }

    /// Maps a classified outcome to a transport reply, attaching the
    /// re-sealed bundle when the request rotated credentials.
    fn reply(&self, outcome: CallOutcome<String>, store: &RequestStore) -> Reply {
        let set_cookie = store.rotated().map(|credentials| {
            SetCookie::for_credentials(&credentials, &self.key, self.config.default_bundle_ttl)
        });

        match outcome {
            CallOutcome::Success(body) => Reply::ok(body, set_cookie),
            CallOutcome::AuthError { reason } => {
                // A refresh may have rotated credentials even when the
                // retried call was rejected.
                let mut reply = Reply::error(ErrorCode::ReauthRequired, &reason);
                reply.set_cookie = set_cookie;
                reply
            }
            CallOutcome::TransientError { reason } => {
                let mut reply = Reply::error(ErrorCode::ProviderUnavailable, &reason);
                reply.set_cookie = set_cookie;
                reply
            }
            CallOutcome::PermanentError { reason } => {
                let mut reply = Reply::error(ErrorCode::BadRequest, &reason);
                reply.set_cookie = set_cookie;
                reply
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use deskbrief_auth::{BoxFuture, ExchangeError, RefreshError, TokenExchange};
    use deskbrief_google::{ApiRequest, RawResponse, TransportError};

    use crate::config::OAuthCredentials;

    struct MockIssuer {
        refresh_calls: AtomicUsize,
    }

    impl TokenIssuer for MockIssuer {
        fn exchange_authorization_code<'a>(
            &'a self,
            _code: &'a str,
        ) -> BoxFuture<'a, Result<TokenExchange, ExchangeError>> {
            Box::pin(async {
                Ok(TokenExchange::new(
                    "at",
                    Some("rt1".to_string()),
                    Some(3600),
                ))
            })
        }

        fn refresh<'a>(
            &'a self,
            _refresh_token: &'a str,
        ) -> BoxFuture<'a, Result<TokenExchange, RefreshError>> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(TokenExchange::new("new", None, Some(3600))) })
        }
    }

    /// Returns 401 for tokens listed in `rejects`, an empty listing
    /// otherwise.
    struct MockTransport {
        calls: AtomicUsize,
        rejects: Vec<&'static str>,
    }

    impl Transport for MockTransport {
        fn send<'a>(
            &'a self,
            _request: &'a ApiRequest,
            access_token: &'a str,
        ) -> BoxFuture<'a, Result<RawResponse, TransportError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let response = if self.rejects.iter().any(|t| *t == access_token) {
                RawResponse {
                    status: 401,
                    body: String::new(),
                    retry_after: None,
                }
            } else {
                RawResponse {
                    status: 200,
                    body: r#"{"items":[]}"#.to_string(),
                    retry_after: None,
                }
            };
            Box::pin(async move { Ok(response) })
        }
    }

    struct Harness {
        context: AppContext,
        key: BundleKey,
        issuer: Arc<MockIssuer>,
        transport: Arc<MockTransport>,
    }

    fn harness(rejects: Vec<&'static str>) -> Harness {
        let credentials =
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret");
        let config = AppConfig::new(
            credentials,
            "https://app.example.com/oauth/callback".parse().unwrap(),
        );
        let key = BundleKey::generate();
        let issuer = Arc::new(MockIssuer {
            refresh_calls: AtomicUsize::new(0),
        });
        let transport = Arc::new(MockTransport {
            calls: AtomicUsize::new(0),
            rejects,
        });
        let context = AppContext::with_backends(
            config,
            key.clone(),
            issuer.clone(),
            transport.clone(),
        )
        .unwrap();

        Harness {
            context,
            key,
            issuer,
            transport,
        }
    }

    fn sealed(harness: &Harness, access: Option<&str>, refresh: Option<&str>) -> String {
        let credentials = SessionCredentials {
            access_token: access.map(String::from),
            refresh_token: refresh.map(String::from),
            expires_at: None,
        };
        bundle::seal(&credentials, &harness.key)
    }

    #[tokio::test]
    async fn valid_session_returns_events() {
        let h = harness(vec![]);
        let bundle_value = sealed(&h, Some("tok"), Some("rt1"));

        let reply = h.context.upcoming_events(Some(&bundle_value)).await;

        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("events"));
        assert!(reply.set_cookie.is_none());
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_bundle_yields_401_without_network() {
        let h = harness(vec![]);

        let reply = h.context.upcoming_events(None).await;

        assert_eq!(reply.status, 401);
        assert!(reply.body.contains("reauth_required"));
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.issuer.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tampered_bundle_reads_as_unauthenticated() {
        let h = harness(vec![]);
        let mut bundle_value = sealed(&h, Some("tok"), Some("rt1"));
        bundle_value.insert(1, 'x');

        let reply = h.context.upcoming_events(Some(&bundle_value)).await;

        assert_eq!(reply.status, 401);
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rotated_credentials_come_back_as_cookie() {
        let h = harness(vec!["expired"]);
        let bundle_value = sealed(&h, Some("expired"), Some("rt1"));

        let reply = h.context.upcoming_events(Some(&bundle_value)).await;

        assert_eq!(reply.status, 200);
        assert_eq!(h.transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.issuer.refresh_calls.load(Ordering::SeqCst), 1);

        let cookie = reply.set_cookie.expect("rotated bundle");
        let persisted = bundle::open(&cookie.value, &h.key).unwrap();
        assert_eq!(persisted.access_token.as_deref(), Some("new"));
        assert_eq!(persisted.refresh_token.as_deref(), Some("rt1"));
    }

    #[tokio::test]
    async fn mail_handler_uses_same_session_plumbing() {
        let h = harness(vec![]);
        let bundle_value = sealed(&h, Some("tok"), None);

        let reply = h.context.recent_threads(Some(&bundle_value)).await;

        assert_eq!(reply.status, 200);
        assert!(reply.body.contains("threads"));
    }

    #[tokio::test]
    async fn callback_state_mismatch_is_bad_request() {
        let h = harness(vec![]);
        let reply = h.context.oauth_callback("code", "a", "b").await;
        assert_eq!(reply.status, 400);
    }

    #[tokio::test]
    async fn callback_issues_session_cookie() {
        let h = harness(vec![]);
        let reply = h.context.oauth_callback("code", "s", "s").await;

        assert_eq!(reply.status, 200);
        let cookie = reply.set_cookie.expect("session cookie");
        let credentials = bundle::open(&cookie.value, &h.key).unwrap();
        assert_eq!(credentials.refresh_token.as_deref(), Some("rt1"));
    }

    #[test]
    fn logout_clears_the_bundle() {
        let h = harness(vec![]);
        let reply = h.context.logout();

        assert_eq!(reply.status, 200);
        let cookie = reply.set_cookie.expect("clearing cookie");
        assert!(cookie.value.is_empty());
        assert_eq!(cookie.max_age, 0);
    }

    #[test]
    fn begin_login_produces_consent_url() {
        let h = harness(vec![]);
        let start = h.context.begin_login();
        assert!(start.authorization_url.contains("response_type=code"));
        assert!(!start.state.is_empty());
    }

    #[test]
    fn error_codes_map_to_statuses() {
        assert_eq!(ErrorCode::ReauthRequired.http_status(), 401);
        assert_eq!(ErrorCode::ProviderUnavailable.http_status(), 503);
        assert_eq!(ErrorCode::BadRequest.http_status(), 400);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AppConfig::new(
            OAuthCredentials::new("not-a-google-id", "secret"),
            "https://app.example.com/cb".parse().unwrap(),
        );
        let result = AppContext::new(config, BundleKey::generate());
        assert!(result.is_err());
    }
}
