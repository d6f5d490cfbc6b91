//! Token lifecycle for deskbrief sessions.
//!
//! This crate owns everything between "the user authorized us once" and
//! "a provider call can carry a valid access token":
//!
//! - [`SessionCredentials`] and the [`CredentialStore`] abstraction over
//!   wherever a deployment persists them
//! - [`TokenIssuer`] - the OAuth2 token endpoint exchanges (authorization
//!   code and refresh token), stateless request/response
//! - [`SessionResolver`] - per-request resolution with transparent refresh
//!   and single-flight coalescing of concurrent refreshes
//!
//! The resolver is deliberately stateless across requests: the credential
//! store is the source of truth, read fresh every time. Provider calls and
//! their retry policy live in the companion request-execution crate.

pub mod credentials;
pub mod error;
pub mod issuer;
pub mod resolver;

pub use credentials::{CredentialStore, RequestStore, SessionCredentials};
pub use error::{ExchangeError, RefreshError, RefreshErrorKind, SessionError};
pub use issuer::{BoxFuture, HttpTokenIssuer, IssuerConfig, TokenExchange, TokenIssuer};
pub use resolver::{ResolvedToken, SessionResolver, TokenSource};
