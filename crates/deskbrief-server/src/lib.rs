//! Transport boundary for deskbrief.
//!
//! The deployment's web layer embeds this crate: it opens the inbound
//! session bundle, drives the token and request-execution core, maps
//! classified outcomes to transport statuses, and persists rotated
//! credentials as a re-sealed bundle (or a server-side session record).
//!
//! Route handlers here are deliberately thin; all state-machine and
//! failure-handling logic lives in `deskbrief-auth` and
//! `deskbrief-google`.

pub mod bundle;
pub mod config;
pub mod error;
pub mod handler;
pub mod login;
pub mod sessions;
pub mod tracing;

pub use bundle::{BundleError, BundleKey, SESSION_COOKIE, SetCookie};
pub use config::{AppConfig, OAuthCredentials};
pub use error::{ServerError, ServerResult};
pub use handler::{AppContext, ErrorCode, Reply};
pub use login::{LoginError, LoginFlow, LoginStart};
pub use sessions::{SessionDir, SessionRecord};
pub use tracing::{LogConfig, LogError, LogFormat, init_logging};
