//! Orchestration of resolved tokens and provider calls.

use std::sync::Arc;

use tracing::{debug, warn};

use deskbrief_auth::{SessionError, SessionResolver};

use crate::outcome::CallOutcome;
use crate::transport::{ApiRequest, Transport};

/// Executes provider calls with transparent refresh-on-rejection.
pub struct Executor {
    resolver: SessionResolver,
    transport: Arc<dyn Transport>,
}

impl Executor {
    /// Creates an executor over a session's resolver and a transport.
    pub fn new(resolver: SessionResolver, transport: Arc<dyn Transport>) -> Self {
        Self {
            resolver,
            transport,
        }
    }

    /// Performs one provider call with the given token and classifies the
    /// result. No resolution, no retry.
    pub async fn call(&self, request: &ApiRequest, access_token: &str) -> CallOutcome<String> {
        match self.transport.send(request, access_token).await {
            Ok(response) => CallOutcome::classify(response),
            Err(e) => CallOutcome::TransientError {
                reason: e.to_string(),
            },
        }
    }

    /// Resolves a token, performs the call, and retries exactly once after
    /// a forced refresh when the provider rejected the token.
    ///
    /// A second rejection is returned as-is: one refresh bounds the
    /// worst-case latency per request and avoids refresh-loop
    /// amplification. An unrecoverable session short-circuits before any
    /// network call. Rotated credentials land in the session's credential
    /// store, where the boundary picks them up.
    pub async fn execute(&self, request: &ApiRequest) -> CallOutcome<String> {
        let resolved = match self.resolver.resolve().await {
            Ok(resolved) => resolved,
            Err(SessionError::AuthRequired) => {
                debug!(url = %request.url, "session not authenticated, skipping provider call");
                return CallOutcome::AuthError {
                    reason: "re-authentication required".to_string(),
                };
            }
            Err(SessionError::Refresh(e)) => {
                return CallOutcome::TransientError {
                    reason: e.to_string(),
                };
            }
        };

        let outcome = self.call(request, &resolved.token).await;
        if !outcome.is_auth_error() {
            return outcome;
        }

        warn!(url = %request.url, "provider rejected access token, forcing refresh");
        let retried = match self.resolver.force_refresh(&resolved.token).await {
            Ok(resolved) => resolved,
            Err(SessionError::AuthRequired) => {
                return CallOutcome::AuthError {
                    reason: "re-authentication required".to_string(),
                };
            }
            Err(SessionError::Refresh(e)) => {
                return CallOutcome::TransientError {
                    reason: e.to_string(),
                };
            }
        };

        self.call(request, &retried.token).await
    }
}
