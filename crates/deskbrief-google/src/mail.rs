//! Mail API surface.
//!
//! Thin typed client over [`Executor::execute`] for the Gmail reads the
//! briefing view needs: recent threads and the mailbox profile.

use serde::{Deserialize, Serialize};

use crate::executor::Executor;
use crate::outcome::CallOutcome;
use crate::transport::ApiRequest;

/// Base URL for the Gmail API v1.
const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// One mail thread, newest first as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    /// Provider thread identifier.
    pub id: String,
    /// Short plain-text excerpt of the latest message.
    pub snippet: String,
}

/// The authorized mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailProfile {
    /// The account's email address.
    pub email_address: String,
    /// Total message count reported by the provider.
    pub messages_total: u64,
}

/// Mail operations for one session.
pub struct MailApi<'a> {
    executor: &'a Executor,
}

impl<'a> MailApi<'a> {
    /// Creates a mail client over the session's executor.
    pub fn new(executor: &'a Executor) -> Self {
        Self { executor }
    }

    /// Lists recent threads, optionally narrowed by a Gmail search query
    /// (e.g. `in:inbox is:unread`).
    pub async fn list_threads(
        &self,
        max_results: usize,
        query: Option<&str>,
    ) -> CallOutcome<Vec<ThreadSummary>> {
        let mut request = ApiRequest::get(format!("{}/users/me/threads", GMAIL_API_BASE))
            .with_param("maxResults", max_results.to_string());

        if let Some(q) = query {
            request = request.with_param("q", q);
        }

        self.executor
            .execute(&request)
            .await
            .decode::<ThreadListResponse>()
            .map(|list| {
                list.threads
                    .into_iter()
                    .filter_map(|thread| {
                        let id = thread.id?;
                        Some(ThreadSummary {
                            id,
                            snippet: thread.snippet.unwrap_or_default(),
                        })
                    })
                    .collect()
            })
    }

    /// Fetches the authorized mailbox profile.
    pub async fn profile(&self) -> CallOutcome<MailProfile> {
        let request = ApiRequest::get(format!("{}/users/me/profile", GMAIL_API_BASE));

        self.executor
            .execute(&request)
            .await
            .decode::<ProfileResponse>()
            .map(|profile| MailProfile {
                email_address: profile.email_address,
                messages_total: profile.messages_total,
            })
    }
}

/// Response from the threads.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    #[serde(default)]
    threads: Vec<ApiThread>,
}

/// A single thread from the Gmail API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiThread {
    id: Option<String>,
    snippet: Option<String>,
}

/// Response from the profile endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    email_address: String,
    #[serde(default)]
    messages_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_thread_list() {
        let json = r#"{
            "threads": [
                { "id": "t1", "snippet": "Re: quarterly numbers", "historyId": "123" },
                { "id": "t2", "snippet": "" }
            ],
            "resultSizeEstimate": 2
        }"#;

        let list: ThreadListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(list.threads.len(), 2);
        assert_eq!(list.threads[0].id.as_deref(), Some("t1"));
        assert_eq!(
            list.threads[0].snippet.as_deref(),
            Some("Re: quarterly numbers")
        );
    }

    #[test]
    fn parse_empty_thread_list() {
        let list: ThreadListResponse = serde_json::from_str("{}").unwrap();
        assert!(list.threads.is_empty());
    }

    #[test]
    fn parse_profile() {
        let json = r#"{
            "emailAddress": "user@example.com",
            "messagesTotal": 4821,
            "threadsTotal": 932,
            "historyId": "99"
        }"#;

        let profile: ProfileResponse = serde_json::from_str(json).unwrap();
        assert_eq!(profile.email_address, "user@example.com");
        assert_eq!(profile.messages_total, 4821);
    }
}
