//! Calendar API surface.
//!
//! Thin typed client over [`Executor::execute`] for the Calendar v3
//! events listing the briefing view reads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::executor::Executor;
use crate::outcome::CallOutcome;
use crate::transport::ApiRequest;

/// Base URL for the Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// When an event starts or ends: a point in time, or a whole day for
/// all-day events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    /// A timed event boundary.
    DateTime(DateTime<Utc>),
    /// An all-day event boundary.
    Date(NaiveDate),
}

/// One upcoming calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    /// Provider event identifier.
    pub id: String,
    /// Event title; empty when the event has none.
    pub title: String,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// Link to the event in the provider's UI.
    pub html_link: Option<String>,
}

/// Calendar operations for one session.
pub struct CalendarApi<'a> {
    executor: &'a Executor,
}

impl<'a> CalendarApi<'a> {
    /// Creates a calendar client over the session's executor.
    pub fn new(executor: &'a Executor) -> Self {
        Self { executor }
    }

    /// Lists events in the window, recurring events expanded and ordered
    /// by start time.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: Option<usize>,
    ) -> CallOutcome<Vec<EventSummary>> {
        let mut request = ApiRequest::get(format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        ))
        .with_param("timeMin", time_min.to_rfc3339())
        .with_param("timeMax", time_max.to_rfc3339())
        .with_param("singleEvents", "true")
        .with_param("orderBy", "startTime");

        if let Some(max) = max_results {
            request = request.with_param("maxResults", max.to_string());
        }

        self.executor
            .execute(&request)
            .await
            .decode::<EventListResponse>()
            .map(|list| list.items.into_iter().filter_map(convert_event).collect())
    }
}

/// Converts an API event, skipping cancelled entries and entries with
/// unusable identifiers or times.
fn convert_event(event: ApiEvent) -> Option<EventSummary> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }

    let id = event.id?;
    let start = parse_event_time(&event.start)?;
    let end = parse_event_time(&event.end)?;

    Some(EventSummary {
        id,
        title: event.summary.unwrap_or_default(),
        start,
        end,
        html_link: event.html_link,
    })
}

fn parse_event_time(time: &ApiEventTime) -> Option<EventTime> {
    if let Some(ref date_time) = time.date_time {
        let parsed = DateTime::parse_from_rfc3339(date_time).ok()?;
        return Some(EventTime::DateTime(parsed.with_timezone(&Utc)));
    }
    if let Some(ref date) = time.date {
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        return Some(EventTime::Date(parsed));
    }
    None
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
}

/// A single event from the Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    start: ApiEventTime,
    end: ApiEventTime,
    html_link: Option<String>,
    status: Option<String>,
}

/// Event time from the API: dateTime for timed events, date for all-day.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timed_event() {
        let json = r#"{
            "id": "evt1",
            "summary": "Design review",
            "start": { "dateTime": "2024-03-15T10:00:00Z" },
            "end": { "dateTime": "2024-03-15T11:00:00Z" },
            "htmlLink": "https://calendar.google.com/event?eid=abc",
            "status": "confirmed"
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let summary = convert_event(event).unwrap();

        assert_eq!(summary.id, "evt1");
        assert_eq!(summary.title, "Design review");
        assert!(matches!(summary.start, EventTime::DateTime(_)));
        assert_eq!(
            summary.html_link.as_deref(),
            Some("https://calendar.google.com/event?eid=abc")
        );
    }

    #[test]
    fn parse_all_day_event() {
        let json = r#"{
            "id": "evt2",
            "summary": "Offsite",
            "start": { "date": "2024-03-15" },
            "end": { "date": "2024-03-16" }
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let summary = convert_event(event).unwrap();

        assert_eq!(
            summary.start,
            EventTime::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
    }

    #[test]
    fn cancelled_events_are_skipped() {
        let json = r#"{
            "id": "evt3",
            "summary": "Cancelled sync",
            "start": { "dateTime": "2024-03-15T10:00:00Z" },
            "end": { "dateTime": "2024-03-15T11:00:00Z" },
            "status": "cancelled"
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(convert_event(event).is_none());
    }

    #[test]
    fn events_without_times_are_skipped() {
        let json = r#"{
            "id": "evt4",
            "summary": "Broken",
            "start": {},
            "end": {}
        }"#;

        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(convert_event(event).is_none());
    }

    #[test]
    fn list_response_defaults_to_empty() {
        let list: EventListResponse = serde_json::from_str("{}").unwrap();
        assert!(list.items.is_empty());
    }

    #[test]
    fn event_summary_serializes_for_the_ui() {
        let summary = EventSummary {
            id: "evt1".to_string(),
            title: "Standup".to_string(),
            start: EventTime::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
            end: EventTime::Date(NaiveDate::from_ymd_opt(2024, 3, 16).unwrap()),
            html_link: None,
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"id\":\"evt1\""));
        assert!(json.contains("\"date\":\"2024-03-15\""));
    }
}
