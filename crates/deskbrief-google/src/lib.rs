//! Provider request execution for deskbrief.
//!
//! Every raw provider response is classified exactly once at the boundary
//! into a closed [`CallOutcome`]; downstream logic never re-inspects
//! status codes or response shapes. The [`Executor`] composes the session
//! resolver with the transport: resolve a token, perform the call, and on
//! a credential rejection force exactly one refresh and one retry.
//!
//! [`CalendarApi`] and [`MailApi`] are the thin typed surfaces the
//! briefing UI reads through.

pub mod calendar;
pub mod executor;
pub mod mail;
pub mod outcome;
pub mod transport;

pub use calendar::{CalendarApi, EventSummary, EventTime};
pub use executor::Executor;
pub use mail::{MailApi, MailProfile, ThreadSummary};
pub use outcome::CallOutcome;
pub use transport::{ApiRequest, HttpTransport, RawResponse, Transport, TransportError};
