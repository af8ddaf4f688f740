//! Google Calendar adapter.
//!
//! Uses the Calendar API v3 with a per-integration OAuth refresh token.
//! Recurring events are expanded server-side (`singleEvents=true`) and
//! deleted instances are requested (`showDeleted=true`) so cancellations
//! propagate on the next sync.

mod client;
mod config;
mod provider;

pub use client::GoogleCalendarClient;
pub use config::GoogleConfig;
pub use provider::GoogleProvider;
