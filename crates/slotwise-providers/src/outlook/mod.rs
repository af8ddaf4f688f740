//! Microsoft Outlook (Graph) adapter.
//!
//! Reads `calendarView` with UTC times (`Prefer: outlook.timezone="UTC"`),
//! following `@odata.nextLink`. `showAs` and `isCancelled` drive the status.

mod client;
mod config;
mod provider;

pub use client::OutlookCalendarClient;
pub use config::OutlookConfig;
pub use provider::OutlookProvider;
