//! iCalendar feed adapter.
//!
//! Read-only: subscribes to a published `.ics` URL (http, https or webcal)
//! and keeps the VEVENTs that fall inside the look-ahead window. RRULEs are
//! not expanded; each VEVENT is one occurrence.

mod config;
mod ics;
mod provider;

pub use config::IcalConfig;
pub use ics::parse_ics_content;
pub use provider::IcalProvider;
