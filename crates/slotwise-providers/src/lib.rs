//! Calendar provider adapters.
//!
//! - [`CalendarProvider`] - the contract every backend implements
//! - [`RawEvent`] - provider events before normalization
//! - [`normalize_event`] - mapping into the canonical [`CalendarEvent`]
//! - [`ProviderRegistry`] - adapter lookup by [`ProviderKind`]
//!
//! ```text
//!  Google API   Graph API   .ics feed   bookings
//!      │            │           │           │
//!  GoogleProvider OutlookProvider IcalProvider InternalProvider
//!      └────────────┴─────┬─────┴───────────┘
//!                         ▼
//!                     RawEvent ──normalize_event()──▶ CalendarEvent
//! ```
//!
//! [`CalendarEvent`]: slotwise_core::CalendarEvent
//! [`ProviderKind`]: slotwise_core::ProviderKind

pub mod error;
pub mod google;
mod http;
pub mod ical;
pub mod internal;
pub mod normalize;
pub mod oauth;
pub mod outlook;
pub mod provider;
pub mod raw_event;
pub mod registry;
pub mod settings;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use google::GoogleProvider;
pub use ical::IcalProvider;
pub use internal::{
    InternalProvider, InternalSource, MAINTENANCE_ID_PREFIX, RESERVATION_ID_PREFIX,
};
pub use normalize::{event_bounds, is_all_day, map_status, normalize_event, normalize_events};
pub use outlook::OutlookProvider;
pub use provider::{BoxFuture, CalendarProvider, EventDraft, LOOKAHEAD_DAYS, lookahead_window};
pub use raw_event::{RawEvent, RawEventTime};
pub use registry::ProviderRegistry;
pub use settings::ProviderSettings;
