//! External calendar integrations.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ValidationError, ValidationResult};

/// Smallest allowed sync interval in minutes.
pub const MIN_SYNC_INTERVAL: u32 = 5;
/// Largest allowed sync interval in minutes.
pub const MAX_SYNC_INTERVAL: u32 = 1440;

/// The calendar provider behind an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKind {
    Google,
    Outlook,
    Ical,
    Internal,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "GOOGLE",
            Self::Outlook => "OUTLOOK",
            Self::Ical => "ICAL",
            Self::Internal => "INTERNAL",
        }
    }

    /// Description of the credential shape this provider needs.
    pub fn expected_credentials(&self) -> &'static str {
        match self {
            Self::Google | Self::Outlook => "OAuth client credentials with a refresh token",
            Self::Ical => "a feed URL",
            Self::Internal => "empty",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider credentials. The shape must match the provider kind.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Credentials {
    #[serde(rename = "oauth", rename_all = "camelCase")]
    OAuth {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        /// Directory tenant, used by Outlook only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tenant: Option<String>,
    },
    Feed { url: String },
    None,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuth {
                client_id, tenant, ..
            } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .field("refresh_token", &"<redacted>")
                .field("tenant", tenant)
                .finish(),
            Self::Feed { url } => f.debug_struct("Feed").field("url", url).finish(),
            Self::None => f.write_str("None"),
        }
    }
}

impl Credentials {
    /// Checks that the credential shape fits the provider.
    ///
    /// This is a structural check only; whether the provider accepts the
    /// credentials is the adapter's business.
    pub fn check_shape(&self, provider: ProviderKind) -> ValidationResult<()> {
        let mismatch = || ValidationError::CredentialShape {
            provider: provider.as_str(),
            expected: provider.expected_credentials(),
        };
        match (provider, self) {
            (
                ProviderKind::Google | ProviderKind::Outlook,
                Self::OAuth {
                    client_id,
                    client_secret,
                    refresh_token,
                    ..
                },
            ) => {
                if [client_id, client_secret, refresh_token]
                    .iter()
                    .any(|v| v.trim().is_empty())
                {
                    return Err(mismatch());
                }
                Ok(())
            }
            (ProviderKind::Ical, Self::Feed { url }) => {
                let parsed = Url::parse(url)
                    .map_err(|e| ValidationError::invalid("credentials.url", e.to_string()))?;
                match parsed.scheme() {
                    "http" | "https" | "webcal" => Ok(()),
                    other => Err(ValidationError::invalid(
                        "credentials.url",
                        format!("unsupported scheme '{other}'"),
                    )),
                }
            }
            (ProviderKind::Internal, Self::None) => Ok(()),
            _ => Err(mismatch()),
        }
    }
}

/// A link between a resource and an external calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarIntegration {
    pub id: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    pub provider: ProviderKind,
    pub credentials: Credentials,
    /// Provider calendar to poll. For the internal provider, the resource filter.
    #[serde(default)]
    pub calendar_id: String,
    pub sync_interval_minutes: u32,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl CalendarIntegration {
    /// Creates an active integration that has never synced.
    pub fn new(
        id: impl Into<String>,
        resource_id: Option<String>,
        provider: ProviderKind,
        credentials: Credentials,
        calendar_id: impl Into<String>,
        sync_interval_minutes: u32,
    ) -> ValidationResult<Self> {
        let integration = Self {
            id: id.into(),
            resource_id,
            provider,
            credentials,
            calendar_id: calendar_id.into(),
            sync_interval_minutes,
            last_sync: None,
            is_active: true,
        };
        integration.validate()?;
        Ok(integration)
    }

    /// Re-checks invariants.
    pub fn validate(&self) -> ValidationResult<()> {
        if !(MIN_SYNC_INTERVAL..=MAX_SYNC_INTERVAL).contains(&self.sync_interval_minutes) {
            return Err(ValidationError::InvalidSyncInterval(
                self.sync_interval_minutes,
            ));
        }
        self.credentials.check_shape(self.provider)
    }

    /// Builder method to set the last successful sync.
    pub fn with_last_sync(mut self, last_sync: DateTime<Utc>) -> Self {
        self.last_sync = Some(last_sync);
        self
    }

    /// Builder method to set the active flag.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.sync_interval_minutes))
    }

    /// Returns true if the integration should be polled at `now`.
    ///
    /// A `last_sync` later than `now` (clock skew) is not due.
    pub fn is_sync_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match self.last_sync {
            None => true,
            Some(last) if last > now => false,
            Some(last) => now >= last + self.sync_interval(),
        }
    }

    /// The calendar to poll, falling back to the resource id.
    pub fn target_calendar(&self) -> &str {
        if self.calendar_id.is_empty() {
            self.resource_id.as_deref().unwrap_or_default()
        } else {
            &self.calendar_id
        }
    }
}
