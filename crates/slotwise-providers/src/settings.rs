//! Adapter settings, loaded as the `[providers]` section of the engine config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::google::GoogleConfig;
use crate::ical::IcalConfig;
use crate::outlook::OutlookConfig;

/// Endpoints and transport settings for the built-in adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub http_timeout_secs: u64,
    pub google_api_base: String,
    pub google_token_url: String,
    pub outlook_api_base: String,
    /// May contain `{tenant}`.
    pub outlook_token_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            google_api_base: GoogleConfig::DEFAULT_API_BASE.to_string(),
            google_token_url: GoogleConfig::DEFAULT_TOKEN_URL.to_string(),
            outlook_api_base: OutlookConfig::DEFAULT_API_BASE.to_string(),
            outlook_token_url: OutlookConfig::DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn google(&self) -> GoogleConfig {
        GoogleConfig::new()
            .with_api_base(&self.google_api_base)
            .with_token_url(&self.google_token_url)
            .with_timeout(self.timeout())
    }

    pub fn outlook(&self) -> OutlookConfig {
        OutlookConfig::new()
            .with_api_base(&self.outlook_api_base)
            .with_token_url(&self.outlook_token_url)
            .with_timeout(self.timeout())
    }

    pub fn ical(&self) -> IcalConfig {
        IcalConfig::new().with_timeout(self.timeout())
    }
}
