//! Google Calendar adapter configuration.

use std::time::Duration;

/// Endpoints and transport settings for the Google adapter.
///
/// Client credentials are per integration and are not part of this config.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Calendar API v3 base URL.
    pub api_base: String,
    /// OAuth token endpoint.
    pub token_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    /// Scope requested when refreshing.
    pub scope: Option<String>,
}

impl GoogleConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://www.googleapis.com/calendar/v3";
    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn new() -> Self {
        Self {
            api_base: Self::DEFAULT_API_BASE.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("slotwise/{}", env!("CARGO_PKG_VERSION")),
            scope: None,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_trims_trailing_slash() {
        let config = GoogleConfig::new()
            .with_api_base("http://127.0.0.1:8080/")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.api_base, "http://127.0.0.1:8080");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.token_url, GoogleConfig::DEFAULT_TOKEN_URL);
        assert!(config.user_agent.starts_with("slotwise/"));
    }
}
