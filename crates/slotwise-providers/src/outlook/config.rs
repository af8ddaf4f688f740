//! Outlook adapter configuration.

use std::time::Duration;

/// Endpoints and transport settings for the Outlook adapter.
#[derive(Debug, Clone)]
pub struct OutlookConfig {
    /// Microsoft Graph base URL.
    pub api_base: String,
    /// Token endpoint; `{tenant}` is replaced by the integration's tenant.
    pub token_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub scope: String,
}

impl OutlookConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://graph.microsoft.com/v1.0";
    pub const DEFAULT_TOKEN_URL: &'static str =
        "https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token";
    pub const DEFAULT_TENANT: &'static str = "common";
    pub const DEFAULT_SCOPE: &'static str =
        "https://graph.microsoft.com/Calendars.ReadWrite offline_access";

    pub fn new() -> Self {
        Self {
            api_base: Self::DEFAULT_API_BASE.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("slotwise/{}", env!("CARGO_PKG_VERSION")),
            scope: Self::DEFAULT_SCOPE.to_string(),
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

    /// Token endpoint for a tenant, `common` when none is set.
    pub fn token_url_for(&self, tenant: Option<&str>) -> String {
        let tenant = tenant
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(Self::DEFAULT_TENANT);
        self.token_url.replace("{tenant}", tenant)
    }
}

impl Default for OutlookConfig {
    fn default() -> Self {
        Self::new()
    }
}
