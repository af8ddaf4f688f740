//! iCal feed adapter configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct IcalConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl IcalConfig {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("slotwise/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for IcalConfig {
    fn default() -> Self {
        Self::new()
    }
}
