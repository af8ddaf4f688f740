//! Engine configuration.
//!
//! Read from a single TOML file; every section and key is optional.
//!
//! ```toml
//! [availability]
//! slot_minutes = 30
//! max_range_days = 31
//!
//! [calendar]
//! business_start = "08:00"
//! business_end = "18:00"
//!
//! [sync]
//! poll_interval_secs = 300
//! max_concurrency = 4
//!
//! [providers]
//! http_timeout_secs = 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use slotwise_core::TimeOfDay;
use slotwise_providers::ProviderSettings;

use crate::availability::AvailabilityResolver;
use crate::composer::{DEFAULT_BUSINESS_END, DEFAULT_BUSINESS_START};
use crate::error::{EngineError, EngineResult};
use crate::scheduler::PollConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub availability: AvailabilitySettings,
    pub calendar: CalendarSettings,
    pub sync: SyncSettings,
    pub providers: ProviderSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilitySettings {
    /// Length of an atomic slot.
    pub slot_minutes: u32,
    /// Longest range a single availability or view query may cover.
    pub max_range_days: u32,
}

impl Default for AvailabilitySettings {
    fn default() -> Self {
        Self {
            slot_minutes: AvailabilityResolver::DEFAULT_SLOT_MINUTES,
            max_range_days: AvailabilityResolver::DEFAULT_MAX_RANGE_DAYS,
        }
    }
}

/// Business hours used for free-slot synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub business_start: TimeOfDay,
    pub business_end: TimeOfDay,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            business_start: DEFAULT_BUSINESS_START,
            business_end: DEFAULT_BUSINESS_END,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub poll_interval_secs: u64,
    /// Fraction of the interval used as random spread (0.0-1.0).
    pub jitter_fraction: f64,
    /// Integrations synced in parallel; 1 is sequential.
    pub max_concurrency: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            jitter_fraction: 0.1,
            max_concurrency: 1,
        }
    }
}

impl SyncSettings {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(Duration::from_secs(self.poll_interval_secs))
            .with_jitter(self.jitter_fraction)
    }
}

impl EngineConfig {
    /// Loads and validates a config file.
    pub fn load_from(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!("failed to read config {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            EngineError::config(format!("failed to parse config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.availability.slot_minutes == 0 {
            return Err(EngineError::config("availability.slot_minutes must be positive"));
        }
        if self.availability.max_range_days == 0 {
            return Err(EngineError::config("availability.max_range_days must be positive"));
        }
        if self.calendar.business_start >= self.calendar.business_end {
            return Err(EngineError::config(format!(
                "calendar business hours {}-{} are inverted",
                self.calendar.business_start, self.calendar.business_end
            )));
        }
        if self.sync.max_concurrency == 0 {
            return Err(EngineError::config("sync.max_concurrency must be at least 1"));
        }
        if self.sync.poll_interval_secs == 0 {
            return Err(EngineError::config("sync.poll_interval_secs must be positive"));
        }
        if !(0.0..=1.0).contains(&self.sync.jitter_fraction) {
            return Err(EngineError::config("sync.jitter_fraction must be within 0.0-1.0"));
        }
        if self.providers.http_timeout_secs == 0 {
            return Err(EngineError::config("providers.http_timeout_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.availability.slot_minutes, 60);
        assert_eq!(config.availability.max_range_days, 31);
        assert_eq!(config.calendar.business_start.to_string(), "08:00");
        assert_eq!(config.calendar.business_end.to_string(), "18:00");
        assert_eq!(config.sync.max_concurrency, 1);
        assert_eq!(config.providers.http_timeout_secs, 30);
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
[availability]
slot_minutes = 30

[calendar]
business_start = "07:30"

[sync]
max_concurrency = 4

[providers]
google_api_base = "http://localhost:9000"
"#,
        );
        let config = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(config.availability.slot_minutes, 30);
        assert_eq!(config.calendar.business_start.to_string(), "07:30");
        assert_eq!(config.calendar.business_end.to_string(), "18:00");
        assert_eq!(config.sync.max_concurrency, 4);
        assert_eq!(config.sync.poll_interval_secs, 300);
        assert_eq!(config.providers.google_api_base, "http://localhost:9000");
        assert_eq!(config.sync.poll_config().interval, Duration::from_secs(300));
    }

    #[test]
    fn rejects_inverted_hours() {
        let file = write_config(
            r#"
[calendar]
business_start = "18:00"
business_end = "08:00"
"#,
        );
        let err = EngineConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("inverted"));
    }

    #[test]
    fn rejects_malformed_time() {
        let file = write_config("[calendar]\nbusiness_start = \"8am\"\n");
        let err = EngineConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn rejects_zero_sizes() {
        let mut config = EngineConfig::default();
        config.availability.slot_minutes = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.sync.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.availability.max_range_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = EngineConfig::load_from(Path::new("/nonexistent/slotwise.toml")).unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
    }
}
