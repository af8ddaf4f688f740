//! Subcommand implementations.

pub mod availability;
pub mod sync;
pub mod view;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use slotwise_core::time::start_of_day;
use slotwise_engine::{Engine, EngineConfig, Fixture, MemoryStore, TracingPublisher};
use tracing::debug;

use crate::error::CliResult;

/// Default config location, `<config dir>/slotwise/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slotwise")
        .join("config.toml")
}

/// Loads the explicit config, else the default file if present, else defaults.
pub fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    if let Some(path) = path {
        return Ok(EngineConfig::load_from(path)?);
    }
    let default = default_config_path();
    if default.exists() {
        debug!(path = %default.display(), "Using default config");
        Ok(EngineConfig::load_from(&default)?)
    } else {
        Ok(EngineConfig::default())
    }
}

/// Builds an engine over a fresh store, seeded from `fixture` when given.
pub fn build_engine(config: &EngineConfig, fixture: Option<&Path>) -> CliResult<Engine> {
    let store = match fixture {
        Some(path) => MemoryStore::from_fixture(Fixture::load_from(path)?),
        None => MemoryStore::new(),
    };
    Ok(Engine::new(config, Arc::new(store), Arc::new(TracingPublisher))?)
}

/// `2025-03-03 09:00-10:00`, or with both dates when the span crosses midnight.
pub(crate) fn format_span(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let next_midnight = start_of_day(start.date_naive()) + Duration::days(1);
    if start.date_naive() == end.date_naive() || end == next_midnight {
        format!(
            "{} {}-{}",
            start.format("%Y-%m-%d"),
            start.format("%H:%M"),
            end.format("%H:%M")
        )
    } else {
        format!(
            "{} - {}",
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use chrono::TimeZone;
    use slotwise_engine::EngineError;

    use crate::error::CliError;

    #[test]
    fn explicit_config_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[availability]\nslot_minutes = 30\n").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.availability.slot_minutes, 30);
    }

    #[test]
    fn missing_explicit_config_fails() {
        let err = load_config(Some(Path::new("/nonexistent/slotwise.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Engine(EngineError::Config { .. })));
    }

    #[test]
    fn malformed_fixture_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let result = build_engine(&EngineConfig::default(), Some(file.path()));
        assert!(result.is_err());
    }

    #[test]
    fn span_formatting() {
        let at = |d, h| Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap();
        assert_eq!(format_span(at(3, 9), at(3, 10)), "2025-03-03 09:00-10:00");
        assert_eq!(format_span(at(3, 23), at(4, 0)), "2025-03-03 23:00-00:00");
        assert_eq!(format_span(at(3, 9), at(4, 10)), "2025-03-03 09:00 - 2025-03-04 10:00");
    }
}
