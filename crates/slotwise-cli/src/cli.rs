//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use slotwise_core::{TimeWindow, time::start_of_day};
use slotwise_engine::ExternalMode;

use crate::error::{CliError, CliResult};

/// Availability resolution and calendar sync for shared resources.
#[derive(Debug, Parser)]
#[command(name = "slotwise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML).
    #[arg(long, short, env = "SLOTWISE_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON fixture seeding the in-memory store.
    #[arg(long, short, env = "SLOTWISE_FIXTURE")]
    pub fixture: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pull external calendars into the event store.
    Sync {
        /// Keep polling until interrupted.
        #[arg(long)]
        watch: bool,
    },
    /// Show available and conflicting slots for a resource.
    Availability {
        #[command(flatten)]
        range: RangeArgs,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show the merged calendar of a resource.
    View {
        #[command(flatten)]
        range: RangeArgs,

        /// Include free business-hour slots.
        #[arg(long)]
        free: bool,

        /// Mark the viewer's own reservations as editable.
        #[arg(long)]
        viewer: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct RangeArgs {
    #[arg(long, short)]
    pub resource: String,

    /// Range start, RFC 3339 or YYYY-MM-DD.
    #[arg(long)]
    pub from: String,

    /// Range end, RFC 3339 or YYYY-MM-DD (a bare date includes the whole day).
    #[arg(long)]
    pub to: String,

    /// How synced external events are treated: exclude, optional or required.
    #[arg(long, default_value = "exclude")]
    pub external: ExternalMode,
}

impl RangeArgs {
    pub fn window(&self) -> CliResult<TimeWindow> {
        let start = parse_instant(&self.from, false)?;
        let end = parse_instant(&self.to, true)?;
        Ok(TimeWindow::new(start, end)?)
    }
}

/// Parses RFC 3339, or a date at midnight UTC. With `end_of_day`, a bare
/// date means the following midnight.
pub fn parse_instant(value: &str, end_of_day: bool) -> CliResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        CliError::InvalidArgument(format!("'{value}' is neither RFC 3339 nor YYYY-MM-DD"))
    })?;
    let date = if end_of_day {
        date.succ_opt()
            .ok_or_else(|| CliError::InvalidArgument(format!("'{value}' is out of range")))?
    } else {
        date
    };
    Ok(start_of_day(date))
}
