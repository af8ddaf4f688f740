//! Poll loop driving sync cycles.
//!
//! The scheduler ticks on a fixed interval plus jitter and accepts
//! `SyncNow`, `Pause`, `Resume` and `Stop` through a [`PollHandle`]. A failed
//! tick is recorded and the loop carries on; the next tick is the retry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::error::EngineResult;
use crate::sync::SyncReport;

/// Poll interval settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Spread applied to each delay, as a fraction of `interval` (0.0-1.0).
    pub jitter_fraction: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            jitter_fraction: 0.1,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Delay until the next tick, within `interval ± interval * jitter_fraction`.
    pub fn next_delay(&self) -> Duration {
        let base = self.interval.as_secs_f64();
        let spread = jitter(base * self.jitter_fraction);
        Duration::from_secs_f64((base + spread).max(0.0))
    }
}

/// A value in `[-range, range]` derived from the clock's sub-second part.
fn jitter(range: f64) -> f64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    let unit = f64::from(nanos) / 1_000_000_000.0;
    (unit * 2.0 - 1.0) * range
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCommand {
    SyncNow,
    Pause,
    Resume,
    Stop,
}

/// What the loop has done so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    pub paused: bool,
    pub ticks: u64,
    pub last_tick: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Integrations attempted and failed on the last successful tick.
    pub last_attempted: usize,
    pub last_failed: usize,
}

impl PollState {
    fn record(&mut self, at: DateTime<Utc>, result: &EngineResult<SyncReport>) {
        self.ticks += 1;
        self.last_tick = Some(at);
        match result {
            Ok(report) => {
                self.last_error = None;
                self.last_attempted = report.outcomes.len();
                self.last_failed = report.failed().count();
            }
            Err(e) => self.last_error = Some(e.to_string()),
        }
    }
}

pub type SharedPollState = Arc<RwLock<PollState>>;

pub struct PollScheduler {
    config: PollConfig,
    state: SharedPollState,
    command_tx: mpsc::Sender<PollCommand>,
    command_rx: mpsc::Receiver<PollCommand>,
}

impl PollScheduler {
    pub fn new(config: PollConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            state: Arc::new(RwLock::new(PollState::default())),
            command_tx,
            command_rx,
        }
    }

    pub fn handle(&self) -> PollHandle {
        PollHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Runs until `Stop` or until every handle is dropped.
    ///
    /// `tick_fn` receives the tick time; the first tick happens immediately.
    pub async fn run<F, Fut>(self, tick_fn: F)
    where
        F: Fn(DateTime<Utc>) -> Fut + Send + Sync,
        Fut: Future<Output = EngineResult<SyncReport>> + Send,
    {
        let Self {
            config,
            state,
            command_tx,
            mut command_rx,
        } = self;
        // Only handles keep the channel open.
        drop(command_tx);

        info!(interval_secs = config.interval.as_secs(), "Poll scheduler started");
        tick(&state, &tick_fn).await;

        loop {
            let delay = config.next_delay();
            debug!(delay_ms = delay.as_millis() as u64, "Next poll scheduled");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if state.read().await.paused {
                        debug!("Poll scheduler paused, skipping tick");
                        continue;
                    }
                    tick(&state, &tick_fn).await;
                }
                command = command_rx.recv() => match command {
                    Some(PollCommand::SyncNow) => {
                        debug!("Immediate sync requested");
                        tick(&state, &tick_fn).await;
                    }
                    Some(PollCommand::Pause) => {
                        info!("Poll scheduler paused");
                        state.write().await.paused = true;
                    }
                    Some(PollCommand::Resume) => {
                        info!("Poll scheduler resumed");
                        state.write().await.paused = false;
                    }
                    Some(PollCommand::Stop) | None => {
                        info!("Poll scheduler stopping");
                        break;
                    }
                }
            }
        }
    }
}

async fn tick<F, Fut>(state: &SharedPollState, tick_fn: &F)
where
    F: Fn(DateTime<Utc>) -> Fut,
    Fut: Future<Output = EngineResult<SyncReport>>,
{
    let now = Utc::now();
    let result = tick_fn(now).await;
    match &result {
        Ok(report) => debug!(
            attempted = report.outcomes.len(),
            failed = report.failed().count(),
            skipped = report.skipped.len(),
            "Poll tick finished"
        ),
        Err(e) => warn!(error = %e, "Poll tick failed"),
    }
    state.write().await.record(now, &result);
}

/// Controls a running [`PollScheduler`].
#[derive(Debug, Clone)]
pub struct PollHandle {
    command_tx: mpsc::Sender<PollCommand>,
    state: SharedPollState,
}

impl PollHandle {
    async fn send(&self, command: PollCommand) -> Result<(), mpsc::error::SendError<PollCommand>> {
        self.command_tx.send(command).await
    }

    pub async fn sync_now(&self) -> Result<(), mpsc::error::SendError<PollCommand>> {
        self.send(PollCommand::SyncNow).await
    }

    pub async fn pause(&self) -> Result<(), mpsc::error::SendError<PollCommand>> {
        self.send(PollCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), mpsc::error::SendError<PollCommand>> {
        self.send(PollCommand::Resume).await
    }

    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<PollCommand>> {
        self.send(PollCommand::Stop).await
    }

    pub async fn state(&self) -> PollState {
        self.state.read().await.clone()
    }
}
