//! `slotwise sync`.

use std::fmt::Write as _;

use chrono::Utc;
use slotwise_engine::{Engine, PollConfig, PollScheduler, SyncReport};
use tracing::info;

use crate::error::CliResult;

/// Runs one sync cycle and prints its summary.
pub async fn once(engine: &Engine) -> CliResult<()> {
    let report = engine.sync.tick(Utc::now()).await?;
    print!("{}", summarize(&report));
    Ok(())
}

/// Polls on `config` until Ctrl-C.
pub async fn watch(engine: &Engine, config: PollConfig) -> CliResult<()> {
    let scheduler = PollScheduler::new(config);
    let handle = scheduler.handle();
    let sync = engine.sync.clone();
    let run = scheduler.run(move |now| {
        let sync = sync.clone();
        async move { sync.tick(now).await }
    });
    tokio::pin!(run);

    let interrupted = tokio::select! {
        _ = &mut run => false,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            true
        }
    };
    if interrupted {
        info!("Interrupted, stopping");
        // A failed send means the scheduler already exited.
        let _ = handle.stop().await;
        run.await;
    }

    let state = handle.state().await;
    println!("{} sync cycle(s) run", state.ticks);
    if let Some(error) = state.last_error {
        println!("last error: {error}");
    }
    Ok(())
}

pub fn summarize(report: &SyncReport) -> String {
    let mut out = format!(
        "{} synced, {} failed, {} not due; {} event(s) upserted\n",
        report.succeeded().count(),
        report.failed().count(),
        report.skipped.len(),
        report.upserted()
    );
    for outcome in report.failed() {
        if let Err(error) = &outcome.result {
            let _ = writeln!(
                out,
                "  {} ({}): {}",
                outcome.integration_id, outcome.provider, error
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwise_core::ProviderKind;
    use slotwise_engine::{IntegrationOutcome, SyncCounts};

    #[test]
    fn summary_lists_failures() {
        let report = SyncReport {
            skipped: vec!["quiet".into()],
            outcomes: vec![
                IntegrationOutcome {
                    integration_id: "dept".into(),
                    provider: ProviderKind::Ical,
                    result: Ok(SyncCounts {
                        upserted: 3,
                        removed: 1,
                    }),
                },
                IntegrationOutcome {
                    integration_id: "gone".into(),
                    provider: ProviderKind::Ical,
                    result: Err("feed not found".into()),
                },
            ],
        };
        assert_eq!(
            summarize(&report),
            format!(
                "1 synced, 1 failed, 1 not due; 3 event(s) upserted\n  gone ({}): feed not found\n",
                ProviderKind::Ical
            )
        );
    }

    #[test]
    fn empty_report() {
        assert_eq!(
            summarize(&SyncReport::default()),
            "0 synced, 0 failed, 0 not due; 0 event(s) upserted\n"
        );
    }
}
