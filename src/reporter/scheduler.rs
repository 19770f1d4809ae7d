use super::cycle::ReportCycle;
use crate::domain::ReporterError;
use crate::sender::{SenderStats, Transport};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs a [`ReportCycle`] every `period` on its own task.
///
/// Cycles never overlap: the next tick is only awaited once the previous
/// report has finished, and ticks missed meanwhile are skipped.
#[derive(Debug)]
pub struct Reporter {
    token: CancellationToken,
    task: JoinHandle<SenderStats>,
}

impl Reporter {
    pub fn spawn<T>(cycle: ReportCycle<T>, period: Duration) -> Self
    where
        T: Transport + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(cycle, period, token.clone()));
        info!(?period, "Reporter started");
        Self { token, task }
    }

    /// Token that stops the reporter when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops future ticks and waits for a running cycle to finish. Records
    /// still queued are dropped, not sent.
    pub async fn stop(self) -> Result<SenderStats, ReporterError> {
        self.token.cancel();
        self.task
            .await
            .map_err(|e| ReporterError::Shutdown(format!("Reporter task failed: {e}")))
    }
}

async fn run<T: Transport>(
    mut cycle: ReportCycle<T>,
    period: Duration,
    token: CancellationToken,
) -> SenderStats {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticks.tick() => {
                let report = cycle.report().await;
                debug!(
                    produced = report.produced,
                    aborted = report.aborted,
                    "Scheduled report done"
                );
            }
        }
    }

    let dropped = cycle.close();
    let stats = cycle.stats();
    info!(
        dropped,
        flushes = stats.flushes_succeeded,
        failed_flushes = stats.flushes_failed,
        "Reporter stopped"
    );
    stats
}
