use super::config::{ReporterConfig, TransformFailurePolicy};
use crate::domain::ReporterError;
use crate::instruments::{Clock, Instrument, MetricFilter, MetricRegistry};
use crate::sender::{FlushOutcome, Sender, SenderStats, Transport};
use crate::transform::{IdleTracker, RecordAdapter, TransformContext, transform};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Summary of one [`ReportCycle::report`] call.
#[derive(Debug)]
pub struct CycleReport {
    /// Epoch milliseconds shared by every record of the cycle.
    pub timestamp: i64,
    pub instruments: usize,
    pub produced: usize,
    /// Instruments with nothing to report (idle, or gauges without a value).
    pub skipped: usize,
    pub failed: usize,
    /// A transform failed and nothing from this cycle was queued or sent.
    pub aborted: bool,
    /// `None` when the cycle was aborted before flushing.
    pub flush: Option<FlushOutcome>,
}

/// One reporting pass: read the registry, transform every instrument,
/// queue the records and flush once.
///
/// Never returns an error; failures are logged and summarized in the
/// returned [`CycleReport`].
pub struct ReportCycle<T: Transport> {
    registry: Arc<MetricRegistry>,
    context: TransformContext,
    idle: IdleTracker,
    sender: Sender<T>,
    clock: Arc<dyn Clock>,
    policy: TransformFailurePolicy,
    filter: MetricFilter,
}

impl<T: Transport> ReportCycle<T> {
    pub fn new(
        registry: Arc<MetricRegistry>,
        config: &ReporterConfig,
        transport: T,
    ) -> Result<Self, ReporterError> {
        let sender = Sender::new(transport, config.queue_capacity())
            .map_err(|e| ReporterError::Buffer(e.to_string()))?;

        Ok(Self {
            clock: registry.clock(),
            registry,
            context: config.transform_context(),
            idle: IdleTracker::new(),
            sender,
            policy: config.failure_policy(),
            filter: config.filter().clone(),
        })
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn RecordAdapter>) -> Self {
        self.context = self.context.with_adapter(adapter);
        self
    }

    /// Uses `clock` for cycle timestamps instead of the registry's clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sender(&self) -> &Sender<T> {
        &self.sender
    }

    pub fn stats(&self) -> SenderStats {
        self.sender.stats()
    }

    /// Drops pending records without sending them.
    pub fn close(&mut self) -> usize {
        self.sender.close()
    }

    pub async fn report(&mut self) -> CycleReport {
        let timestamp = self.clock.time_millis();
        let snapshot = self.registry.snapshot(&self.filter);

        let mut report = CycleReport {
            timestamp,
            instruments: snapshot.len(),
            produced: 0,
            skipped: 0,
            failed: 0,
            aborted: false,
            flush: None,
        };

        let live: HashSet<String> = snapshot
            .gauges
            .iter()
            .map(|(name, _)| name)
            .chain(snapshot.counters.iter().map(|(name, _)| name))
            .chain(snapshot.histograms.iter().map(|(name, _)| name))
            .chain(snapshot.meters.iter().map(|(name, _)| name))
            .chain(snapshot.timers.iter().map(|(name, _)| name))
            .cloned()
            .collect();

        let instruments = snapshot
            .gauges
            .into_iter()
            .map(|(name, g)| (name, Instrument::Gauge(g)))
            .chain(
                snapshot
                    .counters
                    .into_iter()
                    .map(|(name, c)| (name, Instrument::Counter(c))),
            )
            .chain(
                snapshot
                    .histograms
                    .into_iter()
                    .map(|(name, h)| (name, Instrument::Histogram(h))),
            )
            .chain(
                snapshot
                    .meters
                    .into_iter()
                    .map(|(name, m)| (name, Instrument::Meter(m))),
            )
            .chain(
                snapshot
                    .timers
                    .into_iter()
                    .map(|(name, t)| (name, Instrument::Timer(t))),
            );

        let mut records = Vec::with_capacity(report.instruments);
        for (name, instrument) in instruments {
            match transform(&self.context, &mut self.idle, &name, &instrument, timestamp) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => report.skipped += 1,
                Err(error) => {
                    report.failed += 1;
                    match self.policy {
                        TransformFailurePolicy::AbortCycle => {
                            warn!(
                                metric = %name,
                                error = %error,
                                "Unable to report metrics, skipping this cycle"
                            );
                            report.aborted = true;
                            break;
                        }
                        TransformFailurePolicy::SkipInstrument => {
                            warn!(
                                metric = %name,
                                error = %error,
                                "Unable to report metric, leaving it out"
                            );
                        }
                    }
                }
            }
        }

        // removed instruments start over when registered again
        self.idle.retain(|name| live.contains(name));
        self.context
            .retain_adapter_state(&|name: &str| live.contains(name));

        if report.aborted {
            return report;
        }

        report.produced = records.len();
        self.sender.offer_all(records);
        let outcome = self.sender.flush().await;
        debug!(
            timestamp,
            produced = report.produced,
            skipped = report.skipped,
            success = outcome.is_success(),
            "Report cycle finished"
        );
        report.flush = Some(outcome);
        report
    }
}

impl<T: Transport> std::fmt::Debug for ReportCycle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportCycle")
            .field("context", &self.context)
            .field("idle", &self.idle)
            .field("policy", &self.policy)
            .field("pending", &self.sender.pending())
            .finish_non_exhaustive()
    }
}
