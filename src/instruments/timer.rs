//! Timers: a meter of call rates plus a histogram of call durations.

use super::clock::Clock;
use super::histogram::{Histogram, Snapshot};
use super::meter::Meter;
use std::sync::Arc;
use std::time::Duration;

/// Durations are recorded in nanoseconds; the reporting side scales them to
/// the configured duration unit.
pub struct Timer {
    meter: Meter,
    histogram: Histogram,
    clock: Arc<dyn Clock>,
}

impl Timer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            meter: Meter::new(Arc::clone(&clock)),
            histogram: Histogram::new(),
            clock,
        }
    }

    pub fn update(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark();
    }

    /// Runs `f` and records how long it took.
    pub fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let context = self.start();
        let result = f();
        context.stop();
        result
    }

    pub fn start(&self) -> TimerContext<'_> {
        TimerContext {
            timer: self,
            started: self.clock.tick_nanos(),
            stopped: false,
        }
    }

    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.histogram.snapshot()
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }

    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}

/// An in-flight timing. Recorded once, on [`TimerContext::stop`] or on drop.
#[derive(Debug)]
pub struct TimerContext<'a> {
    timer: &'a Timer,
    started: u64,
    stopped: bool,
}

impl TimerContext<'_> {
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        let elapsed = self.timer.clock.tick_nanos().saturating_sub(self.started);
        let elapsed = Duration::from_nanos(elapsed);
        if !self.stopped {
            self.stopped = true;
            self.timer.update(elapsed);
        }
        elapsed
    }
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            self.record();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::clock::ManualClock;

    #[test]
    fn test_update_feeds_meter_and_histogram() {
        let timer = Timer::new(Arc::new(ManualClock::new(0)));
        timer.update(Duration::from_millis(2));
        timer.update(Duration::from_millis(4));

        assert_eq!(timer.count(), 2);
        let snapshot = timer.snapshot();
        assert_eq!(snapshot.min(), 2_000_000);
        assert_eq!(snapshot.max(), 4_000_000);
    }

    #[test]
    fn test_context_records_elapsed_ticks() {
        let clock = Arc::new(ManualClock::new(0));
        let timer = Timer::new(clock.clone());

        let context = timer.start();
        clock.advance(Duration::from_millis(30));
        assert_eq!(context.stop(), Duration::from_millis(30));
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.snapshot().max(), 30_000_000);
    }

    #[test]
    fn test_context_records_on_drop_exactly_once() {
        let clock = Arc::new(ManualClock::new(0));
        let timer = Timer::new(clock.clone());
        {
            let _context = timer.start();
            clock.advance(Duration::from_millis(5));
        }
        assert_eq!(timer.count(), 1);

        let value = timer.time(|| 7);
        assert_eq!(value, 7);
        assert_eq!(timer.count(), 2);
    }
}
