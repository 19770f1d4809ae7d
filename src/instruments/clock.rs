use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[cfg(test)]
use mockall::automock;

/// Time source for instruments and report cycles.
///
/// `tick_nanos` is monotonic and only meaningful as a difference;
/// `time_millis` is wall-clock epoch milliseconds used for timestamps.
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    fn tick_nanos(&self) -> u64;
    fn time_millis(&self) -> i64;
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn tick_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn time_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to. Intended for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            nanos: AtomicU64::new(0),
            millis: AtomicI64::new(start_millis),
        }
    }

    /// Move both the tick and the wall clock forward.
    pub fn advance(&self, by: Duration) {
        self.nanos
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
        self.millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn tick_nanos(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }

    fn time_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
