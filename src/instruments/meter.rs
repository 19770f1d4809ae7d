//! Meters: event counts plus exponentially weighted moving average rates.

use super::clock::Clock;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const TICK_INTERVAL_NANOS: u64 = 5_000_000_000;
const TICK_INTERVAL_SECS: f64 = 5.0;

/// One exponentially weighted moving average, in events per second.
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
    uncounted: u64,
}

impl Ewma {
    fn over_minutes(minutes: f64) -> Self {
        Self {
            alpha: 1.0 - (-TICK_INTERVAL_SECS / 60.0 / minutes).exp(),
            rate: 0.0,
            initialized: false,
            uncounted: 0,
        }
    }

    fn update(&mut self, n: u64) {
        self.uncounted += n;
    }

    fn tick(&mut self) {
        let instant_rate = self.uncounted as f64 / TICK_INTERVAL_SECS;
        self.uncounted = 0;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct Rates {
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl Rates {
    fn new() -> Self {
        Self {
            m1: Ewma::over_minutes(1.0),
            m5: Ewma::over_minutes(5.0),
            m15: Ewma::over_minutes(15.0),
        }
    }

    fn update(&mut self, n: u64) {
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    fn tick(&mut self) {
        self.m1.tick();
        self.m5.tick();
        self.m15.tick();
    }
}

/// Measures the rate at which events occur.
///
/// All rates are per second; the reporting side converts them to the
/// configured rate unit.
pub struct Meter {
    count: AtomicU64,
    start_tick: u64,
    last_tick: AtomicU64,
    rates: Mutex<Rates>,
    clock: Arc<dyn Clock>,
}

impl Meter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let start_tick = clock.tick_nanos();
        Self {
            count: AtomicU64::new(0),
            start_tick,
            last_tick: AtomicU64::new(start_tick),
            rates: Mutex::new(Rates::new()),
            clock,
        }
    }

    pub fn mark(&self) {
        self.mark_n(1);
    }

    pub fn mark_n(&self, n: u64) {
        self.tick_if_necessary();
        self.count.fetch_add(n, Ordering::Relaxed);
        self.rates.lock().update(n);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.rates.lock().m1.rate
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.rates.lock().m5.rate
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.rates.lock().m15.rate
    }

    /// Events per second since the meter was created.
    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = self.clock.tick_nanos().saturating_sub(self.start_tick);
        if elapsed == 0 {
            return 0.0;
        }
        count as f64 / (elapsed as f64 / 1e9)
    }

    fn tick_if_necessary(&self) {
        let old = self.last_tick.load(Ordering::Acquire);
        let now = self.clock.tick_nanos();
        let age = now.saturating_sub(old);
        if age <= TICK_INTERVAL_NANOS {
            return;
        }

        let interval_start = now - age % TICK_INTERVAL_NANOS;
        if self
            .last_tick
            .compare_exchange(old, interval_start, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let required_ticks = age / TICK_INTERVAL_NANOS;
            let mut rates = self.rates.lock();
            for _ in 0..required_ticks {
                rates.tick();
            }
        }
    }
}

impl std::fmt::Debug for Meter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meter")
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}
