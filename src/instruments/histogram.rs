//! Histograms backed by a uniform reservoir sample.

use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// Samples kept per histogram; large enough for a 99.9% confidence level
/// with a 5% margin of error on a normal distribution.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1_028;

/// Vitter's algorithm R: every value ever recorded has the same chance of
/// being in the sample.
#[derive(Debug)]
struct UniformReservoir {
    values: Vec<i64>,
    seen: u64,
    size: usize,
}

impl UniformReservoir {
    fn new(size: usize) -> Self {
        Self {
            values: Vec::with_capacity(size),
            seen: 0,
            size,
        }
    }

    fn update(&mut self, value: i64) {
        self.seen += 1;
        if self.values.len() < self.size {
            self.values.push(value);
        } else {
            let slot = rand::rng().random_range(0..self.seen);
            if let Ok(slot) = usize::try_from(slot)
                && slot < self.size
            {
                self.values[slot] = value;
            }
        }
    }
}

/// Records the distribution of a stream of values.
#[derive(Debug)]
pub struct Histogram {
    count: AtomicU64,
    reservoir: Mutex<UniformReservoir>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::with_reservoir_size(DEFAULT_RESERVOIR_SIZE)
    }

    pub fn with_reservoir_size(size: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            reservoir: Mutex::new(UniformReservoir::new(size.max(1))),
        }
    }

    pub fn update(&self, value: i64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.reservoir.lock().update(value);
    }

    /// Number of values recorded over the histogram's lifetime.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.reservoir.lock().values.clone())
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// A sorted, frozen copy of a reservoir.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    values: Vec<i64>,
}

impl Snapshot {
    pub fn new(mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { values }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|&v| v as f64).sum::<f64>() / self.values.len() as f64
    }

    /// Sample standard deviation; zero for fewer than two values.
    pub fn std_dev(&self) -> f64 {
        let n = self.values.len();
        if n <= 1 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq = self
            .values
            .iter()
            .map(|&v| {
                let diff = v as f64 - mean;
                diff * diff
            })
            .sum::<f64>();
        (sum_sq / (n - 1) as f64).sqrt()
    }

    /// Value at `quantile` (0.0..=1.0), interpolated between the two closest
    /// samples at position `quantile * (n + 1)`.
    pub fn value(&self, quantile: f64) -> f64 {
        let quantile = quantile.clamp(0.0, 1.0);
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }

        let pos = quantile * (n + 1) as f64;
        let index = pos as usize;

        if index < 1 {
            return self.values[0] as f64;
        }
        if index >= n {
            return self.values[n - 1] as f64;
        }

        let lower = self.values[index - 1] as f64;
        let upper = self.values[index] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }

    pub fn median(&self) -> f64 {
        self.value(0.5)
    }

    pub fn p75(&self) -> f64 {
        self.value(0.75)
    }

    pub fn p95(&self) -> f64 {
        self.value(0.95)
    }

    pub fn p99(&self) -> f64 {
        self.value(0.99)
    }

    pub fn p999(&self) -> f64 {
        self.value(0.999)
    }
}
