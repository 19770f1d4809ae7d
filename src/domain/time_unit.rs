use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Units used for rate conversion, duration conversion and timestamp
/// precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Nanoseconds in one unit.
    pub const fn as_nanos(self) -> u64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60 * 1_000_000_000,
            TimeUnit::Hours => 3_600 * 1_000_000_000,
            TimeUnit::Days => 86_400 * 1_000_000_000,
        }
    }

    /// Seconds in one unit, fractional for sub-second units.
    pub fn as_secs_f64(self) -> f64 {
        self.as_nanos() as f64 / 1e9
    }

    /// Multiplier turning a per-second rate into a per-unit rate
    /// (60 for minutes).
    pub fn rate_factor(self) -> f64 {
        self.as_secs_f64()
    }

    /// Convert an epoch-millisecond timestamp into this precision.
    pub fn convert_millis(self, millis: i64) -> i64 {
        const NANOS_PER_MILLI: u64 = 1_000_000;
        let unit = self.as_nanos();
        if unit <= NANOS_PER_MILLI {
            millis.saturating_mul((NANOS_PER_MILLI / unit) as i64)
        } else {
            millis / (unit / NANOS_PER_MILLI) as i64
        }
    }
}
