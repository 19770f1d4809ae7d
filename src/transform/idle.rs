use std::collections::HashMap;
use tracing::warn;

/// Remembers the last reported count of every counting instrument so that
/// instruments which did not move since the previous cycle can be skipped.
///
/// Owned by a single report cycle; counts are only recorded when the
/// instrument is reported.
#[derive(Debug, Default)]
pub struct IdleTracker {
    previous_counts: HashMap<String, i64>,
}

impl IdleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Difference between `count` and the last recorded count for `name`.
    ///
    /// Returns `None` for an instrument never seen before, which always
    /// counts as active. A count lower than the previous one is logged and
    /// treated as no movement.
    pub fn delta(&self, name: &str, count: i64) -> Option<i64> {
        let previous = *self.previous_counts.get(name)?;
        if count < previous {
            warn!(
                metric = name,
                previous, count, "Saw a non-monotonically increasing count"
            );
            return Some(0);
        }
        Some(count - previous)
    }

    /// Returns `true` when `name` has not moved since it was last recorded.
    /// Active instruments have `count` recorded as their new baseline.
    pub fn check_idle(&mut self, name: &str, count: i64) -> bool {
        let idle = self.delta(name, count) == Some(0);
        if !idle {
            self.previous_counts.insert(name.to_string(), count);
        }
        idle
    }

    pub fn previous(&self, name: &str) -> Option<i64> {
        self.previous_counts.get(name).copied()
    }

    pub fn forget(&mut self, name: &str) {
        self.previous_counts.remove(name);
    }

    /// Drops the baselines of every instrument `live` rejects, so a name
    /// registered again later starts over as a first observation.
    pub fn retain<F>(&mut self, mut live: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.previous_counts.retain(|name, _| live(name));
    }

    pub fn len(&self) -> usize {
        self.previous_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous_counts.is_empty()
    }
}
