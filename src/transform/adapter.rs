use crate::domain::MeasurementBuilder;
use crate::instruments::Instrument;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Hook run on every record after the built-in fields are set and before
/// the record is built.
pub trait RecordAdapter: Send + Sync {
    fn adapt(
        &self,
        name: &str,
        instrument: &Instrument,
        builder: MeasurementBuilder,
    ) -> MeasurementBuilder;

    /// Called once per cycle with the names still registered. Adapters
    /// keeping per-instrument state drop what `live` rejects.
    fn retain(&self, _live: &dyn Fn(&str) -> bool) {}
}

/// Adds a `relativeCount` field to counter records: the change since the
/// counter was last adapted, or the full count on first sight.
#[derive(Debug, Default)]
pub struct RelativeCounterAdapter {
    previous_counts: Mutex<HashMap<String, i64>>,
}

impl RelativeCounterAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordAdapter for RelativeCounterAdapter {
    fn adapt(
        &self,
        name: &str,
        instrument: &Instrument,
        builder: MeasurementBuilder,
    ) -> MeasurementBuilder {
        let Instrument::Counter(counter) = instrument else {
            return builder;
        };

        let count = counter.count();
        let previous = self
            .previous_counts
            .lock()
            .insert(name.to_string(), count)
            .unwrap_or(0);

        // count is re-read, so it is refreshed alongside the delta
        builder
            .add_integer("count", count)
            .add_integer("relativeCount", count.saturating_sub(previous))
    }

    fn retain(&self, live: &dyn Fn(&str) -> bool) {
        self.previous_counts.lock().retain(|name, _| live(name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Measurement;
    use crate::instruments::{Counter, Histogram};
    use std::sync::Arc;

    fn adapt(adapter: &RelativeCounterAdapter, instrument: &Instrument) -> Measurement {
        let builder = Measurement::builder("hits", 0).add_integer("count", -1);
        adapter.adapt("hits", instrument, builder).build().unwrap()
    }

    #[test]
    fn test_relative_count_tracks_changes() {
        let adapter = RelativeCounterAdapter::new();
        let counter = Arc::new(Counter::new());
        let instrument = Instrument::Counter(Arc::clone(&counter));

        counter.inc_by(3);
        let first = adapt(&adapter, &instrument);
        assert_eq!(first.field("count"), Some("3i"));
        assert_eq!(first.field("relativeCount"), Some("3i"));

        counter.inc_by(2);
        let second = adapt(&adapter, &instrument);
        assert_eq!(second.field("count"), Some("5i"));
        assert_eq!(second.field("relativeCount"), Some("2i"));

        let third = adapt(&adapter, &instrument);
        assert_eq!(third.field("relativeCount"), Some("0i"));
    }

    #[test]
    fn test_retain_forgets_removed_counters() {
        let adapter = RelativeCounterAdapter::new();
        let counter = Arc::new(Counter::new());
        let instrument = Instrument::Counter(Arc::clone(&counter));
        counter.inc_by(10);
        adapt(&adapter, &instrument);

        adapter.retain(&|_| false);

        let record = adapt(&adapter, &instrument);
        assert_eq!(record.field("relativeCount"), Some("10i"));
    }

    #[test]
    fn test_other_instruments_are_untouched() {
        let adapter = RelativeCounterAdapter::new();
        let instrument = Instrument::Histogram(Arc::new(Histogram::new()));
        let record = adapt(&adapter, &instrument);
        assert_eq!(record.field("relativeCount"), None);
        assert_eq!(record.field("count"), Some("-1i"));
    }
}
