use super::clock::{Clock, SystemClock};
use super::counter::Counter;
use super::filter::MetricFilter;
use super::gauge::Gauge;
use super::histogram::Histogram;
use super::meter::Meter;
use super::timer::Timer;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Counter,
    Gauge,
    Histogram,
    Meter,
    Timer,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::Gauge => "gauge",
            InstrumentKind::Histogram => "histogram",
            InstrumentKind::Meter => "meter",
            InstrumentKind::Timer => "timer",
        };
        f.write_str(label)
    }
}

/// A registered instrument of any kind.
#[derive(Debug, Clone)]
pub enum Instrument {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
}

impl Instrument {
    pub fn kind(&self) -> InstrumentKind {
        match self {
            Instrument::Counter(_) => InstrumentKind::Counter,
            Instrument::Gauge(_) => InstrumentKind::Gauge,
            Instrument::Histogram(_) => InstrumentKind::Histogram,
            Instrument::Meter(_) => InstrumentKind::Meter,
            Instrument::Timer(_) => InstrumentKind::Timer,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric name must not be empty")]
    InvalidName,

    #[error("metric '{name}' is already registered as a {existing}, not a {requested}")]
    KindMismatch {
        name: String,
        existing: InstrumentKind,
        requested: InstrumentKind,
    },
}

/// Instruments captured for one report, each group sorted by name.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub gauges: Vec<(String, Arc<Gauge>)>,
    pub counters: Vec<(String, Arc<Counter>)>,
    pub histograms: Vec<(String, Arc<Histogram>)>,
    pub meters: Vec<(String, Arc<Meter>)>,
    pub timers: Vec<(String, Arc<Timer>)>,
}

impl RegistrySnapshot {
    pub fn len(&self) -> usize {
        self.gauges.len()
            + self.counters.len()
            + self.histograms.len()
            + self.meters.len()
            + self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Instruments {
    counters: BTreeMap<String, Arc<Counter>>,
    gauges: BTreeMap<String, Arc<Gauge>>,
    histograms: BTreeMap<String, Arc<Histogram>>,
    meters: BTreeMap<String, Arc<Meter>>,
    timers: BTreeMap<String, Arc<Timer>>,
}

impl Instruments {
    fn kind_of(&self, name: &str) -> Option<InstrumentKind> {
        if self.counters.contains_key(name) {
            Some(InstrumentKind::Counter)
        } else if self.gauges.contains_key(name) {
            Some(InstrumentKind::Gauge)
        } else if self.histograms.contains_key(name) {
            Some(InstrumentKind::Histogram)
        } else if self.meters.contains_key(name) {
            Some(InstrumentKind::Meter)
        } else if self.timers.contains_key(name) {
            Some(InstrumentKind::Timer)
        } else {
            None
        }
    }

    fn ensure_free(&self, name: &str, requested: InstrumentKind) -> Result<(), RegistryError> {
        match self.kind_of(name) {
            Some(existing) if existing != requested => Err(RegistryError::KindMismatch {
                name: name.to_string(),
                existing,
                requested,
            }),
            _ => Ok(()),
        }
    }
}

/// Named instruments shared between the code that updates them and the
/// report cycle that reads them.
pub struct MetricRegistry {
    instruments: RwLock<Instruments>,
    clock: Arc<dyn Clock>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            instruments: RwLock::new(Instruments::default()),
            clock,
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn counter(&self, name: &str) -> Result<Arc<Counter>, RegistryError> {
        self.get_or_create(name, InstrumentKind::Counter, |i| &mut i.counters, || {
            Counter::new()
        })
    }

    pub fn histogram(&self, name: &str) -> Result<Arc<Histogram>, RegistryError> {
        self.get_or_create(name, InstrumentKind::Histogram, |i| &mut i.histograms, || {
            Histogram::new()
        })
    }

    pub fn meter(&self, name: &str) -> Result<Arc<Meter>, RegistryError> {
        let clock = self.clock();
        self.get_or_create(name, InstrumentKind::Meter, |i| &mut i.meters, move || {
            Meter::new(clock)
        })
    }

    pub fn timer(&self, name: &str) -> Result<Arc<Timer>, RegistryError> {
        let clock = self.clock();
        self.get_or_create(name, InstrumentKind::Timer, |i| &mut i.timers, move || {
            Timer::new(clock)
        })
    }

    /// Registers `gauge` under `name`, replacing a previous gauge of that name.
    pub fn register_gauge(&self, name: &str, gauge: Gauge) -> Result<Arc<Gauge>, RegistryError> {
        validate_name(name)?;
        let mut instruments = self.instruments.write();
        instruments.ensure_free(name, InstrumentKind::Gauge)?;
        let gauge = Arc::new(gauge);
        instruments
            .gauges
            .insert(name.to_string(), Arc::clone(&gauge));
        Ok(gauge)
    }

    pub fn remove(&self, name: &str) -> Option<Instrument> {
        let mut instruments = self.instruments.write();
        if let Some(c) = instruments.counters.remove(name) {
            return Some(Instrument::Counter(c));
        }
        if let Some(g) = instruments.gauges.remove(name) {
            return Some(Instrument::Gauge(g));
        }
        if let Some(h) = instruments.histograms.remove(name) {
            return Some(Instrument::Histogram(h));
        }
        if let Some(m) = instruments.meters.remove(name) {
            return Some(Instrument::Meter(m));
        }
        instruments.timers.remove(name).map(Instrument::Timer)
    }

    pub fn get(&self, name: &str) -> Option<Instrument> {
        let instruments = self.instruments.read();
        match instruments.kind_of(name)? {
            InstrumentKind::Counter => instruments.counters.get(name).cloned().map(Instrument::Counter),
            InstrumentKind::Gauge => instruments.gauges.get(name).cloned().map(Instrument::Gauge),
            InstrumentKind::Histogram => instruments
                .histograms
                .get(name)
                .cloned()
                .map(Instrument::Histogram),
            InstrumentKind::Meter => instruments.meters.get(name).cloned().map(Instrument::Meter),
            InstrumentKind::Timer => instruments.timers.get(name).cloned().map(Instrument::Timer),
        }
    }

    pub fn len(&self) -> usize {
        let instruments = self.instruments.read();
        instruments.counters.len()
            + instruments.gauges.len()
            + instruments.histograms.len()
            + instruments.meters.len()
            + instruments.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones the handles of every instrument accepted by `filter`. The read
    /// lock is released before this returns.
    pub fn snapshot(&self, filter: &MetricFilter) -> RegistrySnapshot {
        fn select<T>(map: &BTreeMap<String, Arc<T>>, filter: &MetricFilter) -> Vec<(String, Arc<T>)> {
            map.iter()
                .filter(|(name, _)| filter.matches(name))
                .map(|(name, instrument)| (name.clone(), Arc::clone(instrument)))
                .collect()
        }

        let instruments = self.instruments.read();
        RegistrySnapshot {
            gauges: select(&instruments.gauges, filter),
            counters: select(&instruments.counters, filter),
            histograms: select(&instruments.histograms, filter),
            meters: select(&instruments.meters, filter),
            timers: select(&instruments.timers, filter),
        }
    }

    fn get_or_create<T, M, C>(
        &self,
        name: &str,
        kind: InstrumentKind,
        map: M,
        create: C,
    ) -> Result<Arc<T>, RegistryError>
    where
        M: Fn(&mut Instruments) -> &mut BTreeMap<String, Arc<T>>,
        C: FnOnce() -> T,
    {
        validate_name(name)?;
        let mut instruments = self.instruments.write();
        instruments.ensure_free(name, kind)?;
        let instrument = map(&mut *instruments)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(create()));
        Ok(Arc::clone(instrument))
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("instruments", &self.len())
            .finish_non_exhaustive()
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidName);
    }
    Ok(())
}
