//! Live instruments updated by application code and read by report cycles.

pub mod clock;
pub mod counter;
pub mod filter;
pub mod gauge;
pub mod histogram;
pub mod meter;
pub mod registry;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use counter::Counter;
pub use filter::MetricFilter;
pub use gauge::{Gauge, GaugeError, GaugeValue};
pub use histogram::{DEFAULT_RESERVOIR_SIZE, Histogram, Snapshot};
pub use meter::Meter;
pub use registry::{Instrument, InstrumentKind, MetricRegistry, RegistryError, RegistrySnapshot};
pub use timer::{Timer, TimerContext};
