//! Domain layer for influx-metrics-reporter.
//!
//! Contains the canonical types shared across all modules:
//! - `Measurement`: The pipeline's core data type
//! - `FieldValue`: Typed field value rendered into a line-protocol token
//! - `TimeUnit`: Rate, duration and timestamp precision units
//! - `ReporterError`: Top-level error type

pub mod error;
pub mod field;
pub mod measurement;
pub mod time_unit;

pub use error::{MeasurementError, ReporterError};
pub use field::FieldValue;
pub use measurement::{Measurement, MeasurementBuilder};
pub use time_unit::TimeUnit;
