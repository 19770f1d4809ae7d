//! Report cycles and the task that schedules them.

pub mod config;
pub mod cycle;
pub mod scheduler;

pub use config::{ReporterConfig, ReporterConfigBuilder, TransformFailurePolicy};
pub use cycle::{CycleReport, ReportCycle};
pub use scheduler::Reporter;
