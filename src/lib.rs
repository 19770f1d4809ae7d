#![warn(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Counts and durations stay within realistic bounds
    clippy::cast_possible_wrap,       // Safe in non-negative contexts
    clippy::cast_precision_loss,      // Acceptable for rates and statistics
    clippy::cast_sign_loss,           // Safe where values are known non-negative
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. TransportError in sender::transport
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod buffer;
pub mod domain;
pub mod instruments;
pub mod protocol;
pub mod reporter;
pub mod sender;
pub mod transform;

pub use app::{App, Config};
pub use domain::{Measurement, ReporterError, TimeUnit};
pub use instruments::MetricRegistry;
pub use reporter::{ReportCycle, Reporter, ReporterConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
