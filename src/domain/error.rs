use thiserror::Error;

/// Top-level error type for the reporting pipeline.
#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Buffer error: {0}")]
    Buffer(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),
}

/// Raised when a measurement would violate the record invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeasurementError {
    #[error("Measurement name must not be empty")]
    EmptyName,

    #[error("Measurement '{name}' has no fields")]
    NoFields { name: String },
}
