use super::config::{LogFormat, LogLevel};
use parking_lot::RwLock;
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose own logs are only interesting when something breaks.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2", "rustls"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    #[error("Invalid log directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },
    #[error("Failed to initialize logging: {0}")]
    InitFailed(String),
}

/// Collects per-target filter directives and installs the global tracing
/// subscriber.
#[derive(Debug, Default)]
pub struct LoggingSystem {
    directives: RwLock<Vec<String>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `target=level` directive. Malformed directives are rejected
    /// and leave the list unchanged.
    pub fn add_directive(&self, directive: &str) -> Result<(), LoggingError> {
        let directive = directive.trim();
        if directive.is_empty() || !directive.contains('=') {
            return Err(LoggingError::InvalidDirective {
                directive: directive.to_string(),
                reason: "expected target=level".to_string(),
            });
        }
        directive
            .parse::<Directive>()
            .map_err(|e| LoggingError::InvalidDirective {
                directive: directive.to_string(),
                reason: e.to_string(),
            })?;

        self.directives.write().push(directive.to_string());
        Ok(())
    }

    pub fn add_default_directives(&self) {
        let mut directives = self.directives.write();
        directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();
        let mut parts = Vec::with_capacity(directives.len() + 1);
        parts.push(tracing::Level::from(default_level).as_str().to_lowercase());
        parts.extend(directives.iter().cloned());
        parts.join(",")
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }

    /// `RUST_LOG` replaces the computed filter when set.
    pub fn build_filter(&self, default_level: LogLevel) -> Result<EnvFilter, LoggingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        let filter_string = self.build_filter_string(default_level);
        EnvFilter::try_new(&filter_string).map_err(|e| {
            LoggingError::InitFailed(format!("Failed to create filter '{filter_string}': {e}"))
        })
    }

    pub fn initialize_tracing(
        &self,
        default_level: LogLevel,
        format: LogFormat,
    ) -> Result<(), LoggingError> {
        let filter = self.build_filter(default_level)?;
        let registry = tracing_subscriber::registry().with(filter);

        let result = match format {
            LogFormat::Compact => registry
                .with(fmt::layer().with_target(true).with_level(true).compact())
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().json().with_current_span(false))
                .try_init(),
        };

        result.map_err(|e| LoggingError::InitFailed(e.to_string()))
    }
}

/// Installs the global subscriber once per process. Later calls return the
/// outcome of the first one.
pub fn setup_logging(level: LogLevel, format: LogFormat) -> Result<(), LoggingError> {
    static INIT: OnceLock<Result<(), LoggingError>> = OnceLock::new();

    INIT.get_or_init(|| {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();
        logging_system.initialize_tracing(level, format)
    })
    .clone()
}
