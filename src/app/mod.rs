pub mod config;
pub mod logging_system;
pub mod shutdown;

pub use config::{Config, ConfigError, LogFormat, LogLevel, Protocol};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging};

use crate::instruments::{Gauge, MetricRegistry};
use crate::reporter::{ReportCycle, Reporter};
use crate::sender::SenderStats;
use crate::transform::RelativeCounterAdapter;
use anyhow::Context;
use std::process;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The standalone reporter process: one registry reported on a fixed
/// period until the process is asked to stop.
pub struct App {
    config: Config,
    registry: Arc<MetricRegistry>,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_config(Config::from_args(args)?))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            registry: Arc::new(MetricRegistry::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registry reported by [`App::run`]; instruments may be added before
    /// or while it runs.
    pub fn registry(&self) -> Arc<MetricRegistry> {
        Arc::clone(&self.registry)
    }

    pub async fn run(self) -> anyhow::Result<SenderStats> {
        let reporter_config = self
            .config
            .reporter_config()
            .context("Invalid reporter configuration")?;
        let transport = self
            .config
            .transport()
            .await
            .context("Failed to set up transport")?;

        self.register_process_instruments()?;

        let mut cycle = ReportCycle::new(Arc::clone(&self.registry), &reporter_config, transport)?;
        if self.config.relative_counters {
            cycle = cycle.with_adapter(Arc::new(RelativeCounterAdapter::new()));
        }

        info!(
            protocol = ?self.config.protocol,
            period_secs = self.config.period_secs,
            queue_capacity = self.config.queue_capacity,
            instruments = self.registry.len(),
            "Starting influx-metrics-reporter v{}",
            crate::VERSION
        );

        let reporter = Reporter::spawn(cycle, reporter_config.period());
        let token = reporter.cancellation_token();
        shutdown::cancel_on_signal(token.clone());
        token.cancelled().await;

        let stats = reporter.stop().await?;
        info!(
            records_sent = stats.records_sent,
            records_evicted = stats.records_evicted,
            flushes_failed = stats.flushes_failed,
            "influx-metrics-reporter stopped"
        );
        Ok(stats)
    }

    fn register_process_instruments(&self) -> anyhow::Result<()> {
        let started = Instant::now();
        self.registry
            .register_gauge(
                "reporter.uptime",
                Gauge::new(move || started.elapsed().as_secs()),
            )
            .context("Failed to register uptime gauge")?;
        self.registry
            .register_gauge("reporter.version", Gauge::new(|| crate::VERSION))
            .context("Failed to register version gauge")?;
        Ok(())
    }
}

pub async fn main() -> anyhow::Result<()> {
    let app = match App::from_args(std::env::args_os()) {
        Ok(app) => app,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(2);
        }
    };

    let config = app.config();
    if let Err(e) = setup_logging(config.log_level, config.log_format) {
        eprintln!("Warning: {e}");
    }

    if let Err(e) = app.run().await {
        error!("Application error: {:#}", e);
        process::exit(1);
    }

    Ok(())
}
