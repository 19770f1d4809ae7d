use super::{ConfigError, LogFormat, LogLevel, Protocol};
use crate::domain::TimeUnit;
use crate::reporter::TransformFailurePolicy;
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Transport used to reach the server (http or udp)
    #[arg(long, env = "INFLUX_PROTOCOL", default_value = "http")]
    pub protocol: Protocol,

    /// Base URL of the HTTP write API
    #[arg(long, env = "INFLUX_URL", default_value = "http://localhost:8086")]
    pub url: String,

    /// Database the measurements are written to
    #[arg(long, env = "INFLUX_DATABASE", default_value = "metrics")]
    pub database: String,

    /// Basic auth user name
    #[arg(long, env = "INFLUX_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long, env = "INFLUX_PASSWORD", hide_env_values = true)]
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// host:port of the UDP listener (used when protocol=udp)
    #[arg(long, env = "INFLUX_UDP_ADDRESS", default_value = "localhost:8089")]
    pub udp_address: String,

    /// Seconds between two reports
    #[arg(long, env = "INFLUX_PERIOD_SECS", default_value = "10")]
    pub period_secs: u64,

    /// Maximum number of measurements waiting to be sent
    #[arg(long, env = "INFLUX_QUEUE_CAPACITY", default_value = "5000")]
    pub queue_capacity: usize,

    /// Prefix prepended to every measurement name
    #[arg(long, env = "INFLUX_PREFIX")]
    pub prefix: Option<String>,

    /// Tags added to every measurement, as key=value
    #[arg(long = "tag", env = "INFLUX_TAGS", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Add a `host` tag with the local hostname
    #[arg(long, env = "INFLUX_TAG_HOST")]
    pub tag_host: bool,

    /// Leave out instruments whose count did not change since the last report
    #[arg(long, env = "INFLUX_SKIP_IDLE")]
    pub skip_idle: bool,

    /// Report `count` as the total and `relativeCount` as the change per report
    #[arg(long, env = "INFLUX_RELATIVE_COUNTERS")]
    pub relative_counters: bool,

    /// Unit rates are expressed in
    #[arg(long, env = "INFLUX_RATE_UNIT", default_value = "seconds")]
    pub rate_unit: TimeUnit,

    /// Unit durations are expressed in
    #[arg(long, env = "INFLUX_DURATION_UNIT", default_value = "milliseconds")]
    pub duration_unit: TimeUnit,

    /// What to do when one instrument cannot be reported
    #[arg(long, env = "INFLUX_FAILURE_POLICY", default_value = "abort-cycle")]
    pub failure_policy: TransformFailurePolicy,

    /// identity, key-value or categories:<c1>,<c2>,...
    #[arg(long, env = "INFLUX_NAME_TRANSFORMER", default_value = "identity")]
    pub name_transformer: String,

    /// Only report instruments whose name matches this regular expression
    #[arg(long, env = "INFLUX_FILTER")]
    pub filter_regex: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Connection timeout in seconds
    #[arg(long, env = "INFLUX_CONNECT_TIMEOUT_SECS", default_value = "5")]
    pub connect_timeout_secs: u64,

    /// Request timeout in seconds
    #[arg(long, env = "INFLUX_REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,

    /// TOML file with defaults for every option above
    #[arg(long, env = "INFLUX_CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            url: "http://localhost:8086".to_string(),
            database: "metrics".to_string(),
            username: None,
            password: None,
            udp_address: "localhost:8089".to_string(),
            period_secs: 10,
            queue_capacity: crate::buffer::DEFAULT_QUEUE_CAPACITY,
            prefix: None,
            tags: Vec::new(),
            tag_host: false,
            skip_idle: false,
            relative_counters: false,
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            failure_policy: TransformFailurePolicy::AbortCycle,
            name_transformer: "identity".to_string(),
            filter_regex: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            config_file: None,
        }
    }
}

impl Config {
    /// Parses command line arguments and environment variables. When a
    /// config file is given, its values fill every option that was set
    /// neither on the command line nor in the environment.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Config::command().try_get_matches_from(args)?;
        let mut config = Config::from_arg_matches(&matches)?;

        if let Some(path) = config.config_file.clone() {
            let file = Self::read_file(&path)?;
            config.merge_unset(file, &matches);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path.as_ref())?;
        config.config_file = Some(path.as_ref().to_path_buf());
        config.validate()?;
        Ok(config)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn merge_unset(&mut self, file: Config, matches: &ArgMatches) {
        let explicit = |id: &str| {
            matches!(
                matches.value_source(id),
                Some(ValueSource::CommandLine | ValueSource::EnvVariable)
            )
        };

        macro_rules! fill {
            ($($field:ident),+ $(,)?) => {
                $(
                    if !explicit(stringify!($field)) {
                        self.$field = file.$field;
                    }
                )+
            };
        }

        fill!(
            protocol,
            url,
            database,
            username,
            password,
            udp_address,
            period_secs,
            queue_capacity,
            prefix,
            tags,
            tag_host,
            skip_idle,
            relative_counters,
            rate_unit,
            duration_unit,
            failure_policy,
            name_transformer,
            filter_regex,
            log_level,
            log_format,
            connect_timeout_secs,
            request_timeout_secs,
        );
    }
}
