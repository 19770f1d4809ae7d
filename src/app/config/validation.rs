use super::{Config, ConfigError, Protocol};
use crate::instruments::MetricFilter;
use crate::reporter::ReporterConfig;
use crate::sender::{AnyTransport, HttpConfig, HttpTransport, UdpTransport};
use crate::transform::NameTransformer;
use regex::Regex;
use std::collections::BTreeMap;
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.protocol {
            Protocol::Http => {
                let url = Url::parse(&self.url).map_err(|e| {
                    ConfigError::InvalidUrl(format!("Invalid server URL '{}': {}", self.url, e))
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ConfigError::InvalidUrl(format!(
                        "Server URL '{}' must use http or https",
                        self.url
                    )));
                }
                if self.database.trim().is_empty() {
                    return Err(ConfigError::InvalidConfig(
                        "Database name must not be empty".to_string(),
                    ));
                }
            }
            Protocol::Udp => {
                let valid = self
                    .udp_address
                    .rsplit_once(':')
                    .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
                if !valid {
                    return Err(ConfigError::InvalidConfig(format!(
                        "UDP address '{}' must be host:port",
                        self.udp_address
                    )));
                }
            }
        }

        if self.period_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Report period must be greater than 0".to_string(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        self.parsed_tags()?;
        self.parsed_name_transformer()?;
        self.metric_filter()?;

        Ok(())
    }

    /// Tags given as `key=value`. Later duplicates win.
    pub fn parsed_tags(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        self.tags
            .iter()
            .map(|tag| {
                tag.split_once('=')
                    .map(|(k, v)| (k.trim(), v.trim()))
                    .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| {
                        ConfigError::InvalidConfig(format!("Tag '{tag}' must be key=value"))
                    })
            })
            .collect()
    }

    pub fn parsed_name_transformer(&self) -> Result<NameTransformer, ConfigError> {
        self.name_transformer
            .parse()
            .map_err(ConfigError::InvalidConfig)
    }

    pub fn metric_filter(&self) -> Result<MetricFilter, ConfigError> {
        match &self.filter_regex {
            None => Ok(MetricFilter::All),
            Some(pattern) => Regex::new(pattern).map(MetricFilter::Regex).map_err(|e| {
                ConfigError::InvalidConfig(format!("Invalid filter '{pattern}': {e}"))
            }),
        }
    }

    pub fn reporter_config(&self) -> Result<ReporterConfig, ConfigError> {
        let mut builder = ReporterConfig::builder()
            .period(self.period())
            .queue_capacity(self.queue_capacity)
            .skip_idle(self.skip_idle)
            .rate_unit(self.rate_unit)
            .duration_unit(self.duration_unit)
            .failure_policy(self.failure_policy)
            .name_transformer(self.parsed_name_transformer()?)
            .filter(self.metric_filter()?);

        if let Some(prefix) = &self.prefix {
            builder = builder.prefix(prefix.clone());
        }
        if self.tag_host {
            builder = builder.tag("host", local_hostname()?);
        }
        builder
            .tags(self.parsed_tags()?)
            .build()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            url: self.url.clone(),
            database: self.database.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            connect_timeout: self.connect_timeout(),
            request_timeout: self.request_timeout(),
            ..HttpConfig::default()
        }
    }

    pub async fn transport(&self) -> Result<AnyTransport, ConfigError> {
        let transport = match self.protocol {
            Protocol::Http => HttpTransport::new(self.http_config())?.into(),
            Protocol::Udp => UdpTransport::connect(&self.udp_address).await?.into(),
        };
        Ok(transport)
    }
}

fn local_hostname() -> Result<String, ConfigError> {
    hostname::get()
        .map_err(|e| ConfigError::InvalidConfig(format!("Could not read hostname: {e}")))?
        .into_string()
        .map_err(|_| ConfigError::InvalidConfig("Hostname is not valid UTF-8".to_string()))
}
