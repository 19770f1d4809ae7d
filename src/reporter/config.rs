use crate::buffer::DEFAULT_QUEUE_CAPACITY;
use crate::domain::{ReporterError, TimeUnit};
use crate::instruments::MetricFilter;
use crate::transform::{NameTransformer, Naming, TransformContext};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// What a report cycle does when one instrument cannot be transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformFailurePolicy {
    /// Log and send nothing for the whole cycle.
    #[default]
    AbortCycle,
    /// Log and leave out only the failing instrument.
    SkipInstrument,
}

/// Settings of a report cycle. Built once through [`ReporterConfigBuilder`],
/// which validates everything up front.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    period: Duration,
    queue_capacity: usize,
    prefix: Option<String>,
    tags: BTreeMap<String, String>,
    skip_idle: bool,
    rate_unit: TimeUnit,
    duration_unit: TimeUnit,
    failure_policy: TransformFailurePolicy,
    name_transformer: NameTransformer,
    filter: MetricFilter,
}

impl ReporterConfig {
    pub fn builder() -> ReporterConfigBuilder {
        ReporterConfigBuilder::default()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn skip_idle(&self) -> bool {
        self.skip_idle
    }

    pub fn rate_unit(&self) -> TimeUnit {
        self.rate_unit
    }

    pub fn duration_unit(&self) -> TimeUnit {
        self.duration_unit
    }

    pub fn failure_policy(&self) -> TransformFailurePolicy {
        self.failure_policy
    }

    pub fn name_transformer(&self) -> &NameTransformer {
        &self.name_transformer
    }

    pub fn filter(&self) -> &MetricFilter {
        &self.filter
    }

    pub fn transform_context(&self) -> TransformContext {
        TransformContext::new(
            self.rate_unit,
            self.duration_unit,
            self.skip_idle,
            Naming::new(
                self.prefix.clone(),
                self.tags.clone(),
                self.name_transformer.clone(),
            ),
        )
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            prefix: None,
            tags: BTreeMap::new(),
            skip_idle: false,
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            failure_policy: TransformFailurePolicy::default(),
            name_transformer: NameTransformer::default(),
            filter: MetricFilter::All,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReporterConfigBuilder {
    config: ReporterConfig,
}

impl ReporterConfigBuilder {
    pub fn period(mut self, period: Duration) -> Self {
        self.config.period = period;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = Some(prefix.into());
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.tags.insert(key.into(), value.into());
        self
    }

    pub fn tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config
            .tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn skip_idle(mut self, skip_idle: bool) -> Self {
        self.config.skip_idle = skip_idle;
        self
    }

    pub fn rate_unit(mut self, unit: TimeUnit) -> Self {
        self.config.rate_unit = unit;
        self
    }

    pub fn duration_unit(mut self, unit: TimeUnit) -> Self {
        self.config.duration_unit = unit;
        self
    }

    pub fn failure_policy(mut self, policy: TransformFailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn name_transformer(mut self, transformer: NameTransformer) -> Self {
        self.config.name_transformer = transformer;
        self
    }

    pub fn filter(mut self, filter: MetricFilter) -> Self {
        self.config.filter = filter;
        self
    }

    pub fn build(self) -> Result<ReporterConfig, ReporterError> {
        let config = self.config;

        if config.period.is_zero() {
            return Err(ReporterError::Config(
                "Report period must be greater than 0".to_string(),
            ));
        }
        if config.queue_capacity == 0 {
            return Err(ReporterError::Config(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }
        for (key, value) in &config.tags {
            if key.trim().is_empty() {
                return Err(ReporterError::Config(format!(
                    "Tag keys must not be empty (value '{value}')"
                )));
            }
            if value.trim().is_empty() {
                return Err(ReporterError::Config(format!(
                    "Tag '{key}' must have a non-empty value"
                )));
            }
        }
        if let NameTransformer::Categories { categories } = &config.name_transformer
            && categories.iter().any(|c| c.trim().is_empty())
        {
            return Err(ReporterError::Config(
                "Name categories must not be empty".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReporterConfig::builder().build().unwrap();
        assert_eq!(config.queue_capacity(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.failure_policy(), TransformFailurePolicy::AbortCycle);
        assert_eq!(config.rate_unit(), TimeUnit::Seconds);
        assert_eq!(config.duration_unit(), TimeUnit::Milliseconds);
        assert!(!config.skip_idle());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ReporterConfig::builder().queue_capacity(0).build().is_err());
        assert!(ReporterConfig::builder().period(Duration::ZERO).build().is_err());
        assert!(ReporterConfig::builder().tag("", "x").build().is_err());
        assert!(ReporterConfig::builder().tag("host", " ").build().is_err());
        assert!(
            ReporterConfig::builder()
                .name_transformer(NameTransformer::categories(["a", ""]))
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_builder_keeps_values() {
        let config = ReporterConfig::builder()
            .prefix("app")
            .tags([("env", "prod")])
            .skip_idle(true)
            .failure_policy(TransformFailurePolicy::SkipInstrument)
            .build()
            .unwrap();
        assert_eq!(config.prefix(), Some("app"));
        assert_eq!(config.tags().get("env").map(String::as_str), Some("prod"));
        assert!(config.transform_context().skip_idle());
    }
}
