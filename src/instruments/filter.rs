use regex::Regex;

/// Decides which registered instruments take part in a report.
#[derive(Debug, Clone, Default)]
pub enum MetricFilter {
    #[default]
    All,
    Prefix(String),
    Regex(Regex),
}

impl MetricFilter {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            MetricFilter::All => true,
            MetricFilter::Prefix(prefix) => name.starts_with(prefix.as_str()),
            MetricFilter::Regex(regex) => regex.is_match(name),
        }
    }
}
