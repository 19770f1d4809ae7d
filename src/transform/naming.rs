//! Measurement names and tags derived from registry metric names.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '.';

/// Splits a dotted metric name into a measurement name plus tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NameTransformer {
    /// The metric name is the measurement name; no tags.
    #[default]
    Identity,
    /// Leading name segments become tag values, keyed by category in order.
    ///
    /// With categories `[server, type]`, `actarus.prod.cpu_load` becomes
    /// measurement `cpu_load` tagged `server=actarus,type=prod`.
    Categories { categories: Vec<String> },
    /// The name is read as `key1.val1.key2.val2...name`.
    ///
    /// With an even number of segments the last two form the name, so
    /// `server.actarus.cores.cpu_load` becomes `cores.cpu_load` tagged
    /// `server=actarus`.
    KeyValue,
}

impl NameTransformer {
    pub fn categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NameTransformer::Categories {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn measurement_name(&self, metric_name: &str) -> String {
        match self {
            NameTransformer::Identity => metric_name.to_string(),
            NameTransformer::Categories { categories } => {
                let parts: Vec<&str> = metric_name.split(SEPARATOR).collect();
                if categories.len() < parts.len() {
                    parts[categories.len()..].join(".")
                } else {
                    parts[parts.len() - 1].to_string()
                }
            }
            NameTransformer::KeyValue => {
                let parts: Vec<&str> = metric_name.split(SEPARATOR).collect();
                let n = parts.len();
                if n % 2 == 1 {
                    parts[n - 1].to_string()
                } else {
                    format!("{}.{}", parts[n - 2], parts[n - 1])
                }
            }
        }
    }

    pub fn tags(&self, metric_name: &str) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        match self {
            NameTransformer::Identity => {}
            NameTransformer::Categories { categories } => {
                let parts: Vec<&str> = metric_name.split(SEPARATOR).collect();
                let used = (parts.len() - 1).min(categories.len());
                for (category, value) in categories.iter().zip(&parts[..used]) {
                    tags.insert(category.clone(), (*value).to_string());
                }
            }
            NameTransformer::KeyValue => {
                let parts: Vec<&str> = metric_name.split(SEPARATOR).collect();
                let n = parts.len();
                let pairs = if n % 2 == 1 { (n - 1) / 2 } else { n / 2 - 1 };
                for pair in parts.chunks_exact(2).take(pairs) {
                    tags.insert(pair[0].to_string(), pair[1].to_string());
                }
            }
        }
        tags
    }
}

impl fmt::Display for NameTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameTransformer::Identity => f.write_str("identity"),
            NameTransformer::Categories { categories } => {
                write!(f, "categories:{}", categories.join(","))
            }
            NameTransformer::KeyValue => f.write_str("key-value"),
        }
    }
}

/// Parses `identity`, `key-value` or `categories:<c1>,<c2>,...`.
impl FromStr for NameTransformer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(list) = s.strip_prefix("categories:") {
            let categories: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            if categories.is_empty() {
                return Err("categories transformer needs at least one category".to_string());
            }
            return Ok(NameTransformer::Categories { categories });
        }
        match s.to_lowercase().as_str() {
            "identity" | "none" | "" => Ok(NameTransformer::Identity),
            "key-value" | "keyvalue" | "key_value" => Ok(NameTransformer::KeyValue),
            other => Err(format!(
                "unknown name transformer '{other}'. Valid values: identity, key-value, categories:<list>"
            )),
        }
    }
}

/// Naming rules applied to every record of a report.
#[derive(Debug, Clone, Default)]
pub struct Naming {
    prefix: Option<String>,
    base_tags: BTreeMap<String, String>,
    transformer: NameTransformer,
}

impl Naming {
    pub fn new(
        prefix: Option<String>,
        base_tags: BTreeMap<String, String>,
        transformer: NameTransformer,
    ) -> Self {
        let prefix = prefix
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Self {
            prefix,
            base_tags,
            transformer,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn base_tags(&self) -> &BTreeMap<String, String> {
        &self.base_tags
    }

    /// Measurement name and tags for `metric_name`. Tags extracted from the
    /// name override base tags with the same key.
    pub fn resolve(&self, metric_name: &str) -> (String, BTreeMap<String, String>) {
        let full_name = match &self.prefix {
            Some(prefix) => format!("{prefix}.{metric_name}"),
            None => metric_name.to_string(),
        };

        let mut tags = self.base_tags.clone();
        tags.extend(self.transformer.tags(&full_name));
        (self.transformer.measurement_name(&full_name), tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_pairs(tags: &BTreeMap<String, String>) -> Vec<(&str, &str)> {
        tags.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn test_categories_without_categories_is_identity() {
        let none = NameTransformer::categories(Vec::<String>::new());
        for name in ["metric", "a.metric", "a.metric.with.many.parts"] {
            assert_eq!(none.measurement_name(name), name);
            assert!(none.tags(name).is_empty());
        }
    }

    #[test]
    fn test_categories_extract_leading_parts() {
        let t = NameTransformer::categories(["server", "type"]);
        assert_eq!(t.measurement_name("actarus.prod.cpu_load"), "cpu_load");
        assert_eq!(
            tag_pairs(&t.tags("actarus.prod.cpu_load")),
            [("server", "actarus"), ("type", "prod")]
        );

        assert_eq!(
            t.measurement_name("actarus.prod.core_4.cpu_load"),
            "core_4.cpu_load"
        );
        assert_eq!(t.tags("actarus.prod.core_4.cpu_load").len(), 2);
    }

    #[test]
    fn test_more_categories_than_parts_keeps_last_part_as_name() {
        let t = NameTransformer::categories(["server", "type", "cores"]);
        assert_eq!(t.measurement_name("actarus.prod.cpu_load"), "cpu_load");
        let tags = t.tags("actarus.prod.cpu_load");
        assert_eq!(tags.len(), 2);
        assert!(!tags.contains_key("cores"));
    }

    #[test]
    fn test_key_value_pairs() {
        let t = NameTransformer::KeyValue;
        assert_eq!(t.measurement_name("cpu_load"), "cpu_load");
        assert!(t.tags("cpu_load").is_empty());

        assert_eq!(t.measurement_name("cores.cpu_load"), "cores.cpu_load");
        assert!(t.tags("cores.cpu_load").is_empty());

        assert_eq!(t.measurement_name("server.actarus.cpu_load"), "cpu_load");
        assert_eq!(
            tag_pairs(&t.tags("server.actarus.cpu_load")),
            [("server", "actarus")]
        );

        assert_eq!(
            t.measurement_name("server.actarus.cores.cpu_load"),
            "cores.cpu_load"
        );
        assert_eq!(t.tags("server.actarus.cores.cpu_load").len(), 1);
    }

    #[test]
    fn test_key_value_many_pairs() {
        let mut parts = Vec::new();
        for i in 0..10 {
            parts.push(format!("key{i}"));
            parts.push(format!("value{i}"));
        }
        parts.push("metric".to_string());
        let name = parts.join(".");

        assert_eq!(NameTransformer::KeyValue.tags(&name).len(), 10);
        assert_eq!(NameTransformer::KeyValue.measurement_name(&name), "metric");
    }

    #[test]
    fn test_parse_transformer() {
        assert_eq!("identity".parse(), Ok(NameTransformer::Identity));
        assert_eq!("Key-Value".parse(), Ok(NameTransformer::KeyValue));
        assert_eq!(
            "categories: server, type".parse(),
            Ok(NameTransformer::categories(["server", "type"]))
        );
        assert!("categories:".parse::<NameTransformer>().is_err());
        assert!("bogus".parse::<NameTransformer>().is_err());

        let t = NameTransformer::categories(["a", "b"]);
        assert_eq!(t.to_string().parse(), Ok(t));
    }

    #[test]
    fn test_naming_applies_prefix_and_tag_precedence() {
        let base = BTreeMap::from([
            ("server".to_string(), "default".to_string()),
            ("region".to_string(), "eu".to_string()),
        ]);
        let naming = Naming::new(
            Some(" app ".to_string()),
            base,
            NameTransformer::KeyValue,
        );

        let (name, tags) = naming.resolve("server.web1.requests");
        // "app.server.web1.requests" has an even number of parts
        assert_eq!(name, "web1.requests");
        assert_eq!(
            tag_pairs(&tags),
            [("app", "server"), ("region", "eu"), ("server", "default")]
        );

        let plain = Naming::new(Some("app".to_string()), BTreeMap::new(), NameTransformer::Identity);
        assert_eq!(plain.resolve("requests").0, "app.requests");
        assert_eq!(plain.prefix(), Some("app"));
    }
}
