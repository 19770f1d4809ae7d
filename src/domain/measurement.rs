use super::error::MeasurementError;
use super::field::FieldValue;
use std::collections::BTreeMap;

/// A normalized, immutable snapshot of one instrument at one point in time.
///
/// Tags and fields are kept in `BTreeMap`s so iteration is always in
/// byte-lexical key order, which is what the line protocol wants. Field
/// values are stored as already rendered wire tokens (`42i`, `1.5`,
/// `true`, `"text"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    name: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, String>,
    timestamp: i64,
}

impl Measurement {
    pub fn builder(name: impl Into<String>, timestamp: i64) -> MeasurementBuilder {
        MeasurementBuilder::new(name, timestamp)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Rendered token for `key`, if the field is present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Epoch milliseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Accumulates tags and fields for a [`Measurement`].
///
/// `build` refuses records without a name or without fields, so a zero-field
/// record never reaches the encoder.
#[derive(Debug, Clone)]
pub struct MeasurementBuilder {
    name: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, String>,
    timestamp: i64,
}

impl MeasurementBuilder {
    pub fn new(name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a field of any type. Non-finite floats are silently omitted.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        if value.is_encodable() {
            self.fields.insert(key.into(), value.to_line_protocol());
        }
        self
    }

    pub fn add_integer(self, key: impl Into<String>, value: i64) -> Self {
        self.field(key, FieldValue::Integer(value))
    }

    pub fn add_float(self, key: impl Into<String>, value: f64) -> Self {
        self.field(key, FieldValue::Float(value))
    }

    pub fn add_boolean(self, key: impl Into<String>, value: bool) -> Self {
        self.field(key, FieldValue::Boolean(value))
    }

    pub fn add_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(key, FieldValue::String(value.into()))
    }

    pub fn build(self) -> Result<Measurement, MeasurementError> {
        if self.name.is_empty() {
            return Err(MeasurementError::EmptyName);
        }
        if self.fields.is_empty() {
            return Err(MeasurementError::NoFields { name: self.name });
        }

        Ok(Measurement {
            name: self.name,
            tags: self.tags,
            fields: self.fields,
            timestamp: self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_renders_tokens() {
        let m = Measurement::builder("cpu", 1_000)
            .tag("host", "a")
            .add_integer("count", 3)
            .add_float("load", 0.25)
            .add_boolean("up", true)
            .add_string("state", "ok")
            .build()
            .unwrap();

        assert_eq!(m.name(), "cpu");
        assert_eq!(m.timestamp(), 1_000);
        assert_eq!(m.field("count"), Some("3i"));
        assert_eq!(m.field("load"), Some("0.25"));
        assert_eq!(m.field("up"), Some("true"));
        assert_eq!(m.field("state"), Some("\"ok\""));
        assert_eq!(m.tags().get("host").map(String::as_str), Some("a"));
    }

    #[test]
    fn test_non_finite_float_is_omitted() {
        let m = Measurement::builder("m", 0)
            .add_integer("count", 1)
            .add_float("mean", f64::NAN)
            .add_float("max", f64::INFINITY)
            .build()
            .unwrap();

        assert_eq!(m.fields().len(), 1);
        assert!(m.field("mean").is_none());
        assert!(m.field("max").is_none());
    }

    #[test]
    fn test_zero_fields_rejected() {
        let err = Measurement::builder("empty", 0).build().unwrap_err();
        assert_eq!(
            err,
            MeasurementError::NoFields {
                name: "empty".to_string()
            }
        );

        let err = Measurement::builder("nan", 0)
            .add_float("value", f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, MeasurementError::NoFields { .. }));
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Measurement::builder("", 0)
            .add_integer("count", 1)
            .build()
            .unwrap_err();
        assert_eq!(err, MeasurementError::EmptyName);
    }

    #[test]
    fn test_later_tag_overrides_earlier() {
        let m = Measurement::builder("m", 0)
            .tag("env", "base")
            .tags([("env", "override")])
            .add_integer("count", 1)
            .build()
            .unwrap();
        assert_eq!(m.tags().get("env").map(String::as_str), Some("override"));
    }
}
