use std::fmt;

/// A value that can be stored in a line-protocol field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit signed integer, written with an `i` suffix.
    Integer(i64),
    /// 64-bit floating point. Must be finite.
    Float(f64),
    /// Boolean value, written bare.
    Boolean(bool),
    /// UTF-8 string, written quoted.
    String(String),
}

impl FieldValue {
    /// Whether this value may appear on the wire. Non-finite floats may not.
    pub fn is_encodable(&self) -> bool {
        match self {
            FieldValue::Float(v) => v.is_finite(),
            _ => true,
        }
    }

    /// Format this value as a line-protocol token.
    ///
    /// - Integer: suffixed with `i` (e.g. `42i`)
    /// - Float: written as-is (e.g. `3.14`)
    /// - Boolean: `true` or `false`
    /// - String: quoted, inner quotes escaped (e.g. `"say \"hi\""`); spaces
    ///   and commas inside the quotes are left alone
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Integer(v) => format!("{v}i"),
            FieldValue::Float(v) => format!("{v}"),
            FieldValue::Boolean(v) => v.to_string(),
            FieldValue::String(v) => format!("\"{}\"", v.replace('"', "\\\"")),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line_protocol())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}
