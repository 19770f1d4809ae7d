//! InfluxDB line protocol encoder.
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp
//! ```
//!
//! Tags and fields come out sorted by key because `Measurement` stores them
//! in `BTreeMap`s, so encoding the same record twice is byte-identical.

use super::Encoder;
use super::escape::escape_key;
use crate::domain::{Measurement, TimeUnit};

#[derive(Debug, Clone, Copy)]
pub struct LineProtocolEncoder {
    precision: TimeUnit,
}

impl LineProtocolEncoder {
    /// Encoder writing timestamps in the given precision. Measurements carry
    /// epoch milliseconds and are converted on the way out.
    pub fn new(precision: TimeUnit) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> TimeUnit {
        self.precision
    }

    fn write_line(&self, measurement: &Measurement, line: &mut String) {
        debug_assert!(
            !measurement.fields().is_empty(),
            "line protocol requires at least one field"
        );

        line.push_str(&escape_key(measurement.name()));

        for (key, value) in measurement.tags() {
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        line.push(' ');

        for (i, (key, token)) in measurement.fields().iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.push_str(&escape_key(key));
            line.push('=');
            // tokens are rendered by FieldValue and must not be escaped again
            line.push_str(token);
        }

        line.push(' ');
        line.push_str(&self.precision.convert_millis(measurement.timestamp()).to_string());
    }
}

impl Default for LineProtocolEncoder {
    fn default() -> Self {
        Self::new(TimeUnit::Milliseconds)
    }
}

impl Encoder for LineProtocolEncoder {
    fn encode(&self, measurement: &Measurement) -> String {
        let mut line = String::with_capacity(64 + measurement.fields().len() * 24);
        self.write_line(measurement, &mut line);
        line
    }
}
