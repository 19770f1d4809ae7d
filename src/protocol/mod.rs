//! Wire encoding of measurements.

pub mod escape;
pub mod line;

pub use escape::{escape, escape_key};
pub use line::LineProtocolEncoder;

use crate::domain::Measurement;

/// Turns measurements into the text a transport ships.
pub trait Encoder: Send + Sync {
    /// Encode one measurement as a single line.
    fn encode(&self, measurement: &Measurement) -> String;

    /// Encode many measurements, one per line, joined with `\n` and in
    /// input order. No trailing newline.
    fn encode_all(&self, measurements: &[Measurement]) -> String {
        let mut out = String::with_capacity(measurements.len() * 128);
        for (i, measurement) in measurements.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&self.encode(measurement));
        }
        out
    }
}
