use std::fmt;
use thiserror::Error;

/// The value a gauge reports at one instant.
#[derive(Debug, Clone, PartialEq)]
pub enum GaugeValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Fallback for values without a numeric form.
    Text(String),
    /// The gauge has nothing to report right now.
    Null,
}

macro_rules! gauge_value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for GaugeValue {
            fn from(v: $t) -> Self {
                GaugeValue::Integer(i64::from(v))
            }
        })*
    };
}

gauge_value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for GaugeValue {
    fn from(v: u64) -> Self {
        GaugeValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for GaugeValue {
    fn from(v: usize) -> Self {
        GaugeValue::Integer(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for GaugeValue {
    fn from(v: f64) -> Self {
        GaugeValue::Float(v)
    }
}

impl From<f32> for GaugeValue {
    fn from(v: f32) -> Self {
        GaugeValue::Float(f64::from(v))
    }
}

impl From<bool> for GaugeValue {
    fn from(v: bool) -> Self {
        GaugeValue::Boolean(v)
    }
}

impl From<String> for GaugeValue {
    fn from(v: String) -> Self {
        GaugeValue::Text(v)
    }
}

impl From<&str> for GaugeValue {
    fn from(v: &str) -> Self {
        GaugeValue::Text(v.to_string())
    }
}

impl<T: Into<GaugeValue>> From<Option<T>> for GaugeValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(GaugeValue::Null, Into::into)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("gauge read failed: {0}")]
pub struct GaugeError(pub String);

type Supplier = Box<dyn Fn() -> Result<GaugeValue, GaugeError> + Send + Sync>;

/// An instantaneous reading computed on demand by a user supplied closure.
pub struct Gauge {
    supplier: Supplier,
}

impl Gauge {
    pub fn new<F, V>(read: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<GaugeValue>,
    {
        Self {
            supplier: Box::new(move || Ok(read().into())),
        }
    }

    /// Gauge whose read may fail, e.g. when it samples an external source.
    pub fn fallible<F>(read: F) -> Self
    where
        F: Fn() -> Result<GaugeValue, GaugeError> + Send + Sync + 'static,
    {
        Self {
            supplier: Box::new(read),
        }
    }

    pub fn value(&self) -> Result<GaugeValue, GaugeError> {
        (self.supplier)()
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    #[test]
    fn test_gauge_reads_live_value() {
        let source = Arc::new(AtomicI64::new(1));
        let reader = Arc::clone(&source);
        let gauge = Gauge::new(move || reader.load(Ordering::Relaxed));

        assert_eq!(gauge.value(), Ok(GaugeValue::Integer(1)));
        source.store(7, Ordering::Relaxed);
        assert_eq!(gauge.value(), Ok(GaugeValue::Integer(7)));
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(GaugeValue::from(2.5f32), GaugeValue::Float(2.5));
        assert_eq!(GaugeValue::from("up"), GaugeValue::Text("up".to_string()));
        assert_eq!(GaugeValue::from(None::<i64>), GaugeValue::Null);
        assert_eq!(GaugeValue::from(Some(3u32)), GaugeValue::Integer(3));
        assert_eq!(GaugeValue::from(u64::MAX), GaugeValue::Integer(i64::MAX));
    }

    #[test]
    fn test_fallible_gauge() {
        let gauge = Gauge::fallible(|| Err(GaugeError("sensor offline".to_string())));
        assert!(gauge.value().is_err());
    }
}
