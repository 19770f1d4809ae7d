//! Turns instrument readings into measurement records.
//!
//! One function per instrument kind, dispatched by [`transform`]. Each
//! returns `Ok(None)` when the instrument has nothing to report this cycle
//! (idle, or a gauge without a usable value).

pub mod adapter;
pub mod idle;
pub mod naming;

pub use adapter::{RecordAdapter, RelativeCounterAdapter};
pub use idle::IdleTracker;
pub use naming::{NameTransformer, Naming};

use crate::domain::{Measurement, MeasurementBuilder, MeasurementError, TimeUnit};
use crate::instruments::{
    Counter, Gauge, GaugeError, GaugeValue, Histogram, Instrument, Meter, Snapshot, Timer,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Gauge '{name}' could not be read: {source}")]
    Gauge {
        name: String,
        #[source]
        source: GaugeError,
    },

    #[error("Invalid measurement: {0}")]
    Measurement(#[from] MeasurementError),
}

/// Everything a transform needs besides the instrument itself.
#[derive(Clone)]
pub struct TransformContext {
    rate_factor: f64,
    duration_nanos: f64,
    skip_idle: bool,
    naming: Naming,
    adapters: Vec<Arc<dyn RecordAdapter>>,
}

impl TransformContext {
    pub fn new(rate_unit: TimeUnit, duration_unit: TimeUnit, skip_idle: bool, naming: Naming) -> Self {
        Self {
            rate_factor: rate_unit.rate_factor(),
            duration_nanos: duration_unit.as_nanos() as f64,
            skip_idle,
            naming,
            adapters: Vec::new(),
        }
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn RecordAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn skip_idle(&self) -> bool {
        self.skip_idle
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    /// Lets every adapter drop state kept for instruments `live` rejects.
    pub fn retain_adapter_state(&self, live: &dyn Fn(&str) -> bool) {
        for adapter in &self.adapters {
            adapter.retain(live);
        }
    }

    fn convert_rate(&self, per_second: f64) -> f64 {
        per_second * self.rate_factor
    }

    fn convert_duration(&self, nanos: f64) -> f64 {
        nanos / self.duration_nanos
    }

    /// `true` when the instrument should be skipped. Only tracks counts
    /// while idle skipping is enabled.
    fn is_idle(&self, idle: &mut IdleTracker, name: &str, count: i64) -> bool {
        self.skip_idle && idle.check_idle(name, count)
    }

    fn start(&self, name: &str, timestamp: i64) -> MeasurementBuilder {
        let (measurement, tags) = self.naming.resolve(name);
        Measurement::builder(measurement, timestamp).tags(tags)
    }

    fn finish(
        &self,
        name: &str,
        instrument: &Instrument,
        builder: MeasurementBuilder,
    ) -> Result<Option<Measurement>, TransformError> {
        let builder = self
            .adapters
            .iter()
            .fold(builder, |b, adapter| adapter.adapt(name, instrument, b));
        Ok(Some(builder.build()?))
    }
}

impl Default for TransformContext {
    fn default() -> Self {
        Self::new(TimeUnit::Seconds, TimeUnit::Milliseconds, false, Naming::default())
    }
}

impl fmt::Debug for TransformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformContext")
            .field("rate_factor", &self.rate_factor)
            .field("duration_nanos", &self.duration_nanos)
            .field("skip_idle", &self.skip_idle)
            .field("naming", &self.naming)
            .field("adapters", &self.adapters.len())
            .finish()
    }
}

pub fn transform(
    ctx: &TransformContext,
    idle: &mut IdleTracker,
    name: &str,
    instrument: &Instrument,
    timestamp: i64,
) -> Result<Option<Measurement>, TransformError> {
    let builder = match instrument {
        Instrument::Counter(counter) => transform_counter(ctx, idle, name, counter, timestamp),
        Instrument::Gauge(gauge) => transform_gauge(ctx, name, gauge, timestamp)?,
        Instrument::Histogram(histogram) => {
            transform_histogram(ctx, idle, name, histogram, timestamp)
        }
        Instrument::Meter(meter) => transform_meter(ctx, idle, name, meter, timestamp),
        Instrument::Timer(timer) => Some(transform_timer(ctx, idle, name, timer, timestamp)),
    };

    match builder {
        Some(builder) => ctx.finish(name, instrument, builder),
        None => Ok(None),
    }
}

fn transform_counter(
    ctx: &TransformContext,
    idle: &mut IdleTracker,
    name: &str,
    counter: &Counter,
    timestamp: i64,
) -> Option<MeasurementBuilder> {
    let count = counter.count();
    if ctx.is_idle(idle, name, count) {
        trace!(metric = name, "Skipping idle counter");
        return None;
    }
    Some(ctx.start(name, timestamp).add_integer("count", count))
}

fn transform_gauge(
    ctx: &TransformContext,
    name: &str,
    gauge: &Gauge,
    timestamp: i64,
) -> Result<Option<MeasurementBuilder>, TransformError> {
    let value = gauge.value().map_err(|source| TransformError::Gauge {
        name: name.to_string(),
        source,
    })?;

    let builder = ctx.start(name, timestamp);
    let builder = match value {
        GaugeValue::Integer(v) => builder.add_integer("value", v),
        GaugeValue::Float(v) if v.is_finite() => builder.add_float("value", v),
        GaugeValue::Boolean(v) => builder.add_boolean("value", v),
        GaugeValue::Text(v) => builder.add_string("value", v),
        GaugeValue::Float(_) | GaugeValue::Null => {
            trace!(metric = name, "Dropping gauge without a finite value");
            return Ok(None);
        }
    };
    Ok(Some(builder))
}

fn transform_histogram(
    ctx: &TransformContext,
    idle: &mut IdleTracker,
    name: &str,
    histogram: &Histogram,
    timestamp: i64,
) -> Option<MeasurementBuilder> {
    let run_count = histogram.count();
    if ctx.is_idle(idle, name, clamp_count(run_count)) {
        trace!(metric = name, "Skipping idle histogram");
        return None;
    }

    let snapshot = histogram.snapshot();
    let builder = ctx
        .start(name, timestamp)
        .field("count", snapshot.size() as u64)
        .add_integer("min", snapshot.min())
        .add_integer("max", snapshot.max())
        .add_float("mean", snapshot.mean())
        .add_float("std-dev", snapshot.std_dev());
    Some(add_percentiles(builder, &snapshot, |v| v).field("run-count", run_count))
}

fn transform_meter(
    ctx: &TransformContext,
    idle: &mut IdleTracker,
    name: &str,
    meter: &Meter,
    timestamp: i64,
) -> Option<MeasurementBuilder> {
    let count = meter.count();
    if ctx.is_idle(idle, name, clamp_count(count)) {
        trace!(metric = name, "Skipping idle meter");
        return None;
    }

    Some(
        ctx.start(name, timestamp)
            .field("count", count)
            .add_float("one-minute", ctx.convert_rate(meter.one_minute_rate()))
            .add_float("five-minute", ctx.convert_rate(meter.five_minute_rate()))
            .add_float("fifteen-minute", ctx.convert_rate(meter.fifteen_minute_rate()))
            .add_float("mean-minute", ctx.convert_rate(meter.mean_rate())),
    )
}

/// Timers are never skipped as a whole: when idle only the snapshot fields
/// are left out.
fn transform_timer(
    ctx: &TransformContext,
    idle: &mut IdleTracker,
    name: &str,
    timer: &Timer,
    timestamp: i64,
) -> MeasurementBuilder {
    let run_count = timer.count();
    let mut builder = ctx.start(name, timestamp);

    if ctx.is_idle(idle, name, clamp_count(run_count)) {
        trace!(metric = name, "Omitting snapshot of idle timer");
    } else {
        let snapshot = timer.snapshot();
        let duration = |nanos: f64| ctx.convert_duration(nanos);
        builder = builder
            .field("count", snapshot.size() as u64)
            .add_float("min", duration(snapshot.min() as f64))
            .add_float("max", duration(snapshot.max() as f64))
            .add_float("mean", duration(snapshot.mean()))
            .add_float("std-dev", duration(snapshot.std_dev()));
        builder = add_percentiles(builder, &snapshot, duration);
    }

    builder
        .add_float("one-minute", ctx.convert_rate(timer.one_minute_rate()))
        .add_float("five-minute", ctx.convert_rate(timer.five_minute_rate()))
        .add_float("fifteen-minute", ctx.convert_rate(timer.fifteen_minute_rate()))
        .add_float("mean-minute", ctx.convert_rate(timer.mean_rate()))
        .field("run-count", run_count)
}

fn add_percentiles<F>(builder: MeasurementBuilder, snapshot: &Snapshot, convert: F) -> MeasurementBuilder
where
    F: Fn(f64) -> f64,
{
    builder
        .add_float("50-percentile", convert(snapshot.median()))
        .add_float("75-percentile", convert(snapshot.p75()))
        .add_float("95-percentile", convert(snapshot.p95()))
        .add_float("99-percentile", convert(snapshot.p99()))
        .add_float("999-percentile", convert(snapshot.p999()))
}

fn clamp_count(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}
