use influx_metrics_reporter::buffer::BoundedBatchQueue;
use influx_metrics_reporter::instruments::{Gauge, GaugeValue, ManualClock, MetricFilter, MetricRegistry};
use influx_metrics_reporter::reporter::{ReportCycle, ReporterConfig};
use influx_metrics_reporter::sender::{FlushOutcome, MemoryTransport};
use influx_metrics_reporter::transform::{NameTransformer, RelativeCounterAdapter};
use std::sync::Arc;
use std::time::Duration;

fn cycle_with(
    registry: &Arc<MetricRegistry>,
    config: &ReporterConfig,
) -> (MemoryTransport, ReportCycle<MemoryTransport>) {
    let transport = MemoryTransport::new();
    let cycle = ReportCycle::new(Arc::clone(registry), config, transport.clone()).unwrap();
    (transport, cycle)
}

/// Field keys of one encoded line. Only valid for lines without escapes.
fn field_keys(line: &str) -> Vec<&str> {
    let fields = line.split(' ').nth(1).unwrap_or_default();
    fields
        .split(',')
        .filter_map(|field| field.split_once('=').map(|(key, _)| key))
        .collect()
}

fn line_for<'a>(payload: &'a str, measurement: &str) -> &'a str {
    payload
        .lines()
        .find(|line| line.split([' ', ',']).next() == Some(measurement))
        .unwrap_or_else(|| panic!("no line for {measurement} in {payload}"))
}

#[tokio::test]
async fn test_counter_end_to_end() {
    let registry = Arc::new(MetricRegistry::new());
    registry.counter("c").unwrap().inc();
    let (transport, mut cycle) = cycle_with(&registry, &ReporterConfig::default());

    let report = cycle.report().await;
    assert!(matches!(report.flush, Some(FlushOutcome::Sent { records: 1, .. })));

    let payloads = transport.payloads();
    assert_eq!(payloads.len(), 1);
    let lines: Vec<&str> = payloads[0].lines().collect();
    assert_eq!(lines.len(), 1);

    let line = lines[0];
    assert!(line.starts_with('c'));
    assert!(line.contains("count=1i"));
    let timestamp = line.rsplit(' ').next().unwrap();
    assert!(timestamp.parse::<i64>().is_ok(), "{line}");
}

#[tokio::test]
async fn test_counter_reports_literal_count() {
    let registry = Arc::new(MetricRegistry::new());
    registry.counter("requests").unwrap().inc_by(1234);
    let (transport, mut cycle) = cycle_with(&registry, &ReporterConfig::default());

    cycle.report().await;
    assert!(transport.payloads()[0].contains("count=1234i"));
}

#[tokio::test]
async fn test_timer_end_to_end() {
    let registry = Arc::new(MetricRegistry::new());
    registry
        .timer("db.query")
        .unwrap()
        .update(Duration::from_millis(20));
    let (transport, mut cycle) = cycle_with(&registry, &ReporterConfig::default());

    cycle.report().await;
    let payloads = transport.payloads();
    let line = line_for(&payloads[0], "db.query");
    let keys = field_keys(line);

    for key in [
        "count",
        "min",
        "max",
        "mean",
        "std-dev",
        "50-percentile",
        "one-minute",
        "five-minute",
        "fifteen-minute",
        "mean-minute",
        "run-count",
    ] {
        assert!(keys.contains(&key), "missing {key} in {line}");
    }
    assert!(line.contains("min=20,"), "{line}");
    assert!(line.contains("run-count=1i"), "{line}");
}

#[tokio::test]
async fn test_idle_timer_omits_snapshot_fields() {
    let registry = Arc::new(MetricRegistry::new());
    registry
        .timer("db.query")
        .unwrap()
        .update(Duration::from_millis(20));
    let config = ReporterConfig::builder().skip_idle(true).build().unwrap();
    let (transport, mut cycle) = cycle_with(&registry, &config);

    cycle.report().await;
    cycle.report().await;

    let payloads = transport.payloads();
    assert_eq!(payloads.len(), 2);
    let keys = field_keys(line_for(&payloads[1], "db.query"));

    for key in ["count", "min", "max", "mean", "std-dev", "50-percentile", "99-percentile"] {
        assert!(!keys.contains(&key), "{key} should be omitted: {keys:?}");
    }
    for key in ["one-minute", "five-minute", "fifteen-minute", "mean-minute", "run-count"] {
        assert!(keys.contains(&key), "{key} should be kept: {keys:?}");
    }
}

#[tokio::test]
async fn test_idle_counter_is_skipped_until_it_changes() {
    let registry = Arc::new(MetricRegistry::new());
    let counter = registry.counter("jobs").unwrap();
    counter.inc();
    let config = ReporterConfig::builder().skip_idle(true).build().unwrap();
    let (transport, mut cycle) = cycle_with(&registry, &config);

    assert_eq!(cycle.report().await.produced, 1);
    let idle = cycle.report().await;
    assert_eq!(idle.produced, 0);
    assert_eq!(idle.skipped, 1);
    assert!(matches!(idle.flush, Some(FlushOutcome::Empty)));

    counter.inc();
    assert_eq!(cycle.report().await.produced, 1);
    assert_eq!(transport.payloads().len(), 2);
}

#[tokio::test]
async fn test_idle_meter_is_skipped_until_marked() {
    let registry = Arc::new(MetricRegistry::new());
    let meter = registry.meter("logins").unwrap();
    meter.mark();
    let config = ReporterConfig::builder().skip_idle(true).build().unwrap();
    let (transport, mut cycle) = cycle_with(&registry, &config);

    assert_eq!(cycle.report().await.produced, 1);
    let idle = cycle.report().await;
    assert_eq!(idle.produced, 0);
    assert_eq!(idle.skipped, 1);

    meter.mark_n(2);
    assert_eq!(cycle.report().await.produced, 1);

    let payloads = transport.payloads();
    assert_eq!(payloads.len(), 2);
    assert!(line_for(&payloads[1], "logins").contains("count=3i"));
}

#[tokio::test]
async fn test_idle_histogram_is_skipped_as_a_whole() {
    let registry = Arc::new(MetricRegistry::new());
    let histogram = registry.histogram("payload.size").unwrap();
    histogram.update(512);
    let config = ReporterConfig::builder().skip_idle(true).build().unwrap();
    let (transport, mut cycle) = cycle_with(&registry, &config);

    assert_eq!(cycle.report().await.produced, 1);
    let idle = cycle.report().await;
    assert_eq!(idle.produced, 0);
    assert_eq!(idle.skipped, 1);
    assert!(matches!(idle.flush, Some(FlushOutcome::Empty)));

    histogram.update(1_024);
    assert_eq!(cycle.report().await.produced, 1);

    let payloads = transport.payloads();
    assert_eq!(payloads.len(), 2);
    let keys = field_keys(line_for(&payloads[1], "payload.size"));
    assert!(keys.contains(&"max"), "{keys:?}");
    assert!(keys.contains(&"run-count"), "{keys:?}");
}

#[tokio::test]
async fn test_gauges_without_finite_value_produce_nothing() {
    let registry = Arc::new(MetricRegistry::new());
    registry.register_gauge("nan.double", Gauge::new(|| f64::NAN)).unwrap();
    registry.register_gauge("nan.float", Gauge::new(|| f32::NAN)).unwrap();
    registry
        .register_gauge("infinite", Gauge::new(|| f64::INFINITY))
        .unwrap();
    registry
        .register_gauge("null", Gauge::new(|| GaugeValue::Null))
        .unwrap();
    registry
        .register_gauge("missing", Gauge::new(|| Option::<f64>::None))
        .unwrap();
    let (transport, mut cycle) = cycle_with(&registry, &ReporterConfig::default());

    let report = cycle.report().await;
    assert_eq!(report.instruments, 5);
    assert_eq!(report.produced, 0);
    assert_eq!(report.skipped, 5);
    assert_eq!(cycle.sender().pending(), 0);
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_gauge_value_types() {
    let registry = Arc::new(MetricRegistry::new());
    registry.register_gauge("g.int", Gauge::new(|| 7)).unwrap();
    registry.register_gauge("g.float", Gauge::new(|| 0.5)).unwrap();
    registry.register_gauge("g.bool", Gauge::new(|| true)).unwrap();
    registry.register_gauge("g.text", Gauge::new(|| "up")).unwrap();
    let (transport, mut cycle) = cycle_with(&registry, &ReporterConfig::default());

    cycle.report().await;
    let payloads = transport.payloads();
    assert!(line_for(&payloads[0], "g.int").contains("value=7i"));
    assert!(line_for(&payloads[0], "g.float").contains("value=0.5"));
    assert!(line_for(&payloads[0], "g.bool").contains("value=true"));
    assert!(line_for(&payloads[0], "g.text").contains("value=\"up\""));
}

#[test]
fn test_queue_keeps_most_recent_records() {
    let capacity = 4;
    let extra = 3;
    let mut queue = BoundedBatchQueue::new(capacity).unwrap();
    for i in 0..capacity + extra {
        queue.offer(i);
    }

    assert_eq!(queue.len(), capacity);
    assert_eq!(queue.evicted(), extra as u64);
    assert_eq!(queue.drain(), vec![3, 4, 5, 6]);
}

#[tokio::test]
async fn test_failed_flush_is_retried_with_next_cycle() {
    let clock = Arc::new(ManualClock::new(1_000));
    let registry = Arc::new(MetricRegistry::with_clock(clock.clone()));
    registry.counter("c").unwrap().inc();
    let (transport, mut cycle) = cycle_with(&registry, &ReporterConfig::default());

    transport.set_failing(true);
    let report = cycle.report().await;
    assert!(matches!(report.flush, Some(FlushOutcome::Retained { records: 1, .. })));

    transport.set_failing(false);
    clock.advance(Duration::from_secs(10));
    cycle.report().await;

    assert_eq!(
        transport.payloads(),
        ["c count=1i 1000\nc count=1i 11000"]
    );
    let stats = cycle.stats();
    assert_eq!(stats.flushes_failed, 1);
    assert_eq!(stats.flushes_succeeded, 1);
    assert_eq!(stats.records_sent, 2);
}

#[tokio::test]
async fn test_queue_overflow_drops_oldest_records() {
    let clock = Arc::new(ManualClock::new(0));
    let registry = Arc::new(MetricRegistry::with_clock(clock.clone()));
    registry.counter("a").unwrap().inc();
    registry.counter("b").unwrap().inc();
    let config = ReporterConfig::builder().queue_capacity(3).build().unwrap();
    let (transport, mut cycle) = cycle_with(&registry, &config);

    transport.set_failing(true);
    cycle.report().await;
    clock.advance(Duration::from_millis(5));
    transport.set_failing(false);
    cycle.report().await;

    assert_eq!(
        transport.payloads(),
        ["b count=1i 0\na count=1i 5\nb count=1i 5"]
    );
    assert_eq!(cycle.stats().records_evicted, 1);
}

#[tokio::test]
async fn test_naming_tags_and_filter() {
    let registry = Arc::new(MetricRegistry::new());
    registry.counter("actarus.prod.cpu_load").unwrap().inc();
    registry.counter("internal.noise").unwrap().inc();
    let config = ReporterConfig::builder()
        .prefix("app")
        .tag("region", "eu")
        .name_transformer(NameTransformer::categories(["service", "server", "env"]))
        .filter(MetricFilter::Prefix("actarus.".to_string()))
        .build()
        .unwrap();
    let (transport, mut cycle) = cycle_with(&registry, &config);

    let report = cycle.report().await;
    assert_eq!(report.instruments, 1);

    let payload = &transport.payloads()[0];
    assert!(
        payload.starts_with("cpu_load,env=prod,region=eu,server=actarus,service=app count=1i "),
        "{payload}"
    );
}

#[tokio::test]
async fn test_relative_counter_adapter() {
    let registry = Arc::new(MetricRegistry::new());
    let counter = registry.counter("c").unwrap();
    counter.inc_by(5);
    let transport = MemoryTransport::new();
    let mut cycle = ReportCycle::new(
        Arc::clone(&registry),
        &ReporterConfig::default(),
        transport.clone(),
    )
    .unwrap()
    .with_adapter(Arc::new(RelativeCounterAdapter::new()));

    cycle.report().await;
    counter.inc_by(3);
    cycle.report().await;

    let payloads = transport.payloads();
    assert!(payloads[0].contains("count=5i,relativeCount=5i"), "{}", payloads[0]);
    assert!(payloads[1].contains("count=8i,relativeCount=3i"), "{}", payloads[1]);
}
