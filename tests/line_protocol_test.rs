use influx_metrics_reporter::domain::{Measurement, TimeUnit};
use influx_metrics_reporter::protocol::{Encoder, LineProtocolEncoder};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn expected_escape(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        if matches!(c, ' ' | ',' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

proptest! {
    #[test]
    fn prop_name_metacharacters_are_escaped(name in "[a-z ,=]{1,24}") {
        let record = Measurement::builder(name.clone(), 1_000)
            .add_integer("value", 1)
            .build()
            .unwrap();

        let line = LineProtocolEncoder::default().encode(&record);
        let expected = format!("{} value=1i 1000", expected_escape(&name));
        prop_assert_eq!(line, expected);
    }

    #[test]
    fn prop_tag_order_does_not_change_output(
        tags in prop::collection::btree_map("[a-z]{1,8}", "[a-z ,]{1,8}", 0..8)
    ) {
        let forward = Measurement::builder("m", 42)
            .tags(tags.clone())
            .add_float("value", 1.5)
            .build()
            .unwrap();
        let reversed = Measurement::builder("m", 42)
            .tags(tags.into_iter().rev().collect::<Vec<_>>())
            .add_float("value", 1.5)
            .build()
            .unwrap();

        let encoder = LineProtocolEncoder::default();
        let first = encoder.encode(&forward);
        prop_assert_eq!(&first, &encoder.encode(&forward));
        prop_assert_eq!(first, encoder.encode(&reversed));
    }

    #[test]
    fn prop_batch_is_lines_in_order(count in 1usize..20) {
        let records: Vec<Measurement> = (0..count)
            .map(|i| {
                Measurement::builder(format!("m{i}"), i as i64)
                    .add_integer("value", i as i64)
                    .build()
                    .unwrap()
            })
            .collect();

        let payload = LineProtocolEncoder::default().encode_all(&records);
        prop_assert!(!payload.ends_with('\n'));
        let lines: Vec<&str> = payload.split('\n').collect();
        prop_assert_eq!(lines.len(), count);
        for (i, line) in lines.iter().enumerate() {
            let expected = format!("m{i} ");
            prop_assert!(line.starts_with(&expected));
        }
    }
}

#[test]
fn test_tag_value_with_space_is_escaped() {
    let record = Measurement::builder("heroes", 1_000)
        .tag("hero", "luke skywalker")
        .add_integer("value", 1)
        .build()
        .unwrap();

    let line = LineProtocolEncoder::default().encode(&record);
    assert!(line.contains("hero=luke\\ skywalker"), "{line}");
}

#[test]
fn test_string_field_is_quoted_not_escaped() {
    let record = Measurement::builder("notes", 1_000)
        .add_string("value", "do not, escape")
        .build()
        .unwrap();

    let line = LineProtocolEncoder::default().encode(&record);
    assert!(line.contains("value=\"do not, escape\""), "{line}");
}

#[test]
fn test_fields_and_tags_are_sorted() {
    let tags: BTreeMap<&str, &str> = [("zone", "b"), ("app", "a")].into_iter().collect();
    let record = Measurement::builder("m", 7)
        .tags(tags)
        .add_integer("z", 1)
        .add_boolean("a", true)
        .build()
        .unwrap();

    assert_eq!(
        LineProtocolEncoder::default().encode(&record),
        "m,app=a,zone=b a=true,z=1i 7"
    );
}

#[test]
fn test_precision_converts_timestamp() {
    let record = Measurement::builder("m", 1_500)
        .add_integer("value", 1)
        .build()
        .unwrap();

    let nanos = LineProtocolEncoder::new(TimeUnit::Nanoseconds).encode(&record);
    assert_eq!(nanos, "m value=1i 1500000000");
    let seconds = LineProtocolEncoder::new(TimeUnit::Seconds).encode(&record);
    assert_eq!(seconds, "m value=1i 1");
}
