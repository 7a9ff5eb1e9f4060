//! Pipeline benchmark: line parse → feature derivation (sensor-host target).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowwatch::artifacts::LabelEncoder;
use flowwatch::config::FeatureConfig;
use flowwatch::features::{FeatureDeriver, FourthSlot};
use flowwatch::tailer::FlowEvent;

fn make_lines(n: usize) -> Vec<String> {
    let ports = [80u16, 22, 443, 53, 25];
    (0..n)
        .map(|i| {
            serde_json::json!({
                "timestamp": "2026-08-20T10:00:00.000000+0000",
                "event_type": "flow",
                "src_ip": format!("10.0.{}.{}", i % 4, i % 200),
                "dest_port": ports[i % ports.len()],
                "proto": "TCP",
                "flow": {
                    "bytes_toserver": 512 + (i as u64 % 4096),
                    "bytes_toclient": 2048,
                    "state": "established",
                    "reason": "shutdown"
                },
                "tcp": {"syn": true, "ack": true}
            })
            .to_string()
        })
        .collect()
}

fn make_deriver(fourth_slot: FourthSlot) -> FeatureDeriver {
    let service_encoder = LabelEncoder {
        classes: vec![
            "domain".into(),
            "ecr_i".into(),
            "http".into(),
            "http_443".into(),
            "other".into(),
            "smtp".into(),
            "ssh".into(),
        ],
    };
    let flag_encoder = LabelEncoder {
        classes: vec![
            "OTH".into(),
            "REJ".into(),
            "S0".into(),
            "S1".into(),
            "SF".into(),
        ],
    };
    let config = FeatureConfig {
        fourth_slot,
        ..FeatureConfig::default()
    };
    FeatureDeriver::new(config, service_encoder, flag_encoder).unwrap()
}

fn bench_line_parse(c: &mut Criterion) {
    let lines = make_lines(256);
    let mut i = 0;

    c.bench_function("eve_line_parse", |b| {
        b.iter(|| {
            let line = &lines[i % lines.len()];
            i += 1;
            black_box(FlowEvent::parse(black_box(line)).unwrap())
        })
    });
}

fn bench_feature_derive(c: &mut Criterion) {
    let events: Vec<FlowEvent> = make_lines(256)
        .iter()
        .map(|line| FlowEvent::parse(line).unwrap())
        .collect();
    let mut deriver = make_deriver(FourthSlot::DistinctPorts);
    let mut i = 0;

    c.bench_function("feature_derive", |b| {
        b.iter(|| {
            let event = &events[i % events.len()];
            i += 1;
            black_box(deriver.derive(black_box(event)).unwrap())
        })
    });
}

fn bench_line_to_item(c: &mut Criterion) {
    let lines = make_lines(256);
    let mut deriver = make_deriver(FourthSlot::DestBytes);
    let mut i = 0;

    c.bench_function("line_to_batch_item", |b| {
        b.iter(|| {
            let line = &lines[i % lines.len()];
            i += 1;
            let event = FlowEvent::parse(black_box(line)).unwrap();
            black_box(deriver.derive(&event).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_line_parse,
    bench_feature_derive,
    bench_line_to_item
);
criterion_main!(benches);
