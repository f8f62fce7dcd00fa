//! Criterion benchmarks for the gridwalk binary codec.
//!
//! Measures encoding and decoding latency for all message types. STATE is the
//! hot path: one frame per walk step.
//!
//! Run with:
//! ```bash
//! cargo bench --package gridwalk-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridwalk_core::domain::params::SimulationParameters;
use gridwalk_core::protocol::codec::{decode_message, encode_message};
use gridwalk_core::protocol::messages::{StateUpdate, WalkMessage};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_hello() -> WalkMessage {
    WalkMessage::Hello("benchmark-client".to_string())
}

fn make_start() -> WalkMessage {
    WalkMessage::Start(SimulationParameters {
        width: 10,
        height: 10,
        k_max: 200,
        reps: 5,
        seed: 42,
        p_up: 25,
        p_down: 25,
        p_left: 25,
        p_right: 25,
    })
}

fn make_state() -> WalkMessage {
    WalkMessage::State(StateUpdate {
        x: 4,
        y: 9,
        step: 137,
        rep: 3,
        reps_total: 5,
    })
}

fn fixtures() -> Vec<(&'static str, WalkMessage)> {
    vec![
        ("Hello", make_hello()),
        ("HelloAck", WalkMessage::HelloAck),
        ("Start", make_start()),
        ("State", make_state()),
        ("Done", WalkMessage::Done),
        ("Quit", WalkMessage::Quit),
    ]
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks `encode_message` for every message type.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_message");
    for (name, msg) in fixtures() {
        group.bench_with_input(BenchmarkId::new("msg", name), &msg, |b, msg| {
            b.iter(|| encode_message(black_box(msg)))
        });
    }
    group.finish();
}

/// Benchmarks `decode_message` for every message type from pre-encoded bytes.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_message");
    for (name, msg) in fixtures() {
        let bytes = encode_message(&msg);
        group.bench_with_input(BenchmarkId::new("msg", name), &bytes, |b, bytes| {
            b.iter(|| decode_message(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Benchmarks a full encode+decode round-trip for STATE, the per-step frame.
fn bench_roundtrip_hot_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_decode_roundtrip");

    let state_msg = make_state();
    group.bench_function("State", |b| {
        b.iter(|| {
            let bytes = encode_message(black_box(&state_msg));
            decode_message(black_box(&bytes)).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_roundtrip_hot_path);
criterion_main!(benches);
