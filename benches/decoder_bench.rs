//! Performance benchmarks for the frame decoder.
//!
//! The serial link tops out at 19200 baud (under 2 KB/s), so these numbers are
//! mostly a regression guard for the per-byte state machine.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench decoder_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use roofctl_protocol::{FrameDecoder, StatusMessage, StatusSnapshot};
use std::hint::black_box;

/// Build a capture of `count` status broadcasts with a little noise between.
fn create_capture(count: usize) -> Vec<u8> {
    let mut capture = Vec::with_capacity(count * 20);
    for i in 0..count {
        capture.extend_from_slice(format!("$0,{},0,0,0,12.3#\r\n", i % 4).as_bytes());
    }
    capture
}

/// Benchmark decoding a single broadcast byte by byte.
fn bench_feed_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("feed_single");
    group.throughput(Throughput::Elements(1));

    let frame = b"$0,1,0,0,0,12.3#";

    group.bench_function("feed_single_frame", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            for &byte in black_box(frame) {
                black_box(decoder.feed(byte));
            }
        });
    });

    group.finish();
}

/// Benchmark decoding captures of increasing size.
fn bench_feed_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("feed_capture");

    for count in [10, 100, 1000] {
        let capture = create_capture(count);
        group.throughput(Throughput::Bytes(capture.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &capture, |b, capture| {
            b.iter(|| {
                let mut decoder = FrameDecoder::new();
                black_box(decoder.feed_slice(black_box(capture)));
            });
        });
    }

    group.finish();
}

/// Benchmark validating and splitting a status body.
fn bench_parse_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_snapshot");
    group.throughput(Throughput::Elements(1));

    let message = StatusMessage::from("0,1,0,0,0,12.3");

    group.bench_function("parse_valid_body", |b| {
        b.iter(|| black_box(StatusSnapshot::parse(black_box(&message))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_feed_single,
    bench_feed_capture,
    bench_parse_snapshot
);
criterion_main!(benches);
