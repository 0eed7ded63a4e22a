//! Criterion benchmarks for the Edge-Infer binary codec.
//!
//! Measures encode/decode latency for representative frame sizes. The
//! codec runs once per request on the device, so it must stay negligible
//! next to the engine invocation itself.
//!
//! Run with:
//! ```bash
//! cargo bench --package infer-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use infer_core::{decode_response, encode_request, encode_response, ResponseFrame};

// ── Frame fixtures ────────────────────────────────────────────────────────────

fn make_response(score_count: usize) -> ResponseFrame {
    ResponseFrame {
        scores: (0..score_count).map(|i| i as f32 / score_count as f32).collect(),
        inference_time_us: 183_420,
    }
}

fn make_image_payload() -> Vec<u8> {
    // 28x28 float32 samples, the reference model's input.
    (0..784u32)
        .flat_map(|i| ((i % 255) as f32 / 255.0).to_le_bytes())
        .collect()
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode_request(c: &mut Criterion) {
    let payload = make_image_payload();
    c.bench_function("encode_request/784xf32", |b| {
        b.iter(|| encode_request(black_box(&payload)))
    });
}

fn bench_encode_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_response");
    for count in [0usize, 10, 1000] {
        let frame = make_response(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &frame, |b, frame| {
            b.iter(|| encode_response(black_box(frame)))
        });
    }
    group.finish();
}

fn bench_decode_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_response");
    for count in [10usize, 1000] {
        let bytes = encode_response(&make_response(count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            b.iter(|| decode_response(black_box(bytes)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_encode_request,
    bench_encode_response,
    bench_decode_response
);
criterion_main!(benches);
