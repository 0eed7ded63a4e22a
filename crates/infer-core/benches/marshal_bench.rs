//! Criterion benchmarks for the quantization marshalling layer.
//!
//! The quantizing ingest path touches every input sample once per request,
//! so its per-element cost multiplies by the input size (784 samples for
//! the reference model, far more for larger vision models).
//!
//! Run with:
//! ```bash
//! cargo bench --package infer-core --bench marshal_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use infer_core::{dequantize, filter_scores, quantize, ElementType, Quantization, Tensor};

const SCALE: f32 = 1.0 / 255.0;
const ZERO_POINT: i32 = -128;

fn make_samples(count: usize) -> Vec<f32> {
    (0..count).map(|i| (i % 255) as f32 / 255.0).collect()
}

fn make_quantized_tensor(count: usize) -> Tensor {
    let mut t = Tensor::new(
        ElementType::Int8,
        count,
        Quantization::Affine {
            scale: SCALE,
            zero_point: ZERO_POINT,
        },
    );
    for (dst, v) in t.bytes_mut().iter_mut().zip(make_samples(count)) {
        *dst = quantize(v, SCALE, ZERO_POINT) as u8;
    }
    t
}

fn bench_quantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantize");
    for count in [784usize, 9216] {
        let samples = make_samples(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &samples, |b, samples| {
            b.iter(|| {
                samples
                    .iter()
                    .map(|&v| quantize(black_box(v), SCALE, ZERO_POINT))
                    .collect::<Vec<i8>>()
            })
        });
    }
    group.finish();
}

fn bench_dequantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("dequantize");
    for count in [10usize, 1000] {
        let tensor = make_quantized_tensor(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &tensor, |b, tensor| {
            b.iter(|| dequantize(black_box(tensor)).unwrap())
        });
    }
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let scores = make_samples(1000);
    c.bench_function("filter_scores/1000", |b| {
        b.iter(|| filter_scores(black_box(&scores), 0.5))
    });
}

criterion_group!(benches, bench_quantize, bench_dequantize, bench_filter);
criterion_main!(benches);
