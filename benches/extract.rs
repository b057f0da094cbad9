use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use cmlload::{extract_epochs, EpochWindow, WindowSamples};
use ndarray::Array3;

// 64 channels × 10 min @ 500 Hz.
fn recording() -> Array3<f64> {
    Array3::from_shape_fn((1, 64, 300_000), |(_, c, t)| ((c * 7 + t) % 97) as f64)
}

fn offsets(n: usize) -> Vec<i64> {
    (0..n as i64).map(|i| 500 + i * 1_100).collect()
}

fn bench_extract_300_events(c: &mut Criterion) {
    let data = recording();
    let offs = offsets(300);
    let w = WindowSamples::from_window(&EpochWindow::new(-200.0, 1600.0).with_buffer(500.0), 500.0)
        .unwrap()
        .unwrap();
    c.bench_function("extract_epochs 300 × [64, 1300]", |b| {
        b.iter(|| {
            let out = extract_epochs(black_box(&data), black_box(&offs), &w);
            black_box(out.dim())
        })
    });
}

fn bench_window_samples(c: &mut Criterion) {
    let window = EpochWindow::new(-200.0, 1600.0).with_buffer(500.0);
    c.bench_function("WindowSamples::from_window", |b| {
        b.iter(|| WindowSamples::from_window(black_box(&window), black_box(499.707)).unwrap())
    });
}

criterion_group!(benches, bench_extract_300_events, bench_window_samples);
criterion_main!(benches);
