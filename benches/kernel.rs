#[macro_use]
extern crate criterion;
extern crate mandelpool;
extern crate num;

use criterion::{black_box, Criterion};
use num::Complex;

use mandelpool::escape;

fn escape_benchmarks(c: &mut Criterion) {
    c.bench_function("escape interior point", |b| {
        b.iter(|| escape(black_box(Complex::new(-0.5, 0.0)), black_box(1000)))
    });
    c.bench_function("escape boundary point", |b| {
        b.iter(|| escape(black_box(Complex::new(-0.745, 0.113)), black_box(1000)))
    });
    c.bench_function("escape exterior point", |b| {
        b.iter(|| escape(black_box(Complex::new(0.5, 0.5)), black_box(1000)))
    });
}

criterion_group!(benches, escape_benchmarks);
criterion_main!(benches);
