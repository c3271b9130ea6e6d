use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use spectral_coupler::algs::lagrange::interpolate_into;
use spectral_coupler::prelude::*;
use std::f64::consts::TAU;

fn uniform(n: usize, shift: f64) -> Vec<f64> {
    (0..n).map(|k| TAU * (k as f64 + shift) / n as f64).collect()
}

fn bench_lagrange(c: &mut Criterion) {
    let mut group = c.benchmark_group("lagrange");
    for &n in &[64usize, 256, 1024] {
        let xin = uniform(n, 0.0);
        let yin: Vec<f64> = xin.iter().map(|x| x.sin()).collect();
        let xout = uniform(n - 3, 0.5);
        let mut yout = vec![0.0; xout.len()];
        group.bench_with_input(BenchmarkId::new("interpolate_into", n), &n, |b, _| {
            b.iter(|| {
                interpolate_into(black_box(&xin), black_box(&yin), &xout, &mut yout).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    let mut rng = SmallRng::seed_from_u64(42);
    for &n in &[16usize, 64, 256] {
        let mut plan = SpectralTransform::new(n).unwrap();
        let line: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let mut spec = vec![Complex64::new(0.0, 0.0); plan.spectrum_len()];
        let mut back = vec![0.0; n];
        group.bench_with_input(BenchmarkId::new("forward_inverse", n), &n, |b, _| {
            b.iter(|| {
                plan.forward(black_box(&line), &mut spec).unwrap();
                plan.inverse(&spec, &mut back).unwrap();
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lagrange, bench_transform);
criterion_main!(benches);
