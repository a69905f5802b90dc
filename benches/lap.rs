//! Benchmarks comparing the two assignment solvers on dense random
//! matrices with a small share of forbidden pairings.

use criterion::{Criterion, criterion_group, criterion_main};
use lap_linker::assignment::{SolverKind, solve};
use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

fn random_matrix(rng: &mut SmallRng, side: usize) -> Array2<f64> {
    Array2::from_shape_fn((side, side), |_| {
        if rng.gen_bool(0.05) { f64::INFINITY } else { rng.gen_range(0.0..100.0) }
    })
}

fn bench_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("lap");
    for side in [16, 64, 128] {
        let mut rng = SmallRng::seed_from_u64(42);
        let costs = random_matrix(&mut rng, side);
        group.bench_function(format!("jv/{side}"), |b| {
            b.iter(|| solve(black_box(&costs), SolverKind::Jv).unwrap());
        });
        group.bench_function(format!("munkres/{side}"), |b| {
            b.iter(|| solve(black_box(&costs), SolverKind::Munkres).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_solvers);
criterion_main!(benches);
