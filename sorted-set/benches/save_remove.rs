//! Small-N benchmarks. The upstream contract is "low-frequency changes on
//! small tables" (spec.md §1), so this documents per-change cost at sizes
//! that are actually representative rather than stress-testing scale.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn seed(n: i64) -> Vec<i64> {
    let mut seq = Vec::new();
    for v in 0..n {
        seq = sorted_set::save(seq, v * 2, |v| *v);
    }
    seq
}

fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    for &n in &[8usize, 64, 512] {
        let seq = seed(n as i64);
        group.bench_with_input(BenchmarkId::from_parameter(n), &seq, |b, seq| {
            b.iter(|| sorted_set::save(black_box(seq.clone()), black_box(1), |v| *v));
        });
    }
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    for &n in &[8usize, 64, 512] {
        let seq = seed(n as i64);
        group.bench_with_input(BenchmarkId::from_parameter(n), &seq, |b, seq| {
            b.iter(|| sorted_set::remove(black_box(seq.clone()), black_box(&0), |v| *v));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_save, bench_remove);
criterion_main!(benches);
