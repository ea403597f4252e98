//! Benchmarks comparing the reference CSR kernel against a tuned BCSR
//! representation and against a partitioned, multi-threaded handle.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use spmv_engine::block::convert;
use spmv_engine::{Config, CsrMatrix, Operation, PartitionKind, ThreadModel, TunableMatrix};

/// A banded matrix with bandwidth `band`, dense `2x2` blocks along the
/// diagonal band — representative of the block-friendly matrices the
/// tuner is meant to win on.
fn banded_block_friendly(n: usize, band: usize) -> CsrMatrix<'static> {
    let mut triplets = Vec::new();
    for i in 0..n {
        for d in 0..=band {
            if i + d < n {
                triplets.push((i, i + d, 1.0 + d as f64));
            }
            if d > 0 && i >= d {
                triplets.push((i, i - d, 1.0 + d as f64));
            }
        }
    }
    CsrMatrix::from_triplets(&triplets, n, n).unwrap()
}

fn bench_reference_vs_tuned(c: &mut Criterion) {
    let mut group = c.benchmark_group("spmv_reference_vs_tuned");
    for &n in &[256usize, 1024] {
        let a = banded_block_friendly(n, 3);
        let bcsr = convert::csr_to_bcsr(&a, 2, 2).unwrap();
        let x = vec![1.0; n];

        group.bench_with_input(BenchmarkId::new("csr_reference", n), &n, |b, _| {
            let mut y = vec![0.0; n];
            b.iter(|| a.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("bcsr_2x2", n), &n, |b, _| {
            let mut y = vec![0.0; n];
            b.iter(|| bcsr.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap());
        });
    }
    group.finish();
}

fn bench_thread_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("spmv_thread_models");
    let n = 4096;
    let a = banded_block_friendly(n, 4);
    let x = vec![1.0; n];

    for &thread_model in &[ThreadModel::Single, ThreadModel::PerCallThreads, ThreadModel::ThreadPool] {
        let config = Config::with_threads(thread_model, 4, PartitionKind::OneD);
        let mut handle = TunableMatrix::new(a.clone(), config);
        handle.partition().unwrap();

        group.bench_with_input(BenchmarkId::new("thread_model", format!("{thread_model:?}")), &thread_model, |b, _| {
            let mut y = vec![0.0; n];
            b.iter(|| handle.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reference_vs_tuned, bench_thread_models);
criterion_main!(benches);
