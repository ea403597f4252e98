//! Tunable matrix handle (aggregate): the user-facing `SpMV` entry point.
//!
//! Ties together the input CSR representation (C1), an optional tuned
//! block store (C2/C3) reached through the kernel variant table (C4), the
//! partition plan (C8) and its materialized sub-handles, the concurrency
//! model used to dispatch across them (C10), and the reduction pass (C11)
//! that folds overlapping sub-kernel outputs back into the caller's `y`.

use crate::block::BlockStore;
use crate::config::Config;
use crate::csr::CsrMatrix;
use crate::error::{EngineError, Result};
use crate::kernel;
use crate::partition::{self, PartitionRange};
use crate::recipe::Recipe;
use crate::reduce;
use crate::tuner::{self, Clock, RegisteredHeuristic, TuneOutcome, TuneRequest};
use crate::types::{Operation, PartitionKind, Precision, ThreadModel};
use crate::vector;
use alloc::string::String;
use alloc::vec::Vec;

/// One partition's materialized sub-matrix, with its own optional tuned
/// representation (spec.md §4.6: "sub-matrices may then be tuned
/// independently").
pub struct SubMatrix {
    range: PartitionRange,
    csr: CsrMatrix<'static>,
    tuned: Option<BlockStore>,
}

impl SubMatrix {
    pub fn range(&self) -> PartitionRange {
        self.range
    }

    pub fn csr(&self) -> &CsrMatrix<'static> {
        &self.csr
    }

    pub fn tuned(&self) -> Option<&BlockStore> {
        self.tuned.as_ref()
    }

    fn spmv(&self, op: Operation, alpha: Precision, x: &[Precision], beta: Precision, y: &mut [Precision]) -> Result<()> {
        match &self.tuned {
            Some(store) => kernel::dispatch(store, op, alpha, x, beta, y),
            None => kernel::dispatch_csr(&self.csr, op, alpha, x, beta, y),
        }
    }

    /// Tune this sub-matrix in isolation from its parent.
    pub fn tune<C: Clock>(&mut self, heuristics: &[RegisteredHeuristic], clock: &C, fill_seed: u64) -> Result<TuneOutcome> {
        let req = TuneRequest {
            csr: &self.csr,
            heuristics,
            streaming_time_secs: 0.0,
            accumulated_observed_kernel_time_secs: 0.0,
            estimated_trace_time_secs: 0.0,
            clock,
            fill_seed,
        };
        let result = tuner::tune(&req)?;
        self.tuned = result.store;
        Ok(result.outcome)
    }
}

/// A matrix handle: the original input, an optional tuned representation,
/// the partition plan, and the bookkeeping the tuner's budget computation
/// needs (accumulated observed kernel time, hinted/traced call volume;
/// spec.md §4.7).
pub struct TunableMatrix<'a> {
    input: CsrMatrix<'a>,
    tuned: Option<BlockStore>,
    recipe: Option<Recipe>,
    disabled_kernels: Vec<String>,
    partitions: Vec<SubMatrix>,
    config: Config,
    streaming_time_secs: f64,
    accumulated_observed_kernel_time_secs: f64,
    estimated_trace_time_secs: f64,
    // A `Mutex`, not a `RefCell`: `spmv` takes `&self`, and the pool must
    // stay `Sync` so per-partition jobs captured by reference across
    // worker threads remain shareable.
    #[cfg(feature = "std")]
    thread_pool: std::sync::Mutex<Option<crate::executor::ThreadPool>>,
}

impl<'a> TunableMatrix<'a> {
    /// Wrap `input` under `config`. No tuning or partitioning has happened
    /// yet; `spmv` on a fresh handle runs the untuned CSR reference kernel
    /// directly on the calling thread.
    pub fn new(input: CsrMatrix<'a>, config: Config) -> Self {
        Self {
            input,
            tuned: None,
            recipe: None,
            disabled_kernels: Vec::new(),
            partitions: Vec::new(),
            config,
            streaming_time_secs: 0.0,
            accumulated_observed_kernel_time_secs: 0.0,
            estimated_trace_time_secs: 0.0,
            #[cfg(feature = "std")]
            thread_pool: std::sync::Mutex::new(None),
        }
    }

    pub fn rows(&self) -> usize {
        self.input.rows()
    }

    pub fn cols(&self) -> usize {
        self.input.cols()
    }

    pub fn input(&self) -> &CsrMatrix<'a> {
        &self.input
    }

    pub fn tuned(&self) -> Option<&BlockStore> {
        self.tuned.as_ref()
    }

    pub fn recipe(&self) -> Option<&Recipe> {
        self.recipe.as_ref()
    }

    pub fn disabled_kernels(&self) -> &[String] {
        &self.disabled_kernels
    }

    pub fn partitions(&self) -> &[SubMatrix] {
        &self.partitions
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record actually-observed time spent in kernel calls since the last
    /// tuning pass, widening the time budget the next `tune()` call sees.
    pub fn record_observed_kernel_time(&mut self, secs: f64) {
        self.accumulated_observed_kernel_time_secs += secs;
    }

    /// Record a caller-supplied workload hint (e.g. "expect 500 more
    /// SpMV calls at roughly this cost"), the other half of the budget
    /// computation (spec.md §4.7).
    pub fn record_hint(&mut self, estimated_time_secs: f64) {
        self.estimated_trace_time_secs += estimated_time_secs;
    }

    /// Split the input into the configured partition plan, materializing
    /// one owned sub-matrix per partition. Replaces any existing plan.
    pub fn partition(&mut self) -> Result<()> {
        let p = self.config.normalized_partition_count();
        let ranges = partition::plan(&self.input, self.config.partition_kind, p);
        let mut partitions = Vec::with_capacity(ranges.len());
        for range in ranges {
            let csr = partition::materialize(&self.input, &range)?;
            partitions.push(SubMatrix { range, csr, tuned: None });
        }
        self.partitions = partitions;
        Ok(())
    }

    /// Tune the whole (unpartitioned) input under the dominant budget
    /// source, installing the winning representation and its recipe.
    pub fn tune<C: Clock>(&mut self, heuristics: &[RegisteredHeuristic], clock: &C, fill_seed: u64) -> Result<TuneOutcome> {
        let req = TuneRequest {
            csr: &self.input,
            heuristics,
            streaming_time_secs: self.streaming_time_secs,
            accumulated_observed_kernel_time_secs: self.accumulated_observed_kernel_time_secs,
            estimated_trace_time_secs: self.estimated_trace_time_secs,
            clock,
            fill_seed,
        };
        let result = tuner::tune(&req)?;
        self.tuned = result.store;
        self.recipe = result.recipe.clone();
        self.disabled_kernels = result.disabled_kernels;
        Ok(result.outcome)
    }

    /// Tune each already-materialized sub-matrix independently of the
    /// parent's own (if any) tuned representation.
    pub fn tune_partitions<C: Clock>(&mut self, heuristics: &[RegisteredHeuristic], clock: &C, fill_seed: u64) -> Result<()> {
        for (i, sub) in self.partitions.iter_mut().enumerate() {
            sub.tune(heuristics, clock, fill_seed.wrapping_add(i as u64))?;
        }
        Ok(())
    }

    /// Re-apply a previously cached recipe, rebuilding the tuned
    /// representation without re-running the heuristic/benchmark pass.
    pub fn apply_recipe(&mut self, recipe: Recipe) -> Result<()> {
        self.tuned = Some(recipe.apply(&self.input)?);
        self.recipe = Some(recipe);
        Ok(())
    }

    /// `y <- beta*y + alpha*op(A)*x`.
    ///
    /// Dispatched directly against the installed (tuned or reference)
    /// representation when unpartitioned; otherwise fanned out across the
    /// partition plan per `config.thread_model`, with a reduction pass
    /// applied whenever the plan's sub-kernels may write overlapping rows
    /// of `y` (transpose, or any SemiOneD call).
    pub fn spmv(&self, op: Operation, alpha: Precision, x: &[Precision], beta: Precision, y: &mut [Precision]) -> Result<()> {
        let (expected_y, expected_x) = match op.is_transpose() {
            true => (self.cols(), self.rows()),
            false => (self.rows(), self.cols()),
        };
        if y.len() != expected_y {
            return Err(EngineError::DimensionMismatch {
                expected: expected_y,
                actual: y.len(),
                operation: "TunableMatrix::spmv (y)".into(),
            });
        }
        if x.len() != expected_x {
            return Err(EngineError::DimensionMismatch {
                expected: expected_x,
                actual: x.len(),
                operation: "TunableMatrix::spmv (x)".into(),
            });
        }

        if self.partitions.is_empty() {
            return self.spmv_direct(op, alpha, x, beta, y);
        }

        let is_semi = matches!(self.config.partition_kind, PartitionKind::SemiOneD);
        if !reduce::needs_reduction(op.is_transpose(), is_semi) {
            self.spmv_disjoint(op, alpha, x, beta, y)
        } else {
            self.spmv_reduced(op, alpha, x, beta, y)
        }
    }

    fn spmv_direct(&self, op: Operation, alpha: Precision, x: &[Precision], beta: Precision, y: &mut [Precision]) -> Result<()> {
        match &self.tuned {
            Some(store) => kernel::dispatch(store, op, alpha, x, beta, y),
            None => kernel::dispatch_csr(&self.input, op, alpha, x, beta, y),
        }
    }

    /// OneD + `Operation::Normal`: partitions cover disjoint row ranges of
    /// `y`, so each sub-kernel can write straight into its own slice.
    #[cfg(feature = "std")]
    fn spmv_disjoint(&self, op: Operation, alpha: Precision, x: &[Precision], beta: Precision, y: &mut [Precision]) -> Result<()> {
        let mut rest: &mut [Precision] = y;
        let mut chunks = Vec::with_capacity(self.partitions.len());
        for sub in &self.partitions {
            let (chunk, remainder) = rest.split_at_mut(sub.range.num_rows());
            chunks.push(std::sync::Mutex::new(chunk));
            rest = remainder;
        }
        self.run_over_chunks(chunks, |p, out| self.partitions[p].spmv(op, alpha, x, beta, out))
    }

    #[cfg(not(feature = "std"))]
    fn spmv_disjoint(&self, op: Operation, alpha: Precision, x: &[Precision], beta: Precision, y: &mut [Precision]) -> Result<()> {
        let mut rest: &mut [Precision] = y;
        for sub in &self.partitions {
            let (chunk, remainder) = rest.split_at_mut(sub.range.num_rows());
            sub.spmv(op, alpha, x, beta, chunk)?;
            rest = remainder;
        }
        Ok(())
    }

    /// OneD + transpose, or any SemiOneD call: sub-kernels may write
    /// overlapping output rows, so each gets a private zeroed buffer
    /// (C9) that is folded into `y` afterward (C11).
    #[cfg(feature = "std")]
    fn spmv_reduced(&self, op: Operation, alpha: Precision, x: &[Precision], beta: Precision, y: &mut [Precision]) -> Result<()> {
        let full_buffers = reduce::needs_full_buffers(op.is_transpose());
        let ranges: Vec<PartitionRange> = self.partitions.iter().map(|s| s.range).collect();
        let mut outputs = vector::build_private_outputs(&ranges, y.len(), full_buffers);

        let chunks: Vec<std::sync::Mutex<&mut [Precision]>> =
            outputs.buffers.iter_mut().map(|b| std::sync::Mutex::new(b.as_mut_slice())).collect();

        self.run_over_chunks(chunks, |p, out| {
            let sub = &self.partitions[p];
            if op.is_transpose() {
                // `sub.csr` has `sub.range.num_rows()` local rows mapping
                // onto the parent's `[row_start, row_end)`; transpose
                // reads exactly those rows of `x` and may write anywhere
                // in `y`.
                let x_local = &x[sub.range.row_start..sub.range.row_end];
                sub.spmv(op, alpha, x_local, 0.0, out)
            } else {
                // SemiOneD-normal: `out` is range-sized, row 0 aligning
                // with `sub.range.row_start`.
                sub.spmv(op, alpha, x, 0.0, out)
            }
        })?;

        reduce::reduce(&mut outputs, &ranges, beta, y);
        Ok(())
    }

    #[cfg(not(feature = "std"))]
    fn spmv_reduced(&self, op: Operation, alpha: Precision, x: &[Precision], beta: Precision, y: &mut [Precision]) -> Result<()> {
        let full_buffers = reduce::needs_full_buffers(op.is_transpose());
        let ranges: Vec<PartitionRange> = self.partitions.iter().map(|s| s.range).collect();
        let mut outputs = vector::build_private_outputs(&ranges, y.len(), full_buffers);

        for (sub, buffer) in self.partitions.iter().zip(outputs.buffers.iter_mut()) {
            let out = buffer.as_mut_slice();
            if op.is_transpose() {
                let x_local = &x[sub.range.row_start..sub.range.row_end];
                sub.spmv(op, alpha, x_local, 0.0, out)?;
            } else {
                sub.spmv(op, alpha, x, 0.0, out)?;
            }
        }

        reduce::reduce(&mut outputs, &ranges, beta, y);
        Ok(())
    }

    /// Run `body(p, chunk)` once per entry of `chunks`, dispatched across
    /// workers per `config.thread_model`, and surface the first error any
    /// job raised.
    ///
    /// Each chunk is wrapped in its own `Mutex` purely to let a single
    /// `Fn(usize)` job type satisfy every thread model uniformly; since
    /// jobs only ever touch their own index, there is never contention.
    #[cfg(feature = "std")]
    fn run_over_chunks<'y>(
        &self,
        chunks: Vec<std::sync::Mutex<&'y mut [Precision]>>,
        body: impl Fn(usize, &mut [Precision]) -> Result<()> + Sync,
    ) -> Result<()> {
        let n = chunks.len();
        let errors: std::sync::Mutex<Option<EngineError>> = std::sync::Mutex::new(None);
        let record_error = |e: EngineError| {
            let mut slot = errors.lock().expect("spmv error mutex poisoned");
            if slot.is_none() {
                *slot = Some(e);
            }
        };
        let run = |p: usize| {
            let mut guard = chunks[p].lock().expect("spmv chunk mutex poisoned");
            if let Err(e) = body(p, &mut guard) {
                record_error(e);
            }
        };

        match self.config.thread_model {
            ThreadModel::Single => {
                for p in 0..n {
                    run(p);
                }
            }
            ThreadModel::PerCallThreads => crate::executor::dispatch_per_call(n, run),
            ThreadModel::ThreadPool => {
                self.ensure_thread_pool();
                let guard = self.thread_pool.lock().expect("thread pool mutex poisoned");
                let pool = guard.as_ref().expect("thread pool initialized by ensure_thread_pool");
                let workers = pool.thread_count().max(1);
                let per_worker = (n + workers - 1) / workers;
                pool.dispatch(|worker_id| {
                    let start = worker_id * per_worker;
                    let end = (start + per_worker).min(n);
                    for p in start..end {
                        run(p);
                    }
                });
            }
            ThreadModel::ForkJoin => {
                #[cfg(feature = "parallel")]
                {
                    crate::executor::dispatch_fork_join(n, run);
                }
                #[cfg(not(feature = "parallel"))]
                {
                    for p in 0..n {
                        run(p);
                    }
                }
            }
        }

        match errors.into_inner().expect("spmv error mutex poisoned") {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[cfg(feature = "std")]
    fn ensure_thread_pool(&self) {
        let mut slot = self.thread_pool.lock().expect("thread pool mutex poisoned");
        if slot.is_none() {
            *slot = Some(crate::executor::ThreadPool::new(self.config.thread_count));
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::tuner::StdClock;

    fn eight_by_four() -> CsrMatrix<'static> {
        let triplets: Vec<(usize, usize, f64)> = (0..8).map(|i| (i, i % 4, (i + 1) as f64)).collect();
        CsrMatrix::from_triplets(&triplets, 8, 4).unwrap()
    }

    #[test]
    fn unpartitioned_handle_matches_reference_spmv() {
        let a = eight_by_four();
        let mut reference = [0.0; 8];
        a.spmv(Operation::Normal, 1.0, &[1.0, 1.0, 1.0, 1.0], 0.0, &mut reference).unwrap();

        let handle = TunableMatrix::new(a, Config::default());
        let mut y = [0.0; 8];
        handle.spmv(Operation::Normal, 1.0, &[1.0, 1.0, 1.0, 1.0], 0.0, &mut y).unwrap();
        assert_eq!(y, reference);
    }

    #[test]
    fn one_d_partitioned_handle_matches_reference_across_thread_models() {
        let a = eight_by_four();
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut reference = [0.0; 8];
        a.spmv(Operation::Normal, 1.0, &x, 0.0, &mut reference).unwrap();

        for thread_model in [ThreadModel::Single, ThreadModel::PerCallThreads, ThreadModel::ThreadPool] {
            let config = Config::with_threads(thread_model, 2, PartitionKind::OneD);
            let mut handle = TunableMatrix::new(a.clone(), config);
            handle.partition().unwrap();
            let mut y = [0.0; 8];
            handle.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
            assert_eq!(y, reference, "thread model {thread_model:?} diverged");
        }
    }

    #[test]
    fn semi_one_d_reduction_matches_reference() {
        let a = eight_by_four();
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut reference = [0.0; 8];
        a.spmv(Operation::Normal, 1.0, &x, 0.0, &mut reference).unwrap();

        let config = Config::with_threads(ThreadModel::Single, 3, PartitionKind::SemiOneD);
        let mut handle = TunableMatrix::new(a, config);
        handle.partition().unwrap();
        let mut y = [0.0; 8];
        handle.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y, reference);
    }

    #[test]
    fn transpose_through_one_d_partitions_reduces_correctly() {
        let a = eight_by_four();
        let x = [1.0; 8];
        let mut reference = [0.0; 4];
        a.spmv(Operation::Transpose, 1.0, &x, 0.0, &mut reference).unwrap();

        let config = Config::with_threads(ThreadModel::Single, 2, PartitionKind::OneD);
        let mut handle = TunableMatrix::new(a, config);
        handle.partition().unwrap();
        let mut y = [0.0; 4];
        handle.spmv(Operation::Transpose, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y, reference);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let a = eight_by_four();
        let handle = TunableMatrix::new(a, Config::default());
        let mut y = [0.0; 3];
        let err = handle.spmv(Operation::Normal, 1.0, &[1.0, 1.0, 1.0, 1.0], 0.0, &mut y).unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch { .. }));
    }

    #[test]
    fn recipe_round_trips_through_apply() {
        let a = CsrMatrix::from_triplets(
            &[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 4.0), (3, 3, 5.0)],
            4,
            4,
        )
        .unwrap();
        let mut handle = TunableMatrix::new(a, Config::default());
        let recipe = Recipe::new_block_store("BCSR", 2, 2);
        handle.apply_recipe(recipe.clone()).unwrap();
        assert_eq!(handle.recipe(), Some(&recipe));
        assert!(handle.tuned().is_some());
    }

    #[test]
    fn tune_with_no_heuristics_keeps_input_as_is() {
        let a = CsrMatrix::from_triplets(&[(0, 0, 1.0), (1, 1, 2.0)], 2, 2).unwrap();
        let mut handle = TunableMatrix::new(a, Config::default());
        let outcome = handle.tune(&[], &StdClock, 1).unwrap();
        assert_eq!(outcome, TuneOutcome::AsIs);
        assert!(handle.tuned().is_none());
    }
}
