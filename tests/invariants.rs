//! Property-based checks for invariants that must hold across every input,
//! not just the handful of scenarios in `spmv_scenarios.rs`.

use proptest::prelude::*;
use spmv_engine::block::{convert, BlockStore};
use spmv_engine::{Config, CsrMatrix, Operation, PartitionKind, ThreadModel, TunableMatrix};

/// Generate a random sparse matrix as coordinate triplets with no duplicate
/// `(row, col)` pairs, plus its declared shape.
fn arb_csr(max_rows: usize, max_cols: usize) -> impl Strategy<Value = CsrMatrix<'static>> {
    (1..=max_rows, 1..=max_cols).prop_flat_map(|(rows, cols)| {
        prop::collection::vec((0..rows, 0..cols, -10.0..10.0f64), 0..(rows * cols).min(40)).prop_map(move |mut raw| {
            raw.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
            raw.dedup_by(|a, b| a.0 == b.0 && a.1 == b.1);
            CsrMatrix::from_triplets(&raw, rows, cols).unwrap()
        })
    })
}

proptest! {
    #[test]
    fn csr_to_bcsr_round_trip_preserves_every_entry(a in arb_csr(12, 12), r in 1usize..4, c in 1usize..4) {
        let bcsr = convert::csr_to_bcsr(&a, r, c).unwrap();
        let back = BlockStore::Bcsr(bcsr).to_csr().unwrap();
        for i in 0..a.rows() {
            for j in 0..a.cols() {
                prop_assert_eq!(a.get_entry(i, j).unwrap(), back.get_entry(i, j).unwrap());
            }
        }
    }

    #[test]
    fn block_count_never_undercounts_nnz(a in arb_csr(12, 12), r in 1usize..4, c in 1usize..4) {
        let bcsr = convert::csr_to_bcsr(&a, r, c).unwrap();
        prop_assert!(bcsr.stored_entry_count() >= a.nnz());
        prop_assert_eq!(bcsr.stored_entry_count() % (r * c), 0);
    }

    #[test]
    fn fill_at_1x1_is_exactly_one(a in arb_csr(10, 10), seed in any::<u64>()) {
        let table = spmv_engine::estimate_fill(&a, 1, 1, 1.0, seed);
        prop_assert_eq!(table.get(1, 1), 1.0);
    }

    #[test]
    fn alpha_zero_leaves_only_the_beta_scale(a in arb_csr(10, 10), beta in -5.0..5.0f64) {
        let x = vec![1.0; a.cols()];
        let mut y: Vec<f64> = (0..a.rows()).map(|i| i as f64 + 1.0).collect();
        let expected: Vec<f64> = y.iter().map(|v| v * beta).collect();
        a.spmv(Operation::Normal, 0.0, &x, beta, &mut y).unwrap();
        prop_assert_eq!(y, expected);
    }

    #[test]
    fn all_zero_x_with_beta_zero_yields_all_zero_y(a in arb_csr(10, 10)) {
        let x = vec![0.0; a.cols()];
        let mut y = vec![1.0; a.rows()];
        a.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        prop_assert!(y.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn transpose_is_the_adjoint_of_normal(a in arb_csr(8, 8)) {
        // <A x, y> == <x, A^T y> for any x, y — the defining property of
        // the transpose operator, independent of any particular blocking.
        let x: Vec<f64> = (0..a.cols()).map(|i| (i as f64 + 1.0) * 0.5).collect();
        let y: Vec<f64> = (0..a.rows()).map(|i| (i as f64 + 2.0) * 0.25).collect();

        let mut ax = vec![0.0; a.rows()];
        a.spmv(Operation::Normal, 1.0, &x, 0.0, &mut ax).unwrap();
        let lhs: f64 = ax.iter().zip(&y).map(|(u, v)| u * v).sum();

        let mut at_y = vec![0.0; a.cols()];
        a.spmv(Operation::Transpose, 1.0, &y, 0.0, &mut at_y).unwrap();
        let rhs: f64 = x.iter().zip(&at_y).map(|(u, v)| u * v).sum();

        prop_assert!((lhs - rhs).abs() < 1e-6, "lhs={lhs} rhs={rhs}");
    }

    #[test]
    fn partition_count_does_not_change_the_result(
        a in arb_csr(16, 6),
        partitions in 1usize..5,
    ) {
        let x = vec![1.0; a.cols()];
        let mut reference = vec![0.0; a.rows()];
        a.spmv(Operation::Normal, 1.0, &x, 0.0, &mut reference).unwrap();

        let config = Config::with_threads(ThreadModel::Single, partitions, PartitionKind::OneD);
        let mut handle = TunableMatrix::new(a, config);
        handle.partition().unwrap();
        let mut y = vec![0.0; reference.len()];
        handle.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        prop_assert_eq!(y, reference);
    }

    #[test]
    fn set_then_get_round_trips_on_any_stored_slot(a in arb_csr(10, 10), value in -100.0..100.0f64) {
        prop_assume!(a.nnz() > 0);
        let (row, col) = {
            let mut found = None;
            'outer: for i in 0..a.rows() {
                for (c, _) in a.row_iter(i) {
                    found = Some((i, c));
                    break 'outer;
                }
            }
            found.unwrap()
        };
        let mut a = a;
        a.set_entry(row, col, value).unwrap();
        prop_assert_eq!(a.get_entry(row, col).unwrap(), value);
    }
}
