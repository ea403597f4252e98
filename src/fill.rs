//! Fill estimator (C5): sampled-row estimation of the fill ratio a
//! candidate `(r, c)` register block size would induce.
//!
//! This is an estimate, not an exact fill, even at `p = 1` — leftover rows
//! (`m mod r`) are ignored by design (see the module-level Open Question
//! notes in `DESIGN.md`), trading a small bias on matrices with very few
//! rows for an `O(nnz)` estimation pass that never special-cases the
//! block-size grid's edge.

use crate::csr::CsrMatrix;
use crate::types::Precision;
use alloc::vec;
use alloc::vec::Vec;
use bit_set::BitSet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// `fill[r][c]` table for `r in [1, r_max]`, `c in [1, c_max]`.
#[derive(Debug, Clone)]
pub struct FillTable {
    r_max: usize,
    c_max: usize,
    values: Vec<Precision>,
}

impl FillTable {
    /// Fill ratio for `(r, c)`, `1 <= r <= r_max`, `1 <= c <= c_max`.
    pub fn get(&self, r: usize, c: usize) -> Precision {
        self.values[(r - 1) * self.c_max + (c - 1)]
    }

    pub fn r_max(&self) -> usize {
        self.r_max
    }

    pub fn c_max(&self) -> usize {
        self.c_max
    }
}

/// Estimate `fill[r, c]` for `r in [1, r_max]`, `c in [1, c_max]`, sampling
/// each candidate `r`'s block-rows with probability `p`.
///
/// Deterministic given `seed`; production tuning calls should vary the
/// seed run to run only if re-sampling variance is desired (the reference
/// engine reseeds per call, which this preserves via the `seed` parameter
/// rather than process-global state).
pub fn estimate_fill(csr: &CsrMatrix<'_>, r_max: usize, c_max: usize, p: f64, seed: u64) -> FillTable {
    let mut rng = SmallRng::seed_from_u64(seed);
    let m = csr.rows();
    let n = csr.cols();
    let mut values = vec![0.0; r_max * c_max];

    for r in 1..=r_max {
        let num_block_rows = m / r;
        let sampled_block_rows: Vec<usize> = (0..num_block_rows)
            .filter(|_| p >= 1.0 || rng.gen::<f64>() < p)
            .collect();

        for c in 1..=c_max {
            let num_block_cols = (n + c - 1) / c;
            let mut visited = BitSet::with_capacity(num_block_cols);
            let mut blocks_sampled = 0usize;
            let mut nnz_sampled = 0usize;

            for &bi in &sampled_block_rows {
                let row0 = bi * r;
                let mut touched_count = 0usize;
                for row in row0..row0 + r {
                    for (col, _) in csr.row_iter(row) {
                        nnz_sampled += 1;
                        let block_col = col / c;
                        if !visited.contains(block_col) {
                            visited.insert(block_col);
                            touched_count += 1;
                        }
                    }
                }
                // Clear in a second sweep to keep this O(nnz) rather than
                // O(nnz + n) per block-row.
                for row in row0..row0 + r {
                    for (col, _) in csr.row_iter(row) {
                        visited.remove(col / c);
                    }
                }
                blocks_sampled += touched_count;
            }

            let fill = if nnz_sampled == 0 {
                if blocks_sampled == 0 {
                    1.0
                } else {
                    Precision::INFINITY
                }
            } else {
                (r * c * blocks_sampled) as Precision / nnz_sampled as Precision
            };
            values[(r - 1) * c_max + (c - 1)] = fill;
        }
    }

    FillTable { r_max, c_max, values }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn fill_at_1x1_is_exactly_one() {
        let a = CsrMatrix::from_triplets(&[(0, 0, 1.0), (1, 2, 3.0), (2, 1, 4.0)], 3, 3).unwrap();
        let table = estimate_fill(&a, 4, 4, 1.0, 7);
        assert_eq!(table.get(1, 1), 1.0);
    }

    #[test]
    fn empty_matrix_fill_is_one() {
        let a = CsrMatrix::from_triplets(&[], 4, 4).unwrap();
        let table = estimate_fill(&a, 2, 2, 1.0, 1);
        assert_eq!(table.get(2, 2), 1.0);
    }

    #[test]
    fn block_friendly_matrix_has_fill_one_at_matching_block_size() {
        // A dense 2x2 block at (0,0) with no partial occupancy.
        let a = CsrMatrix::from_triplets(&[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 4.0)], 2, 2).unwrap();
        let table = estimate_fill(&a, 2, 2, 1.0, 3);
        assert_eq!(table.get(2, 2), 1.0);
    }
}
