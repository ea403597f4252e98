//! Block CSR (BCSR): CSR with dense `r x c` blocks in place of scalar
//! entries.

use crate::error::{EngineError, Result};
use crate::types::{Operation, Precision};
use alloc::vec;
use alloc::vec::Vec;

/// A single register-blocked level: `num_block_rows` block-rows of height
/// `r`, covering original rows `[row_offset, row_offset + num_block_rows*r)`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BcsrMatrix {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) r: usize,
    pub(crate) c: usize,
    /// Offset (in original matrix rows) of this level's first row. Non-zero
    /// only for the recursively-converted leftover tail.
    pub(crate) row_offset: usize,
    /// Block-row offsets into `bind`/`bval`, length `num_block_rows + 1`.
    pub(crate) bptr: Vec<u32>,
    /// Starting column `j0` of each block.
    pub(crate) bind: Vec<u32>,
    /// `r*c` values per block, row-major, concatenated in `bptr` order.
    pub(crate) bval: Vec<Precision>,
    /// Leftover rows (`original_rows mod r`), converted recursively at a
    /// smaller row-block height over the same column blocking `c`.
    pub(crate) tail: Option<alloc::boxed::Box<BcsrMatrix>>,
}

impl BcsrMatrix {
    pub fn r(&self) -> usize {
        self.r
    }

    pub fn c(&self) -> usize {
        self.c
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn num_block_rows(&self) -> usize {
        self.bptr.len().saturating_sub(1)
    }

    pub fn bptr(&self) -> &[u32] {
        &self.bptr
    }

    pub fn bind(&self) -> &[u32] {
        &self.bind
    }

    pub fn bval(&self) -> &[Precision] {
        &self.bval
    }

    pub fn tail(&self) -> Option<&BcsrMatrix> {
        self.tail.as_deref()
    }

    /// Number of explicitly materialized blocks at this level (excludes the
    /// tail's blocks; use [`BcsrMatrix::stored_entry_count`] for the total).
    pub fn num_blocks(&self) -> usize {
        self.bind.len()
    }

    /// `r*c*|blocks|` at this level plus the tail's, recursively.
    pub fn stored_entry_count(&self) -> usize {
        let here = self.r * self.c * self.num_blocks();
        here + self.tail.as_ref().map_or(0, |t| t.stored_entry_count())
    }

    /// Reference SpMV: `y <- beta*y + alpha*op(A)*x`, walking block-rows in
    /// order and, within a block-row, blocks left to right — the
    /// deterministic summation order spec.md §4.3 requires.
    pub fn spmv(
        &self,
        op: Operation,
        alpha: Precision,
        x: &[Precision],
        beta: Precision,
        y: &mut [Precision],
    ) -> Result<()> {
        let (expected_x, expected_y) = if op.is_transpose() {
            (self.rows, self.cols)
        } else {
            (self.cols, self.rows)
        };
        if x.len() != expected_x {
            return Err(EngineError::DimensionMismatch {
                expected: expected_x,
                actual: x.len(),
                operation: "bcsr::spmv:x".into(),
            });
        }
        if y.len() != expected_y {
            return Err(EngineError::DimensionMismatch {
                expected: expected_y,
                actual: y.len(),
                operation: "bcsr::spmv:y".into(),
            });
        }

        if beta == 0.0 {
            y.fill(0.0);
        } else if beta != 1.0 {
            for v in y.iter_mut() {
                *v *= beta;
            }
        }
        if alpha == 0.0 {
            return Ok(());
        }

        self.spmv_accumulate(op, alpha, x, y);
        if let Some(tail) = &self.tail {
            tail.spmv_accumulate(op, alpha, x, y);
        }
        Ok(())
    }

    fn spmv_accumulate(&self, op: Operation, alpha: Precision, x: &[Precision], y: &mut [Precision]) {
        let r = self.r;
        let c = self.c;
        let num_block_rows = self.num_block_rows();

        // The trailing block-column may be narrower than `c` when `cols`
        // isn't a multiple of `c`; every block is keyed by its natural,
        // unshifted `j0`, so only that last block can run short of a full
        // `c` columns against the stored `self.cols`.
        if !op.is_transpose() {
            for bi in 0..num_block_rows {
                let row0 = self.row_offset + bi * r;
                let mut acc = vec![0.0; r];
                let start = self.bptr[bi] as usize;
                let end = self.bptr[bi + 1] as usize;
                for k in start..end {
                    let j0 = self.bind[k] as usize;
                    let width = c.min(self.cols - j0);
                    let block = &self.bval[k * r * c..(k + 1) * r * c];
                    for di in 0..r {
                        let mut s = 0.0;
                        for dj in 0..width {
                            s += block[di * c + dj] * x[j0 + dj];
                        }
                        acc[di] += s;
                    }
                }
                for di in 0..r {
                    y[row0 + di] += alpha * acc[di];
                }
            }
        } else {
            for bi in 0..num_block_rows {
                let row0 = self.row_offset + bi * r;
                let start = self.bptr[bi] as usize;
                let end = self.bptr[bi + 1] as usize;
                for k in start..end {
                    let j0 = self.bind[k] as usize;
                    let width = c.min(self.cols - j0);
                    let block = &self.bval[k * r * c..(k + 1) * r * c];
                    for dj in 0..width {
                        let mut s = 0.0;
                        for di in 0..r {
                            s += block[di * c + dj] * x[row0 + di];
                        }
                        y[j0 + dj] += alpha * s;
                    }
                }
            }
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::block::convert;
    use crate::csr::CsrMatrix;

    #[test]
    fn block_friendly_2x2_matches_scenario_4() {
        // 4x4, dense 2x2 at (0..2,0..2) = [[1,2],[3,4]], A[3,3]=5.
        let a = CsrMatrix::from_triplets(
            &[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 4.0), (3, 3, 5.0)],
            4,
            4,
        )
        .unwrap();
        let bcsr = convert::csr_to_bcsr(&a, 2, 2).unwrap();
        assert_eq!(bcsr.stored_entry_count() % 4, 0);

        let x = [1.0, 1.0, 1.0, 1.0];
        let mut y = [0.0; 4];
        bcsr.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y, [3.0, 7.0, 0.0, 5.0]);
    }
}
