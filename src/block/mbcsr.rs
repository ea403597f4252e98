//! Modified BCSR (MBCSR): BCSR with the diagonal `r x r` block of each
//! block-row extracted into a separate dense array, letting the main loop
//! skip a range check and the diagonal be handled by a specialized kernel.

use super::bcsr::BcsrMatrix;
use crate::error::{EngineError, Result};
use crate::types::{Operation, Precision};

/// Off-diagonal blocks plus a dense diagonal-block array.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MbcsrMatrix {
    /// Off-diagonal blocks, in the same `(r, c)` blocking as a plain BCSR.
    pub(crate) off_diagonal: BcsrMatrix,
    /// `num_block_rows * r * r` values, row-major per block, diagonal block
    /// `I` at `bdiag[I*r*r .. (I+1)*r*r]`.
    pub(crate) bdiag: alloc::vec::Vec<Precision>,
    /// First row covered by the diagonal blocks (`[d0, d0 + M*r)`).
    pub(crate) d0: usize,
    pub(crate) r: usize,
}

impl MbcsrMatrix {
    pub fn r(&self) -> usize {
        self.r
    }

    pub fn c(&self) -> usize {
        self.off_diagonal.c()
    }

    pub fn rows(&self) -> usize {
        self.off_diagonal.rows()
    }

    pub fn cols(&self) -> usize {
        self.off_diagonal.cols()
    }

    pub fn off_diagonal(&self) -> &BcsrMatrix {
        &self.off_diagonal
    }

    pub fn bdiag(&self) -> &[Precision] {
        &self.bdiag
    }

    pub fn d0(&self) -> usize {
        self.d0
    }

    pub fn num_diagonal_blocks(&self) -> usize {
        if self.r == 0 {
            0
        } else {
            self.bdiag.len() / (self.r * self.r)
        }
    }

    /// `r*c*|off-diag blocks| + r*r*|diagonal blocks|`.
    pub fn stored_entry_count(&self) -> usize {
        self.off_diagonal.stored_entry_count() + self.bdiag.len()
    }

    pub fn spmv(
        &self,
        op: Operation,
        alpha: Precision,
        x: &[Precision],
        beta: Precision,
        y: &mut [Precision],
    ) -> Result<()> {
        let (expected_x, expected_y) = if op.is_transpose() {
            (self.rows(), self.cols())
        } else {
            (self.cols(), self.rows())
        };
        if x.len() != expected_x {
            return Err(EngineError::DimensionMismatch {
                expected: expected_x,
                actual: x.len(),
                operation: "mbcsr::spmv:x".into(),
            });
        }
        if y.len() != expected_y {
            return Err(EngineError::DimensionMismatch {
                expected: expected_y,
                actual: y.len(),
                operation: "mbcsr::spmv:y".into(),
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

        self.off_diagonal.spmv(op, alpha, x, 1.0, y)?;

        let r = self.r;
        let num_diag = self.num_diagonal_blocks();
        if !op.is_transpose() {
            for bi in 0..num_diag {
                let row0 = self.d0 + bi * r;
                let block = &self.bdiag[bi * r * r..(bi + 1) * r * r];
                for di in 0..r {
                    let mut s = 0.0;
                    for dj in 0..r {
                        s += block[di * r + dj] * x[row0 + dj];
                    }
                    y[row0 + di] += alpha * s;
                }
            }
        } else {
            for bi in 0..num_diag {
                let row0 = self.d0 + bi * r;
                let block = &self.bdiag[bi * r * r..(bi + 1) * r * r];
                for dj in 0..r {
                    let mut s = 0.0;
                    for di in 0..r {
                        s += block[di * r + dj] * x[row0 + di];
                    }
                    y[row0 + dj] += alpha * s;
                }
            }
        }

        Ok(())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::block::convert;
    use crate::csr::CsrMatrix;

    #[test]
    fn mbcsr_matches_bcsr_semantics() {
        let a = CsrMatrix::from_triplets(
            &[(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0), (1, 1, 4.0), (3, 3, 5.0)],
            4,
            4,
        )
        .unwrap();
        let mbcsr = convert::csr_to_mbcsr(&a, 2, 2).unwrap();
        let x = [1.0, 1.0, 1.0, 1.0];
        let mut y = [0.0; 4];
        mbcsr.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y, [3.0, 7.0, 0.0, 5.0]);
    }
}
