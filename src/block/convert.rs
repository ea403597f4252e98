//! CSR → block-store conversion (C3), and the reverse.
//!
//! BCSR conversion is two passes over the input, each `O(nnz)`: a counting
//! pass that marks visited block-columns per block-row with a scratch
//! flag array (cleared by a second sweep rather than reallocated, so the
//! whole pass stays linear), and a copying pass that accumulates each
//! block's dense contents in a scratch buffer before emitting it.

use super::bcsr::BcsrMatrix;
use super::mbcsr::MbcsrMatrix;
use super::BlockStore;
use crate::csr::CsrMatrix;
use crate::error::{EngineError, Result};
use crate::types::Precision;
use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use bit_set::BitSet;

/// Convert `csr` to BCSR with block size `(r, c)`. Leftover rows (`rows mod
/// r`) are converted recursively as a single block-row of the remaining
/// height, per spec.md §4.2.
pub fn csr_to_bcsr(csr: &CsrMatrix<'_>, r: usize, c: usize) -> Result<BcsrMatrix> {
    if r == 0 || c == 0 {
        return Err(EngineError::BadArg {
            parameter: "(r, c)".into(),
            message: "block dimensions must be positive".into(),
        });
    }

    let m = csr.rows();
    let n = csr.cols();
    let full_block_rows = m / r;
    let leftover = m - full_block_rows * r;

    let (bptr, bind, bval) = convert_level(csr, 0, r, full_block_rows, c, None);

    let tail = if leftover > 0 {
        let (tptr, tind, tval) = convert_level(csr, full_block_rows * r, leftover, 1, c, None);
        Some(Box::new(BcsrMatrix {
            rows: m,
            cols: n,
            r: leftover,
            c,
            row_offset: full_block_rows * r,
            bptr: tptr,
            bind: tind,
            bval: tval,
        }))
    } else {
        None
    };

    Ok(BcsrMatrix {
        rows: m,
        cols: n,
        r,
        c,
        row_offset: 0,
        bptr,
        bind,
        bval,
        tail,
    })
}

/// Convert `csr` to MBCSR with block size `(r, c)`: like [`csr_to_bcsr`],
/// but entries that fall within the `r x r` diagonal tile of their
/// block-row are routed into `bdiag` instead of an off-diagonal block.
/// Leftover rows do not participate in diagonal extraction (there is no
/// full `r x r` tile to extract) and are stored as an ordinary BCSR tail.
pub fn csr_to_mbcsr(csr: &CsrMatrix<'_>, r: usize, c: usize) -> Result<MbcsrMatrix> {
    if r == 0 || c == 0 {
        return Err(EngineError::BadArg {
            parameter: "(r, c)".into(),
            message: "block dimensions must be positive".into(),
        });
    }

    let m = csr.rows();
    let n = csr.cols();
    let full_block_rows = m / r;
    let leftover = m - full_block_rows * r;

    let mut bdiag = vec![0.0; full_block_rows * r * r];
    let (bptr, bind, bval) = convert_level(csr, 0, r, full_block_rows, c, Some(&mut bdiag));

    let tail = if leftover > 0 {
        let (tptr, tind, tval) = convert_level(csr, full_block_rows * r, leftover, 1, c, None);
        Some(Box::new(BcsrMatrix {
            rows: m,
            cols: n,
            r: leftover,
            c,
            row_offset: full_block_rows * r,
            bptr: tptr,
            bind: tind,
            bval: tval,
        }))
    } else {
        None
    };

    let off_diagonal = BcsrMatrix {
        rows: m,
        cols: n,
        r,
        c,
        row_offset: 0,
        bptr,
        bind,
        bval,
        tail,
    };

    Ok(MbcsrMatrix {
        off_diagonal,
        bdiag,
        d0: 0,
        r,
    })
}

/// Build one block-row level: `num_block_rows` rows of height `r_block`
/// starting at `row_start`, blocked in columns of width `c`.
///
/// When `bdiag` is `Some`, entries whose column falls inside the current
/// block-row's own row-range (the diagonal tile) are written there instead
/// of into a regular block.
fn convert_level(
    csr: &CsrMatrix<'_>,
    row_start: usize,
    r_block: usize,
    num_block_rows: usize,
    c: usize,
    mut bdiag: Option<&mut [Precision]>,
) -> (Vec<u32>, Vec<u32>, Vec<Precision>) {
    let n = csr.cols();
    let num_block_cols = (n + c - 1) / c;
    let extract_diag = bdiag.is_some();

    let mut bptr = vec![0u32; num_block_rows + 1];
    let mut visited = BitSet::with_capacity(num_block_cols);

    // Pass 1: count distinct block-columns touched per block-row.
    let mut total_blocks = 0usize;
    for bi in 0..num_block_rows {
        let mut count = 0usize;
        for row in (row_start + bi * r_block)..(row_start + bi * r_block + r_block) {
            for (col, _) in csr.row_iter(row) {
                if extract_diag && is_diagonal_tile(col, row_start + bi * r_block, r_block) {
                    continue;
                }
                let block_col = col / c;
                if !visited.contains(block_col) {
                    visited.insert(block_col);
                    count += 1;
                }
            }
        }
        // Clear flags with a second sweep rather than reallocating, to
        // keep the whole pass O(nnz).
        for row in (row_start + bi * r_block)..(row_start + bi * r_block + r_block) {
            for (col, _) in csr.row_iter(row) {
                if extract_diag && is_diagonal_tile(col, row_start + bi * r_block, r_block) {
                    continue;
                }
                visited.remove(col / c);
            }
        }
        total_blocks += count;
        bptr[bi + 1] = bptr[bi] + count as u32;
    }

    // Pass 2: accumulate each block's contents in a scratch buffer, then
    // emit. Scratch is indexed by (block_col, di, dj).
    let mut bind = vec![0u32; total_blocks];
    let mut bval = vec![0.0; total_blocks * r_block * c];
    let mut scratch = vec![0.0; r_block * (n + c)];
    let mut block_j0 = vec![usize::MAX; num_block_cols];

    for bi in 0..num_block_rows {
        let mut next_slot = bptr[bi] as usize;
        let row0 = row_start + bi * r_block;

        for (di, row) in (row0..row0 + r_block).enumerate() {
            for (col, value) in csr.row_iter(row) {
                if extract_diag && is_diagonal_tile(col, row0, r_block) {
                    if let Some(diag) = bdiag.as_deref_mut() {
                        let local = col - row0;
                        diag[bi * r_block * r_block + di * r_block + local] += value;
                    }
                    continue;
                }
                let block_col = col / c;
                let j0 = block_col * c;
                if block_j0[block_col] == usize::MAX {
                    block_j0[block_col] = next_slot;
                    bind[next_slot] = j0 as u32;
                    next_slot += 1;
                }
                let slot = block_j0[block_col];
                let local_col = col - j0;
                scratch[block_col * r_block * c + di * c + local_col] += value;
            }
        }

        // Emit blocks touched in this block-row, in ascending block-column
        // order (visitation order already ascending since rows are
        // scanned in column-sorted order and `row_iter` yields ascending
        // columns — ties broken by first occurrence).
        let start = bptr[bi] as usize;
        let end = bptr[bi + 1] as usize;
        let mut touched: Vec<(usize, u32)> = (start..end).map(|slot| (bind[slot] as usize / c, bind[slot])).collect();
        touched.sort_unstable_by_key(|&(block_col, _)| block_col);
        for (k, (block_col, j0)) in touched.into_iter().enumerate() {
            let slot = start + k;
            bind[slot] = j0;
            let src = &scratch[block_col * r_block * c..(block_col + 1) * r_block * c];
            bval[slot * r_block * c..(slot + 1) * r_block * c].copy_from_slice(src);
            // zero the scratch for reuse by the next block-row
            scratch[block_col * r_block * c..(block_col + 1) * r_block * c].fill(0.0);
            block_j0[block_col] = usize::MAX;
        }
    }

    (bptr, bind, bval)
}

fn is_diagonal_tile(col: usize, row0: usize, r_block: usize) -> bool {
    col >= row0 && col < row0 + r_block
}

/// Reverse conversion: materialize a block store's explicit entries
/// (including stored zeros) back into row-major, sorted CSR.
pub fn block_store_to_csr(store: &BlockStore) -> Result<CsrMatrix<'static>> {
    let mut triplets: Vec<(usize, usize, Precision)> = Vec::new();
    match store {
        BlockStore::Bcsr(b) => collect_bcsr_triplets(b, &mut triplets),
        BlockStore::Mbcsr(m) => {
            collect_bcsr_triplets(&m.off_diagonal, &mut triplets);
            let r = m.r();
            for bi in 0..m.num_diagonal_blocks() {
                let row0 = m.d0() + bi * r;
                let block = &m.bdiag()[bi * r * r..(bi + 1) * r * r];
                for di in 0..r {
                    for dj in 0..r {
                        triplets.push((row0 + di, row0 + dj, block[di * r + dj]));
                    }
                }
            }
        }
    }

    let rows = store.rows();
    let cols = store.cols();
    triplets.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    triplets.dedup_by(|a, b| {
        if a.0 == b.0 && a.1 == b.1 {
            b.2 += a.2;
            true
        } else {
            false
        }
    });
    CsrMatrix::from_triplets(&triplets, rows, cols)
}

fn collect_bcsr_triplets(bcsr: &BcsrMatrix, out: &mut Vec<(usize, usize, Precision)>) {
    let r = bcsr.r();
    let c = bcsr.c();
    let cols = bcsr.cols();
    for bi in 0..bcsr.num_block_rows() {
        let row0 = bcsr.row_offset() + bi * r;
        let start = bcsr.bptr()[bi] as usize;
        let end = bcsr.bptr()[bi + 1] as usize;
        for k in start..end {
            let j0 = bcsr.bind()[k] as usize;
            let width = c.min(cols - j0);
            let block = &bcsr.bval()[k * r * c..(k + 1) * r * c];
            for di in 0..r {
                for dj in 0..width {
                    out.push((row0 + di, j0 + dj, block[di * c + dj]));
                }
            }
        }
    }
    if let Some(tail) = bcsr.tail() {
        collect_bcsr_triplets(tail, out);
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::csr::CsrMatrix;

    #[test]
    fn roundtrip_is_identity_up_to_index_order() {
        let a = CsrMatrix::from_triplets(
            &[
                (0, 0, 1.0),
                (0, 1, 2.0),
                (1, 0, 3.0),
                (1, 1, 4.0),
                (2, 2, 9.0),
                (3, 3, 5.0),
            ],
            4,
            4,
        )
        .unwrap();
        let bcsr = csr_to_bcsr(&a, 2, 2).unwrap();
        let back = BlockStore::Bcsr(bcsr).to_csr().unwrap();

        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(a.get_entry(i, j).unwrap(), back.get_entry(i, j).unwrap());
            }
        }
    }

    #[test]
    fn block_count_is_at_least_nnz() {
        let a = CsrMatrix::from_triplets(&[(0, 0, 1.0), (0, 1, 2.0), (2, 3, 3.0)], 4, 4).unwrap();
        let bcsr = csr_to_bcsr(&a, 2, 2).unwrap();
        assert!(bcsr.stored_entry_count() >= a.nnz());
        assert_eq!(bcsr.stored_entry_count() % 4, 0);
    }

    #[test]
    fn leftover_rows_handled_via_tail() {
        // 5 rows, r=2 -> 2 full block-rows + 1 leftover row.
        let a = CsrMatrix::from_triplets(&[(4, 0, 7.0)], 5, 3).unwrap();
        let bcsr = csr_to_bcsr(&a, 2, 2).unwrap();
        assert!(bcsr.tail().is_some());
        let x = [1.0, 1.0, 1.0];
        let mut y = [0.0; 5];
        bcsr.spmv(crate::types::Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y[4], 7.0);
    }
}
