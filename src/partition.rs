//! Partitioner (C8): splits a CSR matrix across `P` workers, either by
//! row-range (OneD, rows never shared) or by non-zero-balanced row-range
//! (SemiOneD, boundary rows may be shared between adjacent partitions).
//!
//! The OneD sweep is grounded directly in the reference partitioner's
//! greedy boundary search: having fixed partition `p`'s start row, advance
//! the smallest possible number of rows until the cumulative non-zero
//! count reaches this partition's share of what remains, tie-breaking on
//! the smallest row index when several rows would satisfy the target
//! equally (spec.md §9, Open Question).

use crate::csr::{AssertedProperties, CsrMatrix};
use crate::error::Result;
use crate::types::{DimensionType, PartitionKind};
use alloc::vec::Vec;

/// One partition's row span and the half-open range of non-zero slots
/// (indices into the parent's `ind`/`val` arrays) it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    /// First row this partition covers.
    pub row_start: DimensionType,
    /// One past the last row this partition covers.
    pub row_end: DimensionType,
    /// First non-zero slot (inclusive).
    pub k_start: usize,
    /// One past the last non-zero slot.
    pub k_end: usize,
}

impl PartitionRange {
    pub fn num_rows(&self) -> usize {
        self.row_end - self.row_start
    }

    pub fn nnz(&self) -> usize {
        self.k_end - self.k_start
    }
}

/// Compute a partition plan for `csr` targeting `requested_partitions`
/// sub-matrices, clamping per spec.md §4.6 (`nthreads <= nrows` for OneD,
/// `nthreads <= nnz` for SemiOneD).
pub fn plan(csr: &CsrMatrix<'_>, kind: PartitionKind, requested_partitions: usize) -> Vec<PartitionRange> {
    let m = csr.rows();
    if m == 0 {
        return Vec::new();
    }

    match kind {
        PartitionKind::OneD => {
            let p = requested_partitions.max(1).min(m);
            if p != requested_partitions {
                log::debug!("OneD partition count clamped from {requested_partitions} to {p} (rows={m})");
            }
            partition_one_d(csr, p)
        }
        PartitionKind::SemiOneD => {
            let p = requested_partitions.max(1).min(csr.nnz().max(1));
            if p != requested_partitions {
                log::debug!("SemiOneD partition count clamped from {requested_partitions} to {p} (nnz={})", csr.nnz());
            }
            partition_semi_one_d(csr, p)
        }
    }
}

fn partition_one_d(csr: &CsrMatrix<'_>, p: usize) -> Vec<PartitionRange> {
    let m = csr.rows();
    let nnz = csr.nnz();
    let mut ranges = Vec::with_capacity(p);

    let mut row_cursor = 0usize;
    let mut remaining_nnz = nnz;
    let mut remaining_partitions = p;

    while remaining_partitions > 0 {
        let remaining_rows = m - row_cursor;

        if remaining_partitions == 1 {
            let row_start = row_cursor;
            let k_start = csr.row_range(row_start).0;
            ranges.push(PartitionRange { row_start, row_end: m, k_start, k_end: nnz });
            break;
        }

        if remaining_partitions == remaining_rows {
            // Degenerate case: exactly one row left per remaining partition.
            let row_start = row_cursor;
            let (k_start, k_end) = csr.row_range(row_start);
            ranges.push(PartitionRange { row_start, row_end: row_start + 1, k_start, k_end });
            remaining_nnz -= k_end - k_start;
            row_cursor += 1;
            remaining_partitions -= 1;
            continue;
        }

        let target = (remaining_nnz + remaining_partitions - 1) / remaining_partitions;
        let row_start = row_cursor;
        let base_k = csr.row_range(row_start).0;

        // Leave at least one row per remaining partition (including this
        // one's successors), so a target that's unreachable before the
        // last row can't swallow every row into this single partition.
        let max_row_end = m - (remaining_partitions - 1);
        let mut i = row_start;
        while i + 1 < max_row_end {
            let cumulative = csr.row_range(i).1 - base_k;
            if cumulative >= target {
                break;
            }
            i += 1;
        }

        let row_end = i + 1;
        let k_end = csr.row_range(row_end - 1).1;
        ranges.push(PartitionRange { row_start, row_end, k_start: base_k, k_end });
        remaining_nnz -= k_end - base_k;
        row_cursor = row_end;
        remaining_partitions -= 1;
    }

    ranges
}

fn partition_semi_one_d(csr: &CsrMatrix<'_>, p: usize) -> Vec<PartitionRange> {
    let nnz = csr.nnz();
    let base_target = nnz / p;
    let remainder = nnz % p;

    let mut ranges = Vec::with_capacity(p);
    let mut k_cursor = 0usize;

    for idx in 0..p {
        let target = base_target + if idx < remainder { 1 } else { 0 };
        let k_start = k_cursor;
        let k_end = if idx == p - 1 { nnz } else { (k_cursor + target).min(nnz) };

        let row_start = row_containing(csr, k_start);
        let row_end = if k_end > k_start { row_containing(csr, k_end - 1) + 1 } else { row_start };

        ranges.push(PartitionRange { row_start, row_end, k_start, k_end });
        k_cursor = k_end;
    }

    ranges
}

/// Smallest row `i` with `row_range(i).1 > k`, i.e. the row that owns
/// non-zero slot `k`.
fn row_containing(csr: &CsrMatrix<'_>, k: usize) -> usize {
    let m = csr.rows();
    let mut lo = 0usize;
    let mut hi = m;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if csr.row_range(mid).1 > k {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo.min(m.saturating_sub(1))
}

/// Materialize a sub-matrix CSR for `range`: an owned row-pointer array
/// local to the sub-matrix's own row numbering, plus owned copies of the
/// parent's `ind`/`val` slices for that range.
///
/// Sub-matrices always own their arrays rather than borrowing from the
/// parent: a handle's sub-matrices must outlive the borrow used to build
/// them (they are stored back on the handle alongside the parent), which a
/// borrowed slice cannot do without unsafe self-reference. This applies
/// uniformly regardless of whether the parent itself is in shared or copy
/// mode.
pub fn materialize(csr: &CsrMatrix<'_>, range: &PartitionRange) -> Result<CsrMatrix<'static>> {
    let num_local_rows = range.num_rows();
    let mut local_ptr = alloc::vec![0u32; num_local_rows + 1];

    for i in 0..num_local_rows {
        let global_row = range.row_start + i;
        let (gs, ge) = csr.row_range(global_row);
        let s = gs.max(range.k_start);
        let e = ge.min(range.k_end);
        local_ptr[i + 1] = local_ptr[i] + (e - s) as u32;
    }

    let ind = csr.col_ind()[range.k_start..range.k_end].to_vec();
    let val = csr.values()[range.k_start..range.k_end].to_vec();

    // Sub-matrices are row-range slices: the parent's triangular/symmetric
    // shape has no meaning once rows and columns no longer line up
    // one-to-one, so partitioning always operates on (or first expands
    // to) general shape. Callers with a symmetric/Hermitian matrix must
    // call `expand_symmetric_to_full` before partitioning.
    let props = AssertedProperties {
        sorted: csr.is_sorted(),
        unique: true,
        shape: crate::types::StoredShape::General,
        ..AssertedProperties::default()
    };

    CsrMatrix::from_owned(local_ptr, ind, val, num_local_rows, csr.cols(), props, true)
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::types::Operation;

    fn eight_by_four() -> CsrMatrix<'static> {
        // one non-zero per row, value = row index, column = row index mod 4
        let triplets: Vec<(usize, usize, f64)> = (0..8).map(|i| (i, i % 4, i as f64)).collect();
        CsrMatrix::from_triplets(&triplets, 8, 4).unwrap()
    }

    #[test]
    fn one_d_partitions_never_share_rows() {
        let a = eight_by_four();
        let ranges = plan(&a, PartitionKind::OneD, 3);
        assert_eq!(ranges.first().unwrap().row_start, 0);
        assert_eq!(ranges.last().unwrap().row_end, 8);
        for w in ranges.windows(2) {
            assert_eq!(w[0].row_end, w[1].row_start);
        }
        let total_rows: usize = ranges.iter().map(|r| r.num_rows()).sum();
        assert_eq!(total_rows, 8);
    }

    #[test]
    fn semi_one_d_can_share_a_row_and_matches_single_threaded_reference() {
        let a = eight_by_four();
        let ranges = plan(&a, PartitionKind::SemiOneD, 3);
        let total_nnz: usize = ranges.iter().map(|r| r.nnz()).sum();
        assert_eq!(total_nnz, a.nnz());

        let x = [1.0, 1.0, 1.0, 1.0];
        let mut y_reference = [0.0; 8];
        a.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y_reference).unwrap();

        let mut y = [0.0f64; 8];
        for range in &ranges {
            let sub = materialize(&a, range).unwrap();
            let mut sub_y = alloc::vec![0.0; sub.rows()];
            sub.spmv(Operation::Normal, 1.0, &x, 0.0, &mut sub_y).unwrap();
            for (i, v) in sub_y.iter().enumerate() {
                y[range.row_start + i] += v;
            }
        }
        assert_eq!(y, y_reference);
    }

    #[test]
    fn one_d_clamps_partition_count_to_row_count() {
        let a = CsrMatrix::from_triplets(&[(0, 0, 1.0)], 1, 1).unwrap();
        let ranges = plan(&a, PartitionKind::OneD, 8);
        assert_eq!(ranges.len(), 1);
    }
}
