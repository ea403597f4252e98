//! Reduction (C11): folds per-partition private output buffers into the
//! user-visible `y`, applying `β` exactly once.
//!
//! OneD-normal needs no reduction at all — each sub-kernel's output range
//! is disjoint and writes straight into `y` (handled by the executor, not
//! this module). This module covers the two cases that *do* overlap:
//! OneD-transpose and any SemiOneD call, per spec.md §4.9.

use crate::partition::PartitionRange;
use crate::types::Precision;
use crate::vector::{PartitionedOutput, SubBuffer};

/// Fold `outputs` into `y`, applying `beta` exactly once per row.
///
/// Summation order within a row is by ascending partition index — this
/// must be stable across runs (spec.md §4.9) so floating-point results
/// stay reproducible for a fixed partition count.
pub fn reduce(outputs: &mut PartitionedOutput, ranges: &[PartitionRange], beta: Precision, y: &mut [Precision]) {
    if outputs.needs_full_reduction {
        reduce_full(outputs, beta, y);
    } else {
        reduce_by_range(outputs, ranges, beta, y);
    }
}

fn reduce_full(outputs: &mut PartitionedOutput, beta: Precision, y: &mut [Precision]) {
    for row in 0..outputs.full_length {
        let mut total = 0.0;
        for buffer in &mut outputs.buffers {
            let slice = buffer.as_mut_slice();
            total += slice[row];
            slice[row] = 0.0;
        }
        y[row] = total + beta * y[row];
    }
}

fn reduce_by_range(outputs: &mut PartitionedOutput, ranges: &[PartitionRange], beta: Precision, y: &mut [Precision]) {
    for row in 0..outputs.full_length {
        let mut total = 0.0;
        let mut touched = false;
        for (range, buffer) in ranges.iter().zip(outputs.buffers.iter_mut()) {
            if row < range.row_start || row >= range.row_end {
                continue;
            }
            touched = true;
            let local = row - range.row_start;
            let slice = buffer.as_mut_slice();
            total += slice[local];
            slice[local] = 0.0;
        }
        if touched {
            y[row] = total + beta * y[row];
        } else {
            y[row] = beta * y[row];
        }
    }
}

/// Whether a given `(op, partition_kind)` combination produces overlapping
/// output rows and so requires a [`SubBuffer::PrivateFull`] /
/// [`SubBuffer::PrivateRange`] reduction pass rather than direct
/// disjoint writes.
pub fn needs_reduction(is_transpose: bool, is_semi_one_d: bool) -> bool {
    is_transpose || is_semi_one_d
}

/// Whether overlap, when present, spans the whole output (transpose) or
/// only neighboring partitions' shared boundary rows (SemiOneD-normal).
pub fn needs_full_buffers(is_transpose: bool) -> bool {
    is_transpose
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::vector::build_private_outputs;

    #[test]
    fn full_reduction_sums_all_buffers_in_partition_order() {
        let ranges = [
            PartitionRange { row_start: 0, row_end: 2, k_start: 0, k_end: 1 },
            PartitionRange { row_start: 0, row_end: 2, k_start: 1, k_end: 2 },
        ];
        let mut outputs = build_private_outputs(&ranges, 2, true);
        if let SubBuffer::PrivateFull(v) = &mut outputs.buffers[0] {
            v[0] = 1.0;
            v[1] = 2.0;
        }
        if let SubBuffer::PrivateFull(v) = &mut outputs.buffers[1] {
            v[0] = 10.0;
            v[1] = 20.0;
        }
        let mut y = [100.0, 100.0];
        reduce(&mut outputs, &ranges, 0.0, &mut y);
        assert_eq!(y, [11.0, 22.0]);

        // Buffers must be zeroed for reuse.
        assert_eq!(outputs.buffers[0].as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn beta_applied_exactly_once() {
        let ranges = [PartitionRange { row_start: 0, row_end: 1, k_start: 0, k_end: 1 }];
        let mut outputs = build_private_outputs(&ranges, 1, true);
        if let SubBuffer::PrivateFull(v) = &mut outputs.buffers[0] {
            v[0] = 5.0;
        }
        let mut y = [2.0];
        reduce(&mut outputs, &ranges, 3.0, &mut y);
        assert_eq!(y, [5.0 + 3.0 * 2.0]);
    }

    #[test]
    fn range_reduction_handles_shared_boundary_row() {
        // Two partitions share row 1.
        let ranges = [
            PartitionRange { row_start: 0, row_end: 2, k_start: 0, k_end: 1 },
            PartitionRange { row_start: 1, row_end: 3, k_start: 1, k_end: 2 },
        ];
        let mut outputs = build_private_outputs(&ranges, 3, false);
        if let SubBuffer::PrivateRange(v) = &mut outputs.buffers[0] {
            v[0] = 1.0;
            v[1] = 2.0;
        }
        if let SubBuffer::PrivateRange(v) = &mut outputs.buffers[1] {
            v[0] = 20.0;
            v[1] = 30.0;
        }
        let mut y = [0.0; 3];
        reduce(&mut outputs, &ranges, 0.0, &mut y);
        assert_eq!(y, [1.0, 2.0 + 20.0, 30.0]);
    }
}
