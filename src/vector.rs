//! Vector view & partitioned-vector builder (C9): dense-vector descriptors
//! and their per-partition slices, including the private per-thread output
//! buffers the reduction step (C11) needs when sub-kernels would otherwise
//! race on overlapping output rows.

use crate::error::{EngineError, Result};
use crate::partition::PartitionRange;
use crate::types::{Precision, Stride};
use alloc::vec;
use alloc::vec::Vec;

/// Orientation of a multivector's backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    RowMajor,
    ColMajor,
}

/// A dense vector (or multivector column set) descriptor: pointer, length,
/// stride, and — for a multivector — column count and storage layout.
#[derive(Debug, Clone, Copy)]
pub struct VectorView<'a> {
    data: &'a [Precision],
    length: usize,
    num_vecs: usize,
    stride: usize,
    layout: Layout,
}

impl<'a> VectorView<'a> {
    /// A single dense vector of `length` entries with increment `inc`.
    pub fn single(data: &'a [Precision], length: usize, inc: usize) -> Result<Self> {
        if inc == 0 {
            return Err(EngineError::BadArg {
                parameter: "inc".into(),
                message: "increment must be >= 1".into(),
            });
        }
        let required = if length == 0 { 0 } else { (length - 1) * inc + 1 };
        if data.len() < required {
            return Err(EngineError::DimensionMismatch {
                expected: required,
                actual: data.len(),
                operation: "VectorView::single".into(),
            });
        }
        Ok(Self { data, length, num_vecs: 1, stride: inc, layout: Layout::ColMajor })
    }

    /// A multivector of `num_vecs` columns, each of `length` entries.
    /// `stride` must be `>= length` for column-major storage or
    /// `>= num_vecs` for row-major storage (spec.md §6).
    pub fn multi(data: &'a [Precision], length: usize, num_vecs: usize, layout: Layout, stride: usize) -> Result<Self> {
        let min_stride = match layout {
            Layout::ColMajor => length,
            Layout::RowMajor => num_vecs,
        };
        if stride < min_stride {
            return Err(EngineError::BadArg {
                parameter: "stride".into(),
                message: alloc::format!("stride must be >= {min_stride}"),
            });
        }
        let required = match layout {
            Layout::ColMajor => stride * num_vecs.max(1),
            Layout::RowMajor => stride * length.max(1),
        };
        if data.len() < required {
            return Err(EngineError::DimensionMismatch {
                expected: required,
                actual: data.len(),
                operation: "VectorView::multi".into(),
            });
        }
        Ok(Self { data, length, num_vecs, stride, layout })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn num_vecs(&self) -> usize {
        self.num_vecs
    }

    pub fn is_unit_stride(&self, col: usize) -> bool {
        self.element_stride(col) == 1
    }

    fn element_stride(&self, col: usize) -> usize {
        let _ = col;
        match self.layout {
            Layout::ColMajor if self.num_vecs == 1 => self.stride,
            Layout::ColMajor => 1,
            Layout::RowMajor => self.stride,
        }
    }

    fn base_offset(&self, col: usize) -> usize {
        match self.layout {
            Layout::ColMajor => col * self.stride,
            Layout::RowMajor => col,
        }
    }

    /// Borrow column `col` directly when it is contiguous (unit element
    /// stride); returns `None` otherwise, in which case callers should use
    /// [`VectorView::gather`].
    pub fn as_contiguous(&self, col: usize) -> Option<&'a [Precision]> {
        if !self.is_unit_stride(col) {
            return None;
        }
        let offset = self.base_offset(col);
        self.data.get(offset..offset + self.length)
    }

    /// Copy column `col` into a contiguous scratch buffer, honoring
    /// whatever stride the view has. Kernels always operate on contiguous
    /// slices; strided views pay this gather/scatter cost (spec.md §4.3:
    /// general-stride falls back to the general-stride variant, which in
    /// this implementation is "gather, compute, scatter").
    pub fn gather(&self, col: usize) -> Vec<Precision> {
        if let Some(slice) = self.as_contiguous(col) {
            return slice.to_vec();
        }
        let stride = self.element_stride(col);
        let offset = self.base_offset(col);
        (0..self.length).map(|i| self.data[offset + i * stride]).collect()
    }

    pub fn stride(&self) -> Stride {
        Stride::from_inc(self.stride)
    }
}

/// One partition's backing storage for a vector: a direct slice when the
/// partition plan guarantees no other partition touches these cells, or a
/// private, independently zero-initialized buffer when outputs may
/// overlap (SemiOneD, or OneD under transpose).
pub enum SubBuffer {
    /// Private buffer covering `[0, full_length)` — used when every
    /// sub-kernel may write anywhere in the output (the transpose case).
    PrivateFull(Vec<Precision>),
    /// Private buffer covering just this partition's row-range — used for
    /// SemiOneD-normal, where only neighboring partitions might overlap at
    /// the edges.
    PrivateRange(Vec<Precision>),
}

impl SubBuffer {
    pub fn as_slice(&self) -> &[Precision] {
        match self {
            SubBuffer::PrivateFull(v) | SubBuffer::PrivateRange(v) => v,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [Precision] {
        match self {
            SubBuffer::PrivateFull(v) | SubBuffer::PrivateRange(v) => v,
        }
    }
}

/// A vector of sub-views aligned with a partition plan.
pub struct PartitionedOutput {
    pub buffers: Vec<SubBuffer>,
    pub full_length: usize,
    /// Whether each buffer's row 0 corresponds to global row
    /// `ranges[i].row_start` (`PrivateRange`) or to global row `0`
    /// (`PrivateFull`).
    pub needs_full_reduction: bool,
}

/// Build the private output buffers a parallel SpMV call needs: one
/// full-length zeroed buffer per partition when `op` is a transpose (every
/// sub-matrix can write anywhere in `y`), or one row-range-sized zeroed
/// buffer per partition for SemiOneD-normal (only shared boundary rows
/// need reducing).
pub fn build_private_outputs(ranges: &[PartitionRange], full_length: usize, needs_full_reduction: bool) -> PartitionedOutput {
    let buffers = ranges
        .iter()
        .map(|r| {
            if needs_full_reduction {
                SubBuffer::PrivateFull(vec![0.0; full_length])
            } else {
                SubBuffer::PrivateRange(vec![0.0; r.num_rows()])
            }
        })
        .collect();
    PartitionedOutput { buffers, full_length, needs_full_reduction }
}
