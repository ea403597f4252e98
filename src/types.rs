//! Common types and type aliases used throughout the engine.
//!
//! This module defines the fundamental scalar and index types, and the small
//! enumerations that describe matrix shape, operator, and threading/partition
//! choices shared across components.

use alloc::string::String;
use core::fmt;

/// Floating-point precision used for matrix and vector values.
///
/// Fixed to `f64`, matching the reference engine's numerical semantics
/// (accumulation happens in the value type, never a wider intermediate).
pub type Precision = f64;

/// Integer type for column/row indices within a matrix.
pub type IndexType = u32;

/// Type used for matrix/vector dimensions and counts.
pub type DimensionType = usize;

/// Index base (0- or 1-based) a CSR matrix's arrays are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexBase {
    /// `ptr[0] == 0`, column indices in `[0, n)`.
    Zero,
    /// `ptr[0] == 1`, column indices in `[1, n+1)`.
    One,
}

impl IndexBase {
    /// The numeric value of this base.
    pub fn value(self) -> IndexType {
        match self {
            IndexBase::Zero => 0,
            IndexBase::One => 1,
        }
    }
}

/// Stored shape of a matrix, i.e. which triangle is explicitly stored and
/// whether the matrix is asserted symmetric/Hermitian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StoredShape {
    /// No symmetry; every explicitly-stored entry stands for itself.
    General,
    /// Only entries with `col >= row` are stored.
    UpperTriangular,
    /// Only entries with `col <= row` are stored.
    LowerTriangular,
    /// Symmetric matrix, upper triangle stored.
    SymmetricUpper,
    /// Symmetric matrix, lower triangle stored.
    SymmetricLower,
    /// Symmetric matrix, fully stored.
    SymmetricFull,
    /// Hermitian matrix, upper triangle stored.
    HermitianUpper,
    /// Hermitian matrix, lower triangle stored.
    HermitianLower,
    /// Hermitian matrix, fully stored.
    HermitianFull,
}

impl StoredShape {
    /// Whether this shape asserts some form of symmetry (real or Hermitian).
    pub fn is_symmetric_like(self) -> bool {
        !matches!(
            self,
            StoredShape::General | StoredShape::UpperTriangular | StoredShape::LowerTriangular
        )
    }

    /// Whether this shape asserts conjugate (Hermitian) symmetry.
    pub fn is_hermitian(self) -> bool {
        matches!(
            self,
            StoredShape::HermitianUpper | StoredShape::HermitianLower | StoredShape::HermitianFull
        )
    }

    /// Whether only the upper triangle is explicitly stored.
    pub fn is_upper_only(self) -> bool {
        matches!(
            self,
            StoredShape::UpperTriangular | StoredShape::SymmetricUpper | StoredShape::HermitianUpper
        )
    }

    /// Whether only the lower triangle is explicitly stored.
    pub fn is_lower_only(self) -> bool {
        matches!(
            self,
            StoredShape::LowerTriangular | StoredShape::SymmetricLower | StoredShape::HermitianLower
        )
    }
}

/// The operator applied to the matrix in an SpMV call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operation {
    /// `y <- beta*y + alpha*A*x`
    Normal,
    /// `y <- beta*y + alpha*A^T*x`
    Transpose,
    /// `y <- beta*y + alpha*conj(A)*x` (real builds treat this as `Normal`)
    Conjugate,
    /// `y <- beta*y + alpha*A^H*x` (real builds treat this as `Transpose`)
    ConjugateTranspose,
}

impl Operation {
    /// Returns the operation's transpose counterpart.
    pub fn transposed(self) -> Operation {
        match self {
            Operation::Normal => Operation::Transpose,
            Operation::Transpose => Operation::Normal,
            Operation::Conjugate => Operation::ConjugateTranspose,
            Operation::ConjugateTranspose => Operation::Conjugate,
        }
    }

    /// Whether this operation reads rows of `A` and writes the natural
    /// (non-transposed) output range.
    pub fn is_transpose(self) -> bool {
        matches!(self, Operation::Transpose | Operation::ConjugateTranspose)
    }
}

/// Vector stride requirement: unit stride enables the fastest kernel variant,
/// any other positive stride falls back to the general-stride variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stride {
    /// Contiguous, stride of 1.
    Unit,
    /// Any other positive stride.
    General(usize),
}

impl Stride {
    /// Build a `Stride` from a raw increment.
    pub fn from_inc(inc: usize) -> Stride {
        if inc == 1 {
            Stride::Unit
        } else {
            Stride::General(inc)
        }
    }

    /// The raw increment this stride represents.
    pub fn inc(self) -> usize {
        match self {
            Stride::Unit => 1,
            Stride::General(inc) => inc,
        }
    }
}

/// Threading strategy used to dispatch per-partition kernel calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ThreadModel {
    /// Everything runs on the calling thread.
    Single,
    /// Spawn one OS thread per partition for each call, join at the end.
    PerCallThreads,
    /// A persistent pool of worker threads synchronized by barriers.
    ThreadPool,
    /// Task-parallel fork-join dispatch (via a data-parallel scheduler).
    ForkJoin,
}

/// Partitioning strategy used to split a CSR matrix across workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PartitionKind {
    /// Row-range split; partitions never share rows.
    OneD,
    /// Non-zero-balanced split; partitions may share rows.
    SemiOneD,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Normal => "normal",
            Operation::Transpose => "trans",
            Operation::Conjugate => "conj",
            Operation::ConjugateTranspose => "conj-trans",
        };
        write!(f, "{name}")
    }
}

/// A short, human-readable label for a kernel variant, used in logging and
/// in cached transformation recipes.
pub fn format_kernel_id(op: Operation, r: usize, c: usize) -> String {
    alloc::format!("{op}_{r}x{c}")
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn transpose_round_trips() {
        assert_eq!(Operation::Normal.transposed().transposed(), Operation::Normal);
        assert_eq!(Operation::Transpose.transposed(), Operation::Normal);
    }

    #[test]
    fn stride_from_inc() {
        assert_eq!(Stride::from_inc(1), Stride::Unit);
        assert_eq!(Stride::from_inc(3), Stride::General(3));
    }

    #[test]
    fn shape_queries() {
        assert!(StoredShape::SymmetricLower.is_symmetric_like());
        assert!(!StoredShape::General.is_symmetric_like());
        assert!(StoredShape::HermitianUpper.is_hermitian());
        assert!(StoredShape::SymmetricLower.is_lower_only());
    }
}
