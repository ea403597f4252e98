//! Block-structured tuned representations (C2) and CSR↔block conversion (C3).
//!
//! A tuned matrix is one of a small, closed set of block layouts. Per the
//! dispatch design (spec §9: "the sum type is preferred"), [`BlockStore`] is
//! a closed enum rather than a trait object — the set of representations
//! this engine materializes is fixed and small.

pub mod bcsr;
pub mod convert;
pub mod mbcsr;

pub use bcsr::BcsrMatrix;
pub use mbcsr::MbcsrMatrix;

use crate::csr::CsrMatrix;
use crate::error::Result;
use crate::types::{Operation, Precision};

/// A tuned block-structured representation of a matrix.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockStore {
    /// Block CSR, register-blocked `(r, c)`.
    Bcsr(BcsrMatrix),
    /// Modified block CSR: BCSR with diagonal blocks extracted.
    Mbcsr(MbcsrMatrix),
}

impl BlockStore {
    /// Row-block size `r`.
    pub fn r(&self) -> usize {
        match self {
            BlockStore::Bcsr(b) => b.r(),
            BlockStore::Mbcsr(b) => b.r(),
        }
    }

    /// Column-block size `c`.
    pub fn c(&self) -> usize {
        match self {
            BlockStore::Bcsr(b) => b.c(),
            BlockStore::Mbcsr(b) => b.c(),
        }
    }

    /// Logical row count of the matrix this store represents.
    pub fn rows(&self) -> usize {
        match self {
            BlockStore::Bcsr(b) => b.rows(),
            BlockStore::Mbcsr(b) => b.rows(),
        }
    }

    /// Logical column count of the matrix this store represents.
    pub fn cols(&self) -> usize {
        match self {
            BlockStore::Bcsr(b) => b.cols(),
            BlockStore::Mbcsr(b) => b.cols(),
        }
    }

    /// Total number of scalar entries materialized (including stored
    /// zeros introduced by blocking) — the numerator of the fill ratio.
    pub fn stored_entry_count(&self) -> usize {
        match self {
            BlockStore::Bcsr(b) => b.stored_entry_count(),
            BlockStore::Mbcsr(b) => b.stored_entry_count(),
        }
    }

    /// A short textual label, e.g. `"MBCSR(4, 2)"`, used in cached recipes.
    pub fn recipe_label(&self) -> alloc::string::String {
        match self {
            BlockStore::Bcsr(b) => alloc::format!("BCSR({}, {})", b.r(), b.c()),
            BlockStore::Mbcsr(b) => alloc::format!("MBCSR({}, {})", b.r(), b.c()),
        }
    }

    /// Reference (unblocked-semantics) SpMV over the block store, used by
    /// the tuner's benchmark and by tests; production dispatch goes
    /// through the `kernel` module's variant table instead.
    pub fn spmv(
        &self,
        op: Operation,
        alpha: Precision,
        x: &[Precision],
        beta: Precision,
        y: &mut [Precision],
    ) -> Result<()> {
        match self {
            BlockStore::Bcsr(b) => b.spmv(op, alpha, x, beta, y),
            BlockStore::Mbcsr(b) => b.spmv(op, alpha, x, beta, y),
        }
    }

    /// Materialize back to CSR (reverse conversion, C3).
    pub fn to_csr(&self) -> Result<CsrMatrix<'static>> {
        convert::block_store_to_csr(self)
    }
}
