//! # SpMV Engine
//!
//! A parallel, auto-tuning sparse matrix-vector multiplication engine:
//! given a matrix in compressed sparse row form, picks a register-blocked
//! layout suited to its non-zero structure, partitions the work across
//! workers, and dispatches `y <- beta*y + alpha*op(A)*x` through whichever
//! concurrency model the caller configured.
//!
//! ## Key Features
//!
//! - **Auto-tuning**: sampled fill-ratio estimation plus a measured
//!   register-performance profile pick the block size that minimizes
//!   estimated kernel time, kept only if a benchmark A/B confirms it.
//! - **Multiple partitioning strategies**: row-range (OneD) and
//!   non-zero-balanced (SemiOneD), the latter requiring a reduction pass.
//! - **Interchangeable concurrency models**: single-threaded, one-OS-thread-
//!   per-call, a persistent barrier-synchronized thread pool, and
//!   task-parallel fork-join.
//! - **Shared or copy ownership**: a matrix can borrow the caller's arrays
//!   or own its own, mixed per array where the partitioner needs to.
//!
//! ## Quick Start
//!
//! ```rust
//! use spmv_engine::{CsrMatrix, TunableMatrix, Config, Operation};
//!
//! let a = CsrMatrix::from_triplets(
//!     &[(0, 0, 5.0), (0, 1, 1.0), (1, 0, 2.0), (1, 1, 7.0)],
//!     2, 2,
//! ).unwrap();
//!
//! let handle = TunableMatrix::new(a, Config::default());
//! let x = [1.0, 1.0];
//! let mut y = [0.0; 2];
//! handle.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
//! assert_eq!(y, [6.0, 9.0]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs, clippy::all)]
#![allow(clippy::float_cmp)] // Numerical code often requires exact comparisons

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod block;
pub mod config;
pub mod csr;
pub mod error;
pub mod fill;
pub mod handle;
pub mod heuristic;
pub mod kernel;
pub mod partition;
pub mod recipe;
pub mod reduce;
pub mod tuner;
pub mod types;
pub mod vector;

#[cfg(feature = "std")]
pub mod executor;

pub use block::{BcsrMatrix, BlockStore, MbcsrMatrix};
pub use config::Config;
pub use csr::{AssertedProperties, CsrMatrix};
pub use error::{EngineError, Result};
pub use fill::{estimate_fill, FillTable};
pub use handle::{SubMatrix, TunableMatrix};
pub use heuristic::{HeuristicDecision, RegisterProfile, Workload};
pub use kernel::VariantId;
pub use partition::PartitionRange;
pub use recipe::{Recipe, RecipeArg};
pub use tuner::{RegisteredHeuristic, TuneOutcome, TuneRequest, TunedResult};
pub use types::{DimensionType, IndexBase, IndexType, Operation, PartitionKind, Precision, Stride, StoredShape, ThreadModel};

#[cfg(feature = "std")]
pub use executor::ThreadPool;

#[cfg(feature = "std")]
pub use tuner::{Clock, StdClock};

/// Library version, from the crate's own manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Library description, from the crate's own manifest.
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Initialize the engine's default logging configuration.
///
/// Call once at the start of your application; routes `log` facade calls
/// made throughout tuning, partitioning, and thread-pool management to
/// `env_logger`.
#[cfg(feature = "std")]
pub fn init() {
    #[cfg(feature = "env_logger")]
    env_logger::try_init().ok();
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn version_and_description_are_nonempty() {
        assert!(!VERSION.is_empty());
        assert!(!DESCRIPTION.is_empty());
    }

    #[test]
    fn quick_start_example_matches_hand_computation() {
        let a = CsrMatrix::from_triplets(&[(0, 0, 5.0), (0, 1, 1.0), (1, 0, 2.0), (1, 1, 7.0)], 2, 2).unwrap();
        let handle = TunableMatrix::new(a, Config::default());
        let x = [1.0, 1.0];
        let mut y = [0.0; 2];
        handle.spmv(Operation::Normal, 1.0, &x, 0.0, &mut y).unwrap();
        assert_eq!(y, [6.0, 9.0]);
    }
}
