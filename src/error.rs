//! Error types for the SpMV engine.
//!
//! This module defines every error condition the engine's components can
//! raise, matching the error-kind taxonomy of the tuning/partitioning/kernel
//! core: bad arguments, failed property assertions, unsupported operations,
//! and the internal "not applicable" signal the tuner uses to skip a
//! heuristic without surfacing an error to the caller.

use alloc::string::String;
use core::fmt;

/// Result type alias used throughout the engine.
pub type Result<T> = core::result::Result<T, EngineError>;

/// Errors produced by matrix construction, tuning, partitioning, and SpMV.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EngineError {
    /// A parameter violates a documented precondition: null where non-null
    /// is required, an out-of-range index, `r <= 0`, `stride < length`, etc.
    BadArg {
        /// Name of the offending parameter.
        parameter: String,
        /// Description of why it is invalid.
        message: String,
    },

    /// The property checker found the input inconsistent with its asserted
    /// flags (e.g. "sorted" claimed but a row has unsorted indices).
    FalseAssertedProperty {
        /// Which asserted property failed.
        property: String,
        /// Row where the inconsistency was detected, if applicable.
        row: Option<usize>,
    },

    /// An attempt to set an element at a position with no storage slot.
    LogicalZeroNotStored {
        /// Row of the attempted write.
        row: usize,
        /// Column of the attempted write.
        col: usize,
    },

    /// Allocation failed for the requested operation.
    OutOfMemory {
        /// Number of elements that were being allocated.
        requested_elements: usize,
        /// Context where the allocation failed.
        context: String,
    },

    /// The requested method has no implementation for this representation.
    NotImplemented {
        /// Name of the method or conversion that was requested.
        operation: String,
    },

    /// Internal-only: a heuristic declines to run on this matrix. The tuner
    /// treats this as "skip", it is never returned to a caller of the
    /// public API.
    TuneNotApplicable {
        /// Name of the heuristic that declined.
        heuristic: String,
    },

    /// A transformation recipe failed to parse or evaluate.
    Syntax {
        /// The recipe text that failed.
        recipe: String,
        /// Description of the parse/evaluation failure.
        message: String,
    },

    /// Dimension mismatch between matrix and vector operands.
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension supplied.
        actual: usize,
        /// Operation in which the mismatch was detected.
        operation: String,
    },

    /// Index out of bounds for a matrix or vector access.
    IndexOutOfBounds {
        /// The invalid index.
        index: usize,
        /// Largest valid index.
        max_index: usize,
        /// Context where the access occurred.
        context: String,
    },
}

impl EngineError {
    /// Whether this error indicates a condition the tuner should silently
    /// route around rather than surface (only ever true for
    /// [`EngineError::TuneNotApplicable`]).
    pub fn is_tune_skip(&self) -> bool {
        matches!(self, EngineError::TuneNotApplicable { .. })
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::BadArg { parameter, message } => {
                write!(f, "invalid argument '{parameter}': {message}")
            }
            EngineError::FalseAssertedProperty { property, row } => match row {
                Some(row) => write!(f, "asserted property '{property}' is false at row {row}"),
                None => write!(f, "asserted property '{property}' is false"),
            },
            EngineError::LogicalZeroNotStored { row, col } => {
                write!(f, "position ({row}, {col}) has no storage slot for a set")
            }
            EngineError::OutOfMemory {
                requested_elements,
                context,
            } => write!(
                f,
                "allocation of {requested_elements} elements failed in {context}"
            ),
            EngineError::NotImplemented { operation } => {
                write!(f, "operation '{operation}' is not implemented")
            }
            EngineError::TuneNotApplicable { heuristic } => {
                write!(f, "heuristic '{heuristic}' is not applicable (internal)")
            }
            EngineError::Syntax { recipe, message } => {
                write!(f, "failed to parse recipe '{recipe}': {message}")
            }
            EngineError::DimensionMismatch {
                expected,
                actual,
                operation,
            } => write!(
                f,
                "dimension mismatch in {operation}: expected {expected}, got {actual}"
            ),
            EngineError::IndexOutOfBounds {
                index,
                max_index,
                context,
            } => write!(
                f,
                "index {index} out of bounds in {context}: max valid index is {max_index}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EngineError {}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn tune_not_applicable_is_a_skip_signal() {
        let err = EngineError::TuneNotApplicable {
            heuristic: "register_blocking".into(),
        };
        assert!(err.is_tune_skip());

        let err = EngineError::BadArg {
            parameter: "r".into(),
            message: "must be positive".into(),
        };
        assert!(!err.is_tune_skip());
    }

    #[test]
    fn display_is_human_readable() {
        let err = EngineError::DimensionMismatch {
            expected: 4,
            actual: 3,
            operation: "multiply_vector".into(),
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch in multiply_vector: expected 4, got 3"
        );
    }
}
