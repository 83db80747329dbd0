//! Error and warning types.
//!
//! Configuration and dimension errors are fatal and must reach the caller:
//! a mis-sized or malformed step must never be applied to the plant. Numerical
//! degeneracy is not an error; it is absorbed by regularization and at most
//! reported through [`NumericalWarning`].

use thiserror::Error;

/// Result type for KKT core operations.
pub type KktResult<T> = Result<T, KktError>;

/// Errors surfaced by the factorization core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KktError {
    /// Malformed pattern, ordering or settings. The solver instance is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Vector or matrix size does not match the fixed problem dimension.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    Dimension {
        /// Operation that detected the mismatch
        context: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// A check or solve was requested before any successful factorization.
    #[error("No factorization available for {0}")]
    NotFactored(&'static str),

    /// A non-finite value was handed to the factorizer.
    #[error("Non-finite matrix value at slot {slot}")]
    NonFinite {
        /// Index into the value array of the pattern
        slot: usize,
    },
}

impl KktError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        KktError::Configuration(msg.into())
    }

    pub(crate) fn dim(context: &'static str, expected: usize, actual: usize) -> Self {
        KktError::Dimension { context, expected, actual }
    }

    /// Check a length and produce a dimension error on mismatch.
    pub(crate) fn check_len(context: &'static str, expected: usize, actual: usize) -> KktResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::dim(context, expected, actual))
        }
    }
}

/// Advisory raised when a factorization needed more regularization than the
/// configured threshold.
///
/// The factorization it is attached to is complete and usable; its accuracy
/// relative to the unregularized system is degraded by at most the reported
/// magnitude.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error(
    "regularization magnitude {magnitude:.3e} over {pivots} pivot(s) exceeds threshold {threshold:.3e}"
)]
pub struct NumericalWarning {
    /// Sum of absolute pivot corrections in this factorization
    pub magnitude: f64,
    /// Number of regularized pivots
    pub pivots: usize,
    /// Configured advisory threshold
    pub threshold: f64,
}
