//! FemError: Unified error type for sieve-form public APIs
//!
//! Configuration and index errors are contract violations reported at the
//! call site. Communication errors surface from the distributed group during
//! `apply` and invalidate the current assembly pass.

use thiserror::Error;

/// Unified error type for form construction, tensor access and finalization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FemError {
    /// Attempted to construct a PointId with a zero value (invalid).
    #[error("PointId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidPointId,
    /// Inconsistent form setup (rank/space mismatch, missing mesh, unbound coefficient, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// An argument, coefficient or tensor index is outside its valid range.
    #[error("Index error: {what} index {index} out of range (len = {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    /// No coefficient registered under this name.
    #[error("No coefficient named `{0}`")]
    CoefficientNotFound(String),
    /// No coefficient name registered for this index.
    #[error("No coefficient name for index {0}")]
    CoefficientIndexNotFound(usize),
    /// The tensor realization only supports a fixed rank.
    #[error("Unsupported rank: expected {expected}, found {found}")]
    UnsupportedRank { expected: usize, found: usize },
    /// Operation is not valid for this tensor or driver.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
    /// Collective communication failed; the assembly pass must be discarded.
    #[error("Communication error: {0}")]
    Communication(String),
    /// Local block length does not match the product of index array lengths.
    #[error("Block shape mismatch: expected {expected} values, found {found}")]
    BlockShape { expected: usize, found: usize },
    /// Apply mode string not recognised.
    #[error("Unknown apply mode `{0}`")]
    UnknownApplyMode(String),
}

impl FemError {
    /// Shorthand for an [`FemError::IndexOutOfRange`] check.
    #[inline]
    pub(crate) fn check_index(what: &'static str, index: usize, len: usize) -> Result<(), Self> {
        if index < len {
            Ok(())
        } else {
            Err(FemError::IndexOutOfRange { what, index, len })
        }
    }
}
