//! `PointId`: a strong, zero-cost handle for mesh entities
//!
//! Every mesh entity (cell, facet, vertex) a form integrates over is
//! addressed by an opaque identifier. `PointId` wraps a nonzero `u64` so that
//! 0 stays reserved as an invalid or sentinel value.

use std::{fmt, num::NonZeroU64};

use crate::fem_error::FemError;

/// Identifier of a mesh entity.
///
/// # Memory layout
/// This type is `repr(transparent)`, meaning it has the same ABI and
/// alignment as its single field (`NonZeroU64`) and can be passed to FFI
/// exactly like a `u64`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct PointId(NonZeroU64);

impl PointId {
    /// Creates a new `PointId` from a raw `u64` value.
    ///
    /// Returns [`FemError::InvalidPointId`] if `raw == 0`.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use sieve_form::topology::point::PointId;
    /// let p = PointId::new(1).unwrap();
    /// assert_eq!(p.get(), 1);
    /// assert!(PointId::new(0).is_err());
    /// ```
    #[inline]
    pub fn new(raw: u64) -> Result<Self, FemError> {
        NonZeroU64::new(raw)
            .map(PointId)
            .ok_or(FemError::InvalidPointId)
    }

    /// Builds the id of the `index`-th entity of a zero-based numbering.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        // index + 1 > 0 for every usize that fits in u64
        PointId(NonZeroU64::MIN.saturating_add(index as u64))
    }

    /// Returns the inner `u64` value of this `PointId`.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Zero-based position of this entity, inverse of [`PointId::from_index`].
    #[inline]
    pub const fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Debug for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PointId").field(&self.get()).finish()
    }
}

/// Prints only the raw integer.
impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Provide MPI compatibility: `PointId` can be sent over MPI as a `u64`.
#[cfg(feature = "mpi-support")]
unsafe impl mpi::datatype::Equivalence for PointId {
    type Out = <u64 as mpi::datatype::Equivalence>::Out;

    fn equivalent_datatype() -> Self::Out {
        <u64 as mpi::datatype::Equivalence>::equivalent_datatype()
    }
}
