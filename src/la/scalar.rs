//! `ScalarTensor`: the rank-0 realization of [`GenericTensor`].
//!
//! Assembling a functional produces one number per process; `apply` gathers
//! the partial values of every rank and replaces each local value with their
//! sum, accumulated in rank order so the result does not depend on message
//! arrival order.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::algs::communicator::{Communicator, NoComm};
use crate::fem_error::FemError;
use crate::la::tensor::{ApplyMode, GenericTensor};

/// A real scalar owned by one process of a communicator group.
pub struct ScalarTensor<C: Communicator = NoComm> {
    value: f64,
    comm: Arc<C>,
}

impl ScalarTensor<NoComm> {
    /// Zero scalar for a single-process run.
    pub fn serial() -> Self {
        Self::new(Arc::new(NoComm))
    }
}

impl<C: Communicator> ScalarTensor<C> {
    /// Zero scalar reduced over `comm` on `apply`.
    pub fn new(comm: Arc<C>) -> Self {
        Self { value: 0.0, comm }
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Plain assignment, outside of add/apply.
    #[inline]
    pub fn assign(&mut self, value: f64) -> &mut Self {
        self.value = value;
        self
    }

    /// Independent tensor with the same value and communicator.
    pub fn copy(&self) -> Self {
        Self {
            value: self.value,
            comm: Arc::clone(&self.comm),
        }
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }
}

impl<C: Communicator> Clone for ScalarTensor<C> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<C: Communicator> fmt::Debug for ScalarTensor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarTensor")
            .field("value", &self.value)
            .field("rank", &self.comm.rank())
            .field("size", &self.comm.size())
            .finish()
    }
}

impl<C: Communicator> fmt::Display for ScalarTensor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Scalar value {}>", self.value)
    }
}

impl<C: Communicator> From<&ScalarTensor<C>> for f64 {
    fn from(s: &ScalarTensor<C>) -> f64 {
        s.value
    }
}

impl<C: Communicator> From<ScalarTensor<C>> for f64 {
    fn from(s: ScalarTensor<C>) -> f64 {
        s.value
    }
}

impl<C: Communicator> GenericTensor for ScalarTensor<C> {
    fn rank(&self) -> usize {
        0
    }

    fn resize(&mut self, rank: usize, _dims: &[usize]) -> Result<(), FemError> {
        if rank != 0 {
            return Err(FemError::UnsupportedRank {
                expected: 0,
                found: rank,
            });
        }
        self.value = 0.0;
        Ok(())
    }

    fn size(&self, _dim: usize) -> Result<usize, FemError> {
        Err(FemError::UnsupportedOperation(
            "size() is not available for scalars",
        ))
    }

    fn local_range(&self, _dim: usize) -> Result<Range<usize>, FemError> {
        Err(FemError::UnsupportedOperation(
            "local_range() is not available for scalars",
        ))
    }

    fn get(&self, block: &mut [f64], _rows: &[&[usize]]) -> Result<(), FemError> {
        let slot = block.first_mut().ok_or(FemError::BlockShape {
            expected: 1,
            found: 0,
        })?;
        *slot = self.value;
        Ok(())
    }

    fn set(&mut self, block: &[f64], _rows: &[&[usize]]) -> Result<(), FemError> {
        self.value = *block.first().ok_or(FemError::BlockShape {
            expected: 1,
            found: 0,
        })?;
        Ok(())
    }

    fn add(&mut self, block: &[f64], _rows: &[&[usize]]) -> Result<(), FemError> {
        self.value += *block.first().ok_or(FemError::BlockShape {
            expected: 1,
            found: 0,
        })?;
        Ok(())
    }

    fn zero(&mut self) {
        self.value = 0.0;
    }

    fn apply(&mut self, mode: ApplyMode) -> Result<(), FemError> {
        let n = self.comm.size();
        log::debug!("scalar apply: mode {mode}, {n} process(es)");
        if self.comm.is_no_comm() || n == 1 {
            return Ok(());
        }
        let values = self.comm.allgather_f64(self.value)?;
        // `values` is ordered by rank, so the sum is too.
        self.value = match mode {
            ApplyMode::Add => values.iter().sum(),
        };
        Ok(())
    }
}
