//! `DenseTensor`: replicated dense reference backend of any rank.
//!
//! Every process stores the full row-major array and accumulates only its own
//! contributions. `apply` gathers all arrays and sums them element-wise in
//! rank order, the same protocol [`ScalarTensor`](crate::la::scalar::ScalarTensor)
//! uses for one value. Ownership (`local_range`) is a balanced block
//! partition of the leading dimension; it is informational since storage is
//! replicated.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use itertools::Itertools;

use crate::algs::communicator::{Communicator, NoComm};
use crate::fem_error::FemError;
use crate::la::tensor::{ApplyMode, GenericTensor, block_len, check_block};

/// Dense tensor replicated on every process of a group.
pub struct DenseTensor<C: Communicator = NoComm> {
    dims: Vec<usize>,
    values: Vec<f64>,
    comm: Arc<C>,
}

impl DenseTensor<NoComm> {
    /// Zero tensor for a single-process run.
    pub fn serial(dims: &[usize]) -> Self {
        Self::new(Arc::new(NoComm), dims)
    }
}

impl<C: Communicator> DenseTensor<C> {
    /// Zero tensor of rank `dims.len()`.
    pub fn new(comm: Arc<C>, dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
            values: vec![0.0; dims.iter().product()],
            comm,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Row-major view of all values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Independent tensor with the same shape, values and communicator.
    pub fn copy(&self) -> Self {
        Self {
            dims: self.dims.clone(),
            values: self.values.clone(),
            comm: Arc::clone(&self.comm),
        }
    }

    /// Value at one multi-index.
    pub fn at(&self, index: &[usize]) -> Result<f64, FemError> {
        let rows: Vec<&[usize]> = index.iter().map(std::slice::from_ref).collect();
        self.check_rows(&rows)?;
        Ok(self.values[self.flat_index(index)])
    }

    fn check_rows(&self, rows: &[&[usize]]) -> Result<(), FemError> {
        if rows.len() != self.dims.len() {
            return Err(FemError::UnsupportedRank {
                expected: self.dims.len(),
                found: rows.len(),
            });
        }
        for (indices, &n) in rows.iter().zip(&self.dims) {
            if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
                return Err(FemError::IndexOutOfRange {
                    what: "tensor",
                    index: bad,
                    len: n,
                });
            }
        }
        Ok(())
    }

    #[inline]
    fn flat_index(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(&self.dims)
            .fold(0, |acc, (&i, &n)| acc * n + i)
    }

    /// Visit `(block position, flat tensor position)` for every entry of the block.
    fn for_each_entry<F>(&self, rows: &[&[usize]], mut f: F)
    where
        F: FnMut(usize, usize),
    {
        if rows.is_empty() {
            f(0, 0);
            return;
        }
        rows.iter()
            .map(|r| r.iter().copied())
            .multi_cartesian_product()
            .enumerate()
            .for_each(|(k, index)| f(k, self.flat_index(&index)));
    }
}

impl<C: Communicator> Clone for DenseTensor<C> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<C: Communicator> fmt::Debug for DenseTensor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseTensor")
            .field("dims", &self.dims)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl<C: Communicator> fmt::Display for DenseTensor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<DenseTensor of rank {} with dims {:?}>", self.dims.len(), self.dims)
    }
}

impl<C: Communicator> GenericTensor for DenseTensor<C> {
    fn rank(&self) -> usize {
        self.dims.len()
    }

    fn resize(&mut self, rank: usize, dims: &[usize]) -> Result<(), FemError> {
        if dims.len() != rank {
            return Err(FemError::Configuration(format!(
                "resize to rank {rank} given {} dimension(s)",
                dims.len()
            )));
        }
        self.dims = dims.to_vec();
        self.values = vec![0.0; dims.iter().product()];
        Ok(())
    }

    fn size(&self, dim: usize) -> Result<usize, FemError> {
        if self.dims.is_empty() {
            return Err(FemError::UnsupportedOperation(
                "size() is not available for rank-0 tensors",
            ));
        }
        FemError::check_index("dimension", dim, self.dims.len())?;
        Ok(self.dims[dim])
    }

    fn local_range(&self, dim: usize) -> Result<Range<usize>, FemError> {
        let n = self.size(dim)?;
        if dim > 0 {
            return Ok(0..n);
        }
        let (p, r) = (self.comm.size().max(1), self.comm.rank());
        let (base, rem) = (n / p, n % p);
        let start = r * base + r.min(rem);
        let len = base + usize::from(r < rem);
        Ok(start..start + len)
    }

    fn get(&self, block: &mut [f64], rows: &[&[usize]]) -> Result<(), FemError> {
        self.check_rows(rows)?;
        check_block(block.len(), block_len(rows))?;
        self.for_each_entry(rows, |k, flat| block[k] = self.values[flat]);
        Ok(())
    }

    fn set(&mut self, block: &[f64], rows: &[&[usize]]) -> Result<(), FemError> {
        self.check_rows(rows)?;
        check_block(block.len(), block_len(rows))?;
        let mut targets = Vec::with_capacity(block.len());
        self.for_each_entry(rows, |k, flat| targets.push((k, flat)));
        for (k, flat) in targets {
            self.values[flat] = block[k];
        }
        Ok(())
    }

    fn add(&mut self, block: &[f64], rows: &[&[usize]]) -> Result<(), FemError> {
        self.check_rows(rows)?;
        check_block(block.len(), block_len(rows))?;
        let mut targets = Vec::with_capacity(block.len());
        self.for_each_entry(rows, |k, flat| targets.push((k, flat)));
        for (k, flat) in targets {
            self.values[flat] += block[k];
        }
        Ok(())
    }

    fn zero(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    fn apply(&mut self, mode: ApplyMode) -> Result<(), FemError> {
        let p = self.comm.size();
        log::debug!(
            "dense apply: mode {mode}, {} value(s), {p} process(es)",
            self.values.len()
        );
        if self.comm.is_no_comm() || p == 1 {
            return Ok(());
        }
        let len = self.values.len();
        let gathered = self.comm.allgather_f64_slice(&self.values)?;
        for (i, v) in self.values.iter_mut().enumerate() {
            *v = match mode {
                ApplyMode::Add => (0..p).map(|r| gathered[r * len + i]).sum(),
            };
        }
        Ok(())
    }
}
