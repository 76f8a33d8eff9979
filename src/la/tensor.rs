//! The algebraic sink every backend implements.
//!
//! # Block addressing
//! A local block is a dense, row-major sub-tensor. It is addressed by one
//! index array per dimension (`rows[d]` holds global indices along `d`); the
//! block covers the cross product of those arrays, so its length is the
//! product of their lengths. A rank-0 tensor takes an empty `rows` slice and a
//! one-value block.
//!
//! # Finalization
//! `add`/`set` only touch local state. [`GenericTensor::apply`] is collective:
//! every process of the group calls it exactly once per assembly pass, after
//! which reads are meaningful. Callers serialize `add`/`set` on one process.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::fem_error::FemError;

/// Conflict-resolution policy of [`GenericTensor::apply`] for values
/// contributed to the same index by several processes.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    /// Contributions are summed.
    #[default]
    Add,
}

impl FromStr for ApplyMode {
    type Err = FemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(ApplyMode::Add),
            other => Err(FemError::UnknownApplyMode(other.to_string())),
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::Add => f.write_str("add"),
        }
    }
}

/// Capability set of an assemblable tensor of fixed rank.
pub trait GenericTensor: fmt::Display + Send {
    /// Number of dimensions; fixed for the object's lifetime unless `resize` is supported.
    fn rank(&self) -> usize;

    /// Reinitialize to `rank` with the given dimensions; all values become zero.
    fn resize(&mut self, rank: usize, dims: &[usize]) -> Result<(), FemError>;

    /// Global size along `dim`.
    fn size(&self, dim: usize) -> Result<usize, FemError>;

    /// Half-open range of global indices along `dim` owned by this process.
    fn local_range(&self, dim: usize) -> Result<Range<usize>, FemError>;

    /// Read the block at `rows` into `block`.
    fn get(&self, block: &mut [f64], rows: &[&[usize]]) -> Result<(), FemError>;

    /// Overwrite the block at `rows`.
    fn set(&mut self, block: &[f64], rows: &[&[usize]]) -> Result<(), FemError>;

    /// Accumulate `block` into the entries at `rows`.
    fn add(&mut self, block: &[f64], rows: &[&[usize]]) -> Result<(), FemError>;

    /// Reset every value to zero, keeping any structure.
    fn zero(&mut self);

    /// Collective finalization; see the module docs.
    fn apply(&mut self, mode: ApplyMode) -> Result<(), FemError>;

    /// [`GenericTensor::add`] with owned index arrays.
    fn add_owned(&mut self, block: &[f64], rows: &[Vec<usize>]) -> Result<(), FemError> {
        let rows: Vec<&[usize]> = rows.iter().map(Vec::as_slice).collect();
        self.add(block, &rows)
    }

    /// [`GenericTensor::add`] with index arrays concatenated in `flat_rows`,
    /// `num_rows[d]` entries for dimension `d`.
    fn add_flat(
        &mut self,
        block: &[f64],
        num_rows: &[usize],
        flat_rows: &[usize],
    ) -> Result<(), FemError> {
        let rows = split_flat(num_rows, flat_rows)?;
        self.add(block, &rows)
    }
}

/// Number of values in the block addressed by `rows`.
#[inline]
pub fn block_len(rows: &[&[usize]]) -> usize {
    rows.iter().map(|r| r.len()).product()
}

/// Fails unless `block` holds exactly `expected` values.
#[inline]
pub(crate) fn check_block(block_len: usize, expected: usize) -> Result<(), FemError> {
    if block_len == expected {
        Ok(())
    } else {
        Err(FemError::BlockShape {
            expected,
            found: block_len,
        })
    }
}

fn split_flat<'a>(num_rows: &[usize], flat: &'a [usize]) -> Result<Vec<&'a [usize]>, FemError> {
    let total: usize = num_rows.iter().sum();
    check_block(flat.len(), total)?;
    let mut out = Vec::with_capacity(num_rows.len());
    let mut rest = flat;
    for &n in num_rows {
        let (head, tail) = rest.split_at(n);
        out.push(head);
        rest = tail;
    }
    Ok(out)
}
