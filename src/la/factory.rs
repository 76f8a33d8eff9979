//! Tensor factories: explicit backend selection handed to assemblers.

use std::sync::Arc;

use crate::algs::communicator::Communicator;
use crate::fem_error::FemError;
use crate::la::dense::DenseTensor;
use crate::la::scalar::ScalarTensor;
use crate::la::tensor::GenericTensor;

/// Creates zero tensors of one backend, bound to one communicator group.
pub trait TensorFactory {
    type Tensor: GenericTensor;

    /// Zero tensor of the given rank and global dimensions.
    fn create(&self, rank: usize, dims: &[usize]) -> Result<Self::Tensor, FemError>;
}

/// Factory for [`ScalarTensor`]; only rank 0 is supported.
#[derive(Debug)]
pub struct ScalarFactory<C> {
    comm: Arc<C>,
}

impl<C: Communicator> ScalarFactory<C> {
    pub fn new(comm: Arc<C>) -> Self {
        Self { comm }
    }
}

impl<C: Communicator> TensorFactory for ScalarFactory<C> {
    type Tensor = ScalarTensor<C>;

    fn create(&self, rank: usize, _dims: &[usize]) -> Result<Self::Tensor, FemError> {
        if rank != 0 {
            return Err(FemError::UnsupportedRank {
                expected: 0,
                found: rank,
            });
        }
        Ok(ScalarTensor::new(Arc::clone(&self.comm)))
    }
}

/// Factory for [`DenseTensor`] of any rank.
#[derive(Debug)]
pub struct DenseFactory<C> {
    comm: Arc<C>,
}

impl<C: Communicator> DenseFactory<C> {
    pub fn new(comm: Arc<C>) -> Self {
        Self { comm }
    }
}

impl<C: Communicator> TensorFactory for DenseFactory<C> {
    type Tensor = DenseTensor<C>;

    fn create(&self, rank: usize, dims: &[usize]) -> Result<Self::Tensor, FemError> {
        let mut t = DenseTensor::new(Arc::clone(&self.comm), &[]);
        t.resize(rank, dims)?;
        Ok(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;

    #[test]
    fn scalar_factory_rejects_nonzero_rank() {
        let f = ScalarFactory::new(Arc::new(NoComm));
        assert!(f.create(0, &[]).is_ok());
        assert!(matches!(
            f.create(2, &[3, 3]),
            Err(FemError::UnsupportedRank { expected: 0, found: 2 })
        ));
    }

    #[test]
    fn dense_factory_checks_dims() {
        let f = DenseFactory::new(Arc::new(NoComm));
        let t = f.create(2, &[2, 3]).unwrap();
        assert_eq!(t.values().len(), 6);
        assert!(f.create(2, &[2]).is_err());
    }
}
