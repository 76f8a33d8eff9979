//! # sieve-form
//!
//! sieve-form provides the variational-form abstraction and the generic
//! distributed tensor assembly contract of a finite-element code. It sits
//! between generated integral kernels, mesh/function-space metadata, and
//! pluggable linear-algebra backends.
//!
//! ## Features
//! - [`VariationalForm`](fem::form::VariationalForm): argument spaces, mesh,
//!   per-kind domain markers, coefficients and integrals in one object
//! - [`GenericTensor`](la::tensor::GenericTensor): the capability set every
//!   backend implements (block get/set/add, zero, collective apply)
//! - [`ScalarTensor`](la::scalar::ScalarTensor) and
//!   [`DenseTensor`](la::dense::DenseTensor) reference backends with a
//!   deterministic rank-ordered reduction on `apply`
//! - Pluggable communication backends (serial, thread-per-rank, MPI)
//!
//! ## Determinism
//!
//! `apply` gathers every process's partial values into a rank-ordered buffer
//! and reduces it in that order, independent of message arrival.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! sieve-form = "0.1"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```

pub mod algs;
pub mod fem;
pub mod fem_error;
pub mod la;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::assembly::{Assembler, AssemblerOptions};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm, Wait};
    pub use crate::fem::coefficients::{CellwiseValues, CoefficientFunction, CoefficientSet, Constant};
    pub use crate::fem::form::{CoefficientResolver, NameListResolver, VariationalForm};
    pub use crate::fem::function_space::{ArgumentSpace, DofMapSpace};
    pub use crate::fem::integrals::{Integral, IntegralSet};
    pub use crate::fem::kernel::{
        EntityGeometry, FormDescriptor, IntegralKernel, IntegralRecord, IntegralType,
        KernelDescriptor, kernel_fn,
    };
    pub use crate::fem_error::FemError;
    pub use crate::la::dense::DenseTensor;
    pub use crate::la::factory::{DenseFactory, ScalarFactory, TensorFactory};
    pub use crate::la::scalar::ScalarTensor;
    pub use crate::la::tensor::{ApplyMode, GenericTensor};
    pub use crate::topology::markers::{DomainMarkers, MarkerRef};
    pub use crate::topology::mesh::{ExteriorFacet, Mesh, SimplexMesh};
    pub use crate::topology::point::PointId;
}
