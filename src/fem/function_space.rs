//! Argument spaces: the function-space collaborator bound to a form slot.
//!
//! A form only needs three things from a space: the largest per-cell dof
//! count (to size scratch blocks), the mesh it lives on, and the global dof
//! numbers of a cell. [`DofMapSpace`] realizes that with an explicit
//! cell → dofs table.

use std::fmt::Debug;
use std::sync::Arc;

use crate::fem_error::FemError;
use crate::topology::mesh::Mesh;
use crate::topology::point::PointId;

/// Function space bound to one argument of a form.
pub trait ArgumentSpace: Debug + Send + Sync {
    /// Maximum number of dofs on any single cell.
    fn max_element_dofs(&self) -> usize;

    /// Total number of global dofs.
    fn dim(&self) -> usize;

    /// Mesh the space is defined on.
    fn mesh(&self) -> Arc<dyn Mesh>;

    /// Global dof numbers of `cell`.
    fn cell_dofs(&self, cell: PointId) -> Result<&[usize], FemError>;
}

/// Space described by an explicit, fixed-width cell → dofs table.
#[derive(Clone, Debug)]
pub struct DofMapSpace {
    mesh: Arc<dyn Mesh>,
    dofs_per_cell: usize,
    table: Vec<usize>,
    dim: usize,
}

impl DofMapSpace {
    /// Build from a flat table holding `dofs_per_cell` entries per mesh cell.
    pub fn new(
        mesh: Arc<dyn Mesh>,
        dofs_per_cell: usize,
        table: Vec<usize>,
    ) -> Result<Self, FemError> {
        let num_cells = mesh.num_entities(mesh.topological_dim());
        if table.len() != num_cells * dofs_per_cell {
            return Err(FemError::Configuration(format!(
                "dof table holds {} entries, expected {} cells x {} dofs",
                table.len(),
                num_cells,
                dofs_per_cell
            )));
        }
        let dim = table.iter().max().map_or(0, |&m| m + 1);
        Ok(Self {
            mesh,
            dofs_per_cell,
            table,
            dim,
        })
    }

    /// Continuous piecewise-linear space: one dof per mesh vertex.
    pub fn lagrange_p1(mesh: Arc<dyn Mesh>) -> Result<Self, FemError> {
        let mut table = Vec::new();
        for cell in mesh.cells() {
            table.extend_from_slice(mesh.cell_vertices(cell)?);
        }
        let per_cell = mesh.topological_dim() + 1;
        let mut space = Self::new(mesh, per_cell, table)?;
        space.dim = space.mesh.num_entities(0);
        Ok(space)
    }

    /// Piecewise-constant space: one dof per cell.
    pub fn discontinuous_p0(mesh: Arc<dyn Mesh>) -> Result<Self, FemError> {
        let n = mesh.num_entities(mesh.topological_dim());
        Self::new(mesh, 1, (0..n).collect())
    }
}

impl ArgumentSpace for DofMapSpace {
    fn max_element_dofs(&self) -> usize {
        self.dofs_per_cell
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn mesh(&self) -> Arc<dyn Mesh> {
        Arc::clone(&self.mesh)
    }

    fn cell_dofs(&self, cell: PointId) -> Result<&[usize], FemError> {
        let c = cell.index();
        let n = self.table.len() / self.dofs_per_cell.max(1);
        FemError::check_index("cell", c, n)?;
        Ok(&self.table[c * self.dofs_per_cell..(c + 1) * self.dofs_per_cell])
    }
}
