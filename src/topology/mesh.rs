//! Mesh collaborator: the topology/geometry queries an assembler needs.
//!
//! Mesh construction, refinement and distribution live outside this crate.
//! [`SimplexMesh`] is a small concrete realization (vertex coordinates plus
//! cell connectivity) used by drivers and tests.

use std::collections::HashMap;
use std::fmt::Debug;

use crate::fem_error::FemError;
use crate::topology::point::PointId;

/// A boundary facet together with the cell it belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExteriorFacet {
    /// Facet id (numbered within the facet dimension).
    pub facet: PointId,
    /// The unique cell incident to the facet.
    pub cell: PointId,
    /// Index of the facet within the cell's local numbering.
    pub local_facet: usize,
}

/// Read-only mesh queries.
pub trait Mesh: Debug + Send + Sync {
    /// Topological dimension of the cells.
    fn topological_dim(&self) -> usize;

    /// Dimension of the embedding space.
    fn geometric_dim(&self) -> usize;

    /// Number of locally stored entities of dimension `dim`.
    fn num_entities(&self, dim: usize) -> usize;

    /// Global vertex numbers of `cell`.
    fn cell_vertices(&self, cell: PointId) -> Result<&[usize], FemError>;

    /// Write the vertex coordinates of `cell` (vertex-major) into `out`, replacing its contents.
    fn cell_coordinates(&self, cell: PointId, out: &mut Vec<f64>) -> Result<(), FemError>;

    /// Facets on the boundary, in deterministic order.
    fn exterior_facets(&self) -> &[ExteriorFacet];

    /// Cell ids in local numbering order.
    fn cells(&self) -> Box<dyn Iterator<Item = PointId> + '_> {
        let n = self.num_entities(self.topological_dim());
        Box::new((0..n).map(PointId::from_index))
    }
}

/// Simplicial mesh with explicit coordinates and connectivity.
#[derive(Clone, Debug)]
pub struct SimplexMesh {
    gdim: usize,
    tdim: usize,
    coordinates: Vec<f64>,
    cells: Vec<usize>,
    num_facets: usize,
    exterior: Vec<ExteriorFacet>,
}

impl SimplexMesh {
    /// Build a mesh from flat vertex coordinates (`gdim` values per vertex)
    /// and flat cell connectivity (`tdim + 1` vertices per cell).
    pub fn new(
        gdim: usize,
        tdim: usize,
        coordinates: Vec<f64>,
        cells: Vec<usize>,
    ) -> Result<Self, FemError> {
        if gdim == 0 || tdim == 0 || tdim > gdim {
            return Err(FemError::Configuration(format!(
                "invalid simplex mesh dimensions (gdim = {gdim}, tdim = {tdim})"
            )));
        }
        if coordinates.len() % gdim != 0 {
            return Err(FemError::Configuration(
                "coordinate array is not a multiple of the geometric dimension".into(),
            ));
        }
        let nv = tdim + 1;
        if cells.len() % nv != 0 {
            return Err(FemError::Configuration(
                "connectivity array is not a multiple of the cell vertex count".into(),
            ));
        }
        let num_vertices = coordinates.len() / gdim;
        if let Some(&bad) = cells.iter().find(|&&v| v >= num_vertices) {
            return Err(FemError::IndexOutOfRange {
                what: "vertex",
                index: bad,
                len: num_vertices,
            });
        }

        // Number facets by first appearance; a facet seen once lies on the boundary.
        let mut facet_ids: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut incidence: Vec<(usize, PointId, usize)> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        for (c, verts) in cells.chunks_exact(nv).enumerate() {
            for local in 0..nv {
                let mut key: Vec<usize> = verts
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &v)| (i != local).then_some(v))
                    .collect();
                key.sort_unstable();
                let next = facet_ids.len();
                let id = *facet_ids.entry(key).or_insert(next);
                if id == counts.len() {
                    counts.push(0);
                    incidence.push((id, PointId::from_index(c), local));
                }
                counts[id] += 1;
            }
        }
        let exterior = incidence
            .into_iter()
            .filter(|&(id, _, _)| counts[id] == 1)
            .map(|(id, cell, local_facet)| ExteriorFacet {
                facet: PointId::from_index(id),
                cell,
                local_facet,
            })
            .collect();

        Ok(Self {
            gdim,
            tdim,
            coordinates,
            cells,
            num_facets: counts.len(),
            exterior,
        })
    }

    /// Uniform partition of `[a, b]` into `n` segments.
    pub fn interval(n: usize, a: f64, b: f64) -> Result<Self, FemError> {
        if n == 0 {
            return Err(FemError::Configuration("interval needs at least one cell".into()));
        }
        let h = (b - a) / n as f64;
        let coords = (0..=n).map(|i| a + h * i as f64).collect();
        let cells = (0..n).flat_map(|i| [i, i + 1]).collect();
        Self::new(1, 1, coords, cells)
    }

    /// Unit square split into `2 * nx * ny` triangles.
    pub fn unit_square(nx: usize, ny: usize) -> Result<Self, FemError> {
        if nx == 0 || ny == 0 {
            return Err(FemError::Configuration("unit square needs nx, ny > 0".into()));
        }
        let mut coords = Vec::with_capacity(2 * (nx + 1) * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                coords.push(i as f64 / nx as f64);
                coords.push(j as f64 / ny as f64);
            }
        }
        let v = |i: usize, j: usize| j * (nx + 1) + i;
        let mut cells = Vec::with_capacity(6 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                cells.extend([v(i, j), v(i + 1, j), v(i + 1, j + 1)]);
                cells.extend([v(i, j), v(i + 1, j + 1), v(i, j + 1)]);
            }
        }
        Self::new(2, 2, coords, cells)
    }

    pub fn num_vertices(&self) -> usize {
        self.coordinates.len() / self.gdim
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len() / (self.tdim + 1)
    }

    fn cell_index(&self, cell: PointId) -> Result<usize, FemError> {
        let idx = cell.index();
        FemError::check_index("cell", idx, self.num_cells())?;
        Ok(idx)
    }
}

impl Mesh for SimplexMesh {
    fn topological_dim(&self) -> usize {
        self.tdim
    }

    fn geometric_dim(&self) -> usize {
        self.gdim
    }

    fn num_entities(&self, dim: usize) -> usize {
        if dim == self.tdim {
            self.num_cells()
        } else if dim == 0 {
            self.num_vertices()
        } else if dim + 1 == self.tdim {
            self.num_facets
        } else {
            0
        }
    }

    fn cell_vertices(&self, cell: PointId) -> Result<&[usize], FemError> {
        let nv = self.tdim + 1;
        let c = self.cell_index(cell)?;
        Ok(&self.cells[c * nv..(c + 1) * nv])
    }

    fn cell_coordinates(&self, cell: PointId, out: &mut Vec<f64>) -> Result<(), FemError> {
        out.clear();
        for &v in self.cell_vertices(cell)? {
            out.extend_from_slice(&self.coordinates[v * self.gdim..(v + 1) * self.gdim]);
        }
        Ok(())
    }

    fn exterior_facets(&self) -> &[ExteriorFacet] {
        &self.exterior
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_boundary_has_two_points() {
        let mesh = SimplexMesh::interval(4, 0.0, 1.0).unwrap();
        assert_eq!(mesh.num_entities(1), 4);
        assert_eq!(mesh.num_entities(0), 5);
        let ext = mesh.exterior_facets();
        assert_eq!(ext.len(), 2);
        assert_eq!(ext[0].cell, PointId::from_index(0));
        assert_eq!(ext[1].cell, PointId::from_index(3));
    }

    #[test]
    fn unit_square_counts() {
        let mesh = SimplexMesh::unit_square(2, 2).unwrap();
        assert_eq!(mesh.num_cells(), 8);
        assert_eq!(mesh.num_vertices(), 9);
        // 4 * 2 boundary edges, 16 edges in total
        assert_eq!(mesh.exterior_facets().len(), 8);
        assert_eq!(mesh.num_entities(1), 16);
    }

    #[test]
    fn cell_coordinates_are_vertex_major() {
        let mesh = SimplexMesh::interval(2, 0.0, 1.0).unwrap();
        let mut buf = Vec::new();
        mesh.cell_coordinates(PointId::from_index(1), &mut buf).unwrap();
        assert_eq!(buf, vec![0.5, 1.0]);
        assert!(matches!(
            mesh.cell_coordinates(PointId::from_index(2), &mut buf),
            Err(FemError::IndexOutOfRange { what: "cell", .. })
        ));
    }

    #[test]
    fn rejects_bad_connectivity() {
        let err = SimplexMesh::new(1, 1, vec![0.0, 1.0], vec![0, 2]).unwrap_err();
        assert!(matches!(err, FemError::IndexOutOfRange { what: "vertex", .. }));
    }
}
