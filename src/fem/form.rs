//! `VariationalForm`: argument spaces, mesh, domain markers, coefficients and
//! integrals composed into one assemblable object.
//!
//! # Argument order
//! Argument spaces are numbered by the tensor dimension they index: space 0
//! is the test space (rows), space 1 the trial space (columns). A bilinear
//! form written `a(u, v)` with trial function `u` and test function `v` is
//! therefore constructed from `[V_test, V_trial]`.
//!
//! A form is immutable after construction except for its domain markers, its
//! explicit mesh and its coefficient bindings; it can be shared read-only by
//! any number of assemblers.

use std::fmt;
use std::sync::Arc;

use crate::fem::coefficients::CoefficientSet;
use crate::fem::function_space::ArgumentSpace;
use crate::fem::integrals::IntegralSet;
use crate::fem::kernel::{IntegralType, KernelDescriptor};
use crate::fem_error::FemError;
use crate::topology::markers::{DomainMarkers, MarkerRef};
use crate::topology::mesh::Mesh;

/// Replacement for the descriptor's built-in coefficient name ↔ index maps.
///
/// Once installed on a form, lookups consult the resolver exclusively.
pub trait CoefficientResolver: Send + Sync {
    fn index_of(&self, name: &str) -> Option<usize>;
    fn name_of(&self, index: usize) -> Option<String>;
}

/// Resolver backed by an ordered list of names (index = position).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameListResolver {
    names: Vec<String>,
}

impl NameListResolver {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl CoefficientResolver for NameListResolver {
    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn name_of(&self, index: usize) -> Option<String> {
        self.names.get(index).cloned()
    }
}

/// A variational form of arbitrary rank.
pub struct VariationalForm {
    descriptor: Arc<dyn KernelDescriptor>,
    spaces: Vec<Arc<dyn ArgumentSpace>>,
    mesh: Option<Arc<dyn Mesh>>,
    domains: [MarkerRef; 4],
    coefficients: CoefficientSet,
    integrals: IntegralSet,
    resolver: Option<Arc<dyn CoefficientResolver>>,
}

fn same_mesh(a: &Arc<dyn Mesh>, b: &Arc<dyn Mesh>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl VariationalForm {
    /// Build a form from its generated descriptor and argument spaces
    /// (test space first).
    ///
    /// Fails with [`FemError::Configuration`] when the descriptor rank differs
    /// from the number of spaces, when the spaces live on different meshes,
    /// when the descriptor declares duplicate coefficients or integrals, or
    /// when an integral's coefficient mask is longer than the coefficient list.
    pub fn new(
        descriptor: Arc<dyn KernelDescriptor>,
        spaces: Vec<Arc<dyn ArgumentSpace>>,
    ) -> Result<Self, FemError> {
        if descriptor.rank() != spaces.len() {
            return Err(FemError::Configuration(format!(
                "form of rank {} given {} argument space(s)",
                descriptor.rank(),
                spaces.len()
            )));
        }
        if let Some((first, rest)) = spaces.split_first() {
            let m0 = first.mesh();
            if rest.iter().any(|s| !same_mesh(&m0, &s.mesh())) {
                return Err(FemError::Configuration(
                    "argument spaces are defined on different meshes".into(),
                ));
            }
        }

        let mut coefficients = CoefficientSet::new();
        for i in 0..descriptor.num_coefficients() {
            let name = descriptor
                .coefficient_name(i)
                .map_or_else(|| format!("w{i}"), str::to_string);
            let pos = descriptor.original_coefficient_position(i).unwrap_or(i);
            coefficients.declare(name, pos)?;
        }
        let integrals =
            IntegralSet::from_records(descriptor.integrals(), descriptor.num_coefficients())?;

        log::debug!(
            "form: rank {}, {} coefficient(s), integrals {:?}",
            spaces.len(),
            coefficients.len(),
            integrals.kinds().collect::<Vec<_>>()
        );

        Ok(Self {
            descriptor,
            spaces,
            mesh: None,
            domains: Default::default(),
            coefficients,
            integrals,
            resolver: None,
        })
    }

    /// Number of arguments: 0 functional, 1 linear form, 2 bilinear form.
    #[inline]
    pub fn rank(&self) -> usize {
        self.spaces.len()
    }

    /// Space of argument `i` (0 = test, 1 = trial).
    pub fn function_space(&self, i: usize) -> Result<&Arc<dyn ArgumentSpace>, FemError> {
        self.spaces.get(i).ok_or(FemError::IndexOutOfRange {
            what: "argument",
            index: i,
            len: self.spaces.len(),
        })
    }

    pub fn function_spaces(&self) -> &[Arc<dyn ArgumentSpace>] {
        &self.spaces
    }

    // ---- coefficients -------------------------------------------------------

    pub fn coefficients(&self) -> &CoefficientSet {
        &self.coefficients
    }

    pub fn coefficients_mut(&mut self) -> &mut CoefficientSet {
        &mut self.coefficients
    }

    /// Index of the coefficient called `name`.
    pub fn get_coefficient_index(&self, name: &str) -> Result<usize, FemError> {
        let found = match &self.resolver {
            Some(r) => r.index_of(name),
            None => self.descriptor.coefficient_index(name),
        };
        found.ok_or_else(|| FemError::CoefficientNotFound(name.to_string()))
    }

    /// Name of coefficient `i`.
    pub fn get_coefficient_name(&self, i: usize) -> Result<String, FemError> {
        let found = match &self.resolver {
            Some(r) => r.name_of(i),
            None => self.descriptor.coefficient_name(i).map(str::to_string),
        };
        found.ok_or(FemError::CoefficientIndexNotFound(i))
    }

    /// Install a resolver that replaces the descriptor's name/index maps.
    pub fn set_coefficient_resolver(&mut self, resolver: Arc<dyn CoefficientResolver>) {
        self.resolver = Some(resolver);
    }

    /// Remove an installed resolver, restoring the descriptor's maps.
    pub fn clear_coefficient_resolver(&mut self) {
        self.resolver = None;
    }

    /// Position coefficient `i` held before unused coefficients were removed.
    pub fn original_coefficient_position(&self, i: usize) -> Result<usize, FemError> {
        self.coefficients.original_position(i)
    }

    // ---- integrals ----------------------------------------------------------

    pub fn integrals(&self) -> &IntegralSet {
        &self.integrals
    }

    /// Maximum cell dof count of every argument, in argument order.
    pub fn max_element_dofs(&self) -> Vec<usize> {
        self.spaces.iter().map(|s| s.max_element_dofs()).collect()
    }

    /// Exact upper bound on the number of values in a cell-local block:
    /// the product of each argument's maximum cell dof count (1 for rank 0).
    pub fn max_element_tensor_size(&self) -> usize {
        self.spaces.iter().map(|s| s.max_element_dofs()).product()
    }

    /// Upper bound on the local block of integrals of `kind` alone.
    pub fn max_element_tensor_size_for(&self, kind: IntegralType) -> usize {
        self.integrals.max_block_size(kind, &self.max_element_dofs())
    }

    // ---- mesh ---------------------------------------------------------------

    /// Set the mesh explicitly; required for functionals without argument spaces.
    pub fn set_mesh(&mut self, mesh: Arc<dyn Mesh>) {
        log::debug!("form: explicit mesh set (tdim = {})", mesh.topological_dim());
        self.mesh = Some(mesh);
    }

    /// Explicit mesh if set, otherwise the mesh of argument space 0.
    pub fn mesh(&self) -> Result<Arc<dyn Mesh>, FemError> {
        if let Some(m) = &self.mesh {
            return Ok(Arc::clone(m));
        }
        self.spaces.first().map(|s| s.mesh()).ok_or_else(|| {
            FemError::Configuration(
                "form has no mesh and no argument space to take it from".into(),
            )
        })
    }

    // ---- domain markers -----------------------------------------------------

    /// Markers for integrals of `kind`; `None` means no subdomain distinction.
    pub fn domains(&self, kind: IntegralType) -> Option<&Arc<DomainMarkers>> {
        self.domains[kind.position()].as_ref()
    }

    /// Replace the markers for integrals of `kind` wholesale.
    pub fn set_domains(&mut self, kind: IntegralType, markers: MarkerRef) {
        log::debug!(
            "form: {kind} domains {}",
            if markers.is_some() { "set" } else { "cleared" }
        );
        self.domains[kind.position()] = markers;
    }

    pub fn cell_domains(&self) -> Option<&Arc<DomainMarkers>> {
        self.domains(IntegralType::Cell)
    }

    pub fn exterior_facet_domains(&self) -> Option<&Arc<DomainMarkers>> {
        self.domains(IntegralType::ExteriorFacet)
    }

    pub fn interior_facet_domains(&self) -> Option<&Arc<DomainMarkers>> {
        self.domains(IntegralType::InteriorFacet)
    }

    pub fn vertex_domains(&self) -> Option<&Arc<DomainMarkers>> {
        self.domains(IntegralType::Vertex)
    }

    pub fn set_cell_domains(&mut self, markers: MarkerRef) {
        self.set_domains(IntegralType::Cell, markers)
    }

    pub fn set_exterior_facet_domains(&mut self, markers: MarkerRef) {
        self.set_domains(IntegralType::ExteriorFacet, markers)
    }

    pub fn set_interior_facet_domains(&mut self, markers: MarkerRef) {
        self.set_domains(IntegralType::InteriorFacet, markers)
    }

    pub fn set_vertex_domains(&mut self, markers: MarkerRef) {
        self.set_domains(IntegralType::Vertex, markers)
    }
}

impl fmt::Debug for VariationalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariationalForm")
            .field("rank", &self.rank())
            .field("spaces", &self.spaces)
            .field("coefficients", &self.coefficients)
            .field("integrals", &self.integrals)
            .field("domains", &self.domains)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::function_space::DofMapSpace;
    use crate::fem::kernel::FormDescriptor;
    use crate::topology::mesh::SimplexMesh;

    fn p1() -> Arc<dyn ArgumentSpace> {
        let mesh: Arc<dyn Mesh> = Arc::new(SimplexMesh::unit_square(1, 1).unwrap());
        Arc::new(DofMapSpace::lagrange_p1(mesh).unwrap())
    }

    #[test]
    fn functional_without_mesh_is_a_configuration_error() {
        let form = VariationalForm::new(FormDescriptor::new(0).into_shared(), vec![]).unwrap();
        assert_eq!(form.rank(), 0);
        assert_eq!(form.max_element_tensor_size(), 1);
        assert!(matches!(form.mesh(), Err(FemError::Configuration(_))));
    }

    #[test]
    fn mesh_is_derived_from_first_space() {
        let v = p1();
        let form = VariationalForm::new(FormDescriptor::new(1).into_shared(), vec![v.clone()])
            .unwrap();
        assert!(same_mesh(&form.mesh().unwrap(), &v.mesh()));
    }

    #[test]
    fn spaces_on_different_meshes_are_rejected() {
        let err = VariationalForm::new(FormDescriptor::new(2).into_shared(), vec![p1(), p1()])
            .unwrap_err();
        assert!(matches!(err, FemError::Configuration(_)));
    }

    #[test]
    fn original_positions_survive_construction() {
        let mut desc = FormDescriptor::new(0).coefficient("f");
        desc = desc.coefficient_at("g", 4);
        let form = VariationalForm::new(desc.into_shared(), vec![]).unwrap();
        assert_eq!(form.coefficients().name_of(1), Some("g"));
        assert_eq!(form.original_coefficient_position(1).unwrap(), 4);
    }
}
