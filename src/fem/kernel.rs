//! Generated-kernel collaborator: descriptor and integral entry points.
//!
//! A code generator (or a hand-written test) describes a form through
//! [`KernelDescriptor`]: its rank, its coefficients, and one
//! [`IntegralKernel`] per (domain kind, subdomain). This crate consumes
//! kernels, it never evaluates integrals itself.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

/// Kind of mesh domain an integral runs over.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum IntegralType {
    Cell,
    ExteriorFacet,
    InteriorFacet,
    Vertex,
}

impl IntegralType {
    /// All kinds in iteration order.
    pub const ALL: [IntegralType; 4] = [
        IntegralType::Cell,
        IntegralType::ExteriorFacet,
        IntegralType::InteriorFacet,
        IntegralType::Vertex,
    ];

    /// Dense position of the kind, for per-kind arrays.
    #[inline]
    pub const fn position(self) -> usize {
        match self {
            IntegralType::Cell => 0,
            IntegralType::ExteriorFacet => 1,
            IntegralType::InteriorFacet => 2,
            IntegralType::Vertex => 3,
        }
    }

    /// Topological dimension of the integrated entities on a mesh of dimension `tdim`.
    pub const fn entity_dim(self, tdim: usize) -> usize {
        match self {
            IntegralType::Cell => tdim,
            IntegralType::ExteriorFacet | IntegralType::InteriorFacet => tdim.saturating_sub(1),
            IntegralType::Vertex => 0,
        }
    }

    /// Number of cells whose dofs couple in one local block.
    pub const fn cells_per_entity(self) -> usize {
        match self {
            IntegralType::InteriorFacet => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for IntegralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntegralType::Cell => "cell",
            IntegralType::ExteriorFacet => "exterior_facet",
            IntegralType::InteriorFacet => "interior_facet",
            IntegralType::Vertex => "vertex",
        };
        f.write_str(s)
    }
}

/// Geometry of the entity handed to a kernel.
#[derive(Copy, Clone, Debug)]
pub struct EntityGeometry<'a> {
    /// Vertex coordinates of the (owning) cell, vertex-major.
    pub coordinates: &'a [f64],
    /// Local facet index within the owning cell, for facet integrals.
    pub local_facet: Option<usize>,
}

/// A generated integral entry point.
///
/// `out` is pre-zeroed and has exactly the local block length of the entity;
/// `coefficients` holds the restricted values of the enabled coefficients,
/// concatenated in coefficient order.
pub trait IntegralKernel: Send + Sync {
    fn tabulate(
        &self,
        out: &mut [f64],
        coefficients: &[f64],
        geometry: &EntityGeometry<'_>,
        marker: Option<usize>,
    );
}

impl<F> IntegralKernel for F
where
    F: Fn(&mut [f64], &[f64], &EntityGeometry<'_>, Option<usize>) + Send + Sync,
{
    fn tabulate(
        &self,
        out: &mut [f64],
        coefficients: &[f64],
        geometry: &EntityGeometry<'_>,
        marker: Option<usize>,
    ) {
        self(out, coefficients, geometry, marker)
    }
}

/// Pins a closure to the kernel signature so its argument types need no annotations.
#[inline]
pub fn kernel_fn<F>(f: F) -> F
where
    F: Fn(&mut [f64], &[f64], &EntityGeometry<'_>, Option<usize>) + Send + Sync,
{
    f
}

/// One integral of a form as declared by its descriptor.
#[derive(Clone)]
pub struct IntegralRecord {
    pub kind: IntegralType,
    /// Subdomain the integral is restricted to; `None` is the default integral.
    pub subdomain: Option<usize>,
    pub kernel: Arc<dyn IntegralKernel>,
    /// Which coefficients the kernel reads; `None` means all of them.
    pub enabled_coefficients: Option<Vec<bool>>,
}

impl fmt::Debug for IntegralRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegralRecord")
            .field("kind", &self.kind)
            .field("subdomain", &self.subdomain)
            .field("enabled_coefficients", &self.enabled_coefficients)
            .finish_non_exhaustive()
    }
}

/// Everything a form needs to know about its generated code.
pub trait KernelDescriptor: Send + Sync {
    /// Number of arguments (0 functional, 1 linear, 2 bilinear, ...).
    fn rank(&self) -> usize;

    fn num_coefficients(&self) -> usize;

    /// Built-in index → name map.
    fn coefficient_name(&self, i: usize) -> Option<&str>;

    /// Built-in name → index map.
    fn coefficient_index(&self, name: &str) -> Option<usize>;

    /// Position of coefficient `i` before unused coefficients were dropped.
    fn original_coefficient_position(&self, i: usize) -> Option<usize>;

    /// All integrals, any order.
    fn integrals(&self) -> Vec<IntegralRecord>;
}

/// Owned descriptor assembled with a builder, the shape a code generator emits.
///
/// ```rust
/// # use sieve_form::fem::kernel::{FormDescriptor, IntegralType, KernelDescriptor, kernel_fn};
/// let desc = FormDescriptor::new(0)
///     .coefficient("f")
///     .integral(IntegralType::Cell, None, kernel_fn(|out, w, _, _| out[0] = w[0]));
/// assert_eq!(desc.coefficient_index("f"), Some(0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct FormDescriptor {
    rank: usize,
    names: Vec<String>,
    original_positions: Vec<usize>,
    by_name: HashMap<String, usize>,
    integrals: Vec<IntegralRecord>,
}

impl FormDescriptor {
    pub fn new(rank: usize) -> Self {
        Self {
            rank,
            ..Self::default()
        }
    }

    /// Declare the next coefficient; its original position is its index.
    pub fn coefficient(self, name: impl Into<String>) -> Self {
        let pos = self.names.len();
        self.coefficient_at(name, pos)
    }

    /// Declare the next coefficient with an explicit original position.
    pub fn coefficient_at(mut self, name: impl Into<String>, original_position: usize) -> Self {
        let name = name.into();
        self.by_name.insert(name.clone(), self.names.len());
        self.names.push(name);
        self.original_positions.push(original_position);
        self
    }

    /// Add an integral reading every coefficient.
    pub fn integral<K>(self, kind: IntegralType, subdomain: Option<usize>, kernel: K) -> Self
    where
        K: IntegralKernel + 'static,
    {
        self.integral_with(kind, subdomain, kernel, None)
    }

    /// Add an integral with an explicit enabled-coefficients mask.
    pub fn integral_with<K>(
        mut self,
        kind: IntegralType,
        subdomain: Option<usize>,
        kernel: K,
        enabled_coefficients: Option<Vec<bool>>,
    ) -> Self
    where
        K: IntegralKernel + 'static,
    {
        self.integrals.push(IntegralRecord {
            kind,
            subdomain,
            kernel: Arc::new(kernel),
            enabled_coefficients,
        });
        self
    }

    /// Wrap into the shared handle forms are built from.
    pub fn into_shared(self) -> Arc<dyn KernelDescriptor> {
        Arc::new(self)
    }
}

impl KernelDescriptor for FormDescriptor {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_coefficients(&self) -> usize {
        self.names.len()
    }

    fn coefficient_name(&self, i: usize) -> Option<&str> {
        self.names.get(i).map(String::as_str)
    }

    fn coefficient_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    fn original_coefficient_position(&self, i: usize) -> Option<usize> {
        self.original_positions.get(i).copied()
    }

    fn integrals(&self) -> Vec<IntegralRecord> {
        self.integrals.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut [f64], _: &[f64], _: &EntityGeometry<'_>, _: Option<usize>) {}

    #[test]
    fn builder_maps_names_both_ways() {
        let d = FormDescriptor::new(1)
            .coefficient("kappa")
            .coefficient_at("f", 3)
            .integral(IntegralType::Cell, None, noop);
        assert_eq!(d.num_coefficients(), 2);
        assert_eq!(d.coefficient_index("f"), Some(1));
        assert_eq!(d.coefficient_name(0), Some("kappa"));
        assert_eq!(d.original_coefficient_position(1), Some(3));
        assert_eq!(d.coefficient_index("g"), None);
        assert_eq!(d.integrals().len(), 1);
    }

    #[test]
    fn interior_facets_couple_two_cells() {
        assert_eq!(IntegralType::InteriorFacet.cells_per_entity(), 2);
        assert_eq!(IntegralType::Cell.cells_per_entity(), 1);
        assert_eq!(IntegralType::ExteriorFacet.entity_dim(2), 1);
        assert_eq!(IntegralType::Vertex.to_string(), "vertex");
    }
}
