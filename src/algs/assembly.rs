//! High-level assembly of a variational form into a generic tensor.
//!
//! The driver:
//! 1. validates the form against the destination tensor,
//! 2. evaluates cell and exterior-facet kernels into a scratch block sized
//!    from the form's exact local-block bound,
//! 3. adds every block through [`GenericTensor::add`], and
//! 4. finalizes with one collective [`GenericTensor::apply`].
//!
//! On any error the destination is zeroed and the error returned; a partially
//! assembled tensor is never handed back as valid.

use crate::fem::coefficients::CoefficientSet;
use crate::fem::form::VariationalForm;
use crate::fem::integrals::Integral;
use crate::fem::kernel::{EntityGeometry, IntegralType};
use crate::fem_error::FemError;
use crate::la::factory::TensorFactory;
use crate::la::tensor::{ApplyMode, GenericTensor};
use crate::topology::point::PointId;

/// Knobs of one assembly pass.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssemblerOptions {
    /// Zero the destination before adding contributions.
    pub reset_tensor: bool,
    /// Call `apply` once all local contributions are added.
    pub finalize: bool,
    /// Mode passed to `apply`.
    pub apply_mode: ApplyMode,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            reset_tensor: true,
            finalize: true,
            apply_mode: ApplyMode::Add,
        }
    }
}

/// Cell/exterior-facet assembler.
#[derive(Clone, Debug, Default)]
pub struct Assembler {
    options: AssemblerOptions,
}

/// Reusable per-pass buffers.
struct Scratch {
    block: Vec<f64>,
    coordinates: Vec<f64>,
    coefficients: Vec<f64>,
}

impl Assembler {
    pub fn new(options: AssemblerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Assemble `form` into `tensor`.
    pub fn assemble<T>(&self, form: &VariationalForm, tensor: &mut T) -> Result<(), FemError>
    where
        T: GenericTensor + ?Sized,
    {
        self.assemble_inner(form, tensor).inspect_err(|e| {
            log::warn!("assembly failed, discarding partial result: {e}");
            tensor.zero();
        })
    }

    /// Create a tensor with `factory`, sized by the form's argument spaces, and assemble into it.
    pub fn assemble_new<F>(&self, factory: &F, form: &VariationalForm) -> Result<F::Tensor, FemError>
    where
        F: TensorFactory,
    {
        let dims: Vec<usize> = form.function_spaces().iter().map(|s| s.dim()).collect();
        let mut tensor = factory.create(form.rank(), &dims)?;
        self.assemble(form, &mut tensor)?;
        Ok(tensor)
    }

    fn assemble_inner<T>(&self, form: &VariationalForm, tensor: &mut T) -> Result<(), FemError>
    where
        T: GenericTensor + ?Sized,
    {
        if tensor.rank() != form.rank() {
            return Err(FemError::UnsupportedRank {
                expected: form.rank(),
                found: tensor.rank(),
            });
        }
        if form.integrals().has_integrals(IntegralType::InteriorFacet) {
            return Err(FemError::UnsupportedOperation(
                "interior facet integrals are not handled by this assembler",
            ));
        }
        if form.integrals().has_integrals(IntegralType::Vertex) {
            return Err(FemError::UnsupportedOperation(
                "vertex integrals are not handled by this assembler",
            ));
        }
        form.coefficients().check_all_set()?;
        check_marker_dims(form)?;

        if self.options.reset_tensor {
            tensor.zero();
        }

        let mut scratch = Scratch {
            block: vec![0.0; form.max_element_tensor_size()],
            coordinates: Vec::new(),
            coefficients: Vec::new(),
        };
        self.assemble_cells(form, tensor, &mut scratch)?;
        self.assemble_exterior_facets(form, tensor, &mut scratch)?;

        if self.options.finalize {
            tensor.apply(self.options.apply_mode)?;
        }
        Ok(())
    }

    fn assemble_cells<T>(
        &self,
        form: &VariationalForm,
        tensor: &mut T,
        scratch: &mut Scratch,
    ) -> Result<(), FemError>
    where
        T: GenericTensor + ?Sized,
    {
        if !form.integrals().has_integrals(IntegralType::Cell) {
            return Ok(());
        }
        let mesh = form.mesh()?;
        let markers = form.cell_domains();
        let mut count = 0usize;
        for cell in mesh.cells() {
            let marker = markers.and_then(|m| m.get(cell));
            let Some(integral) = form.integrals().integral_for(IntegralType::Cell, marker) else {
                continue;
            };
            mesh.cell_coordinates(cell, &mut scratch.coordinates)?;
            add_entity_block(form, tensor, scratch, integral, cell, None, marker)?;
            count += 1;
        }
        log::trace!("assembled {count} cell block(s)");
        Ok(())
    }

    fn assemble_exterior_facets<T>(
        &self,
        form: &VariationalForm,
        tensor: &mut T,
        scratch: &mut Scratch,
    ) -> Result<(), FemError>
    where
        T: GenericTensor + ?Sized,
    {
        if !form.integrals().has_integrals(IntegralType::ExteriorFacet) {
            return Ok(());
        }
        let mesh = form.mesh()?;
        let markers = form.exterior_facet_domains();
        let mut count = 0usize;
        for ef in mesh.exterior_facets() {
            let marker = markers.and_then(|m| m.get(ef.facet));
            let Some(integral) = form
                .integrals()
                .integral_for(IntegralType::ExteriorFacet, marker)
            else {
                continue;
            };
            mesh.cell_coordinates(ef.cell, &mut scratch.coordinates)?;
            add_entity_block(
                form,
                tensor,
                scratch,
                integral,
                ef.cell,
                Some(ef.local_facet),
                marker,
            )?;
            count += 1;
        }
        log::trace!("assembled {count} exterior facet block(s)");
        Ok(())
    }
}

/// Installed markers must label entities of the dimension their kind integrates over.
fn check_marker_dims(form: &VariationalForm) -> Result<(), FemError> {
    let installed: Vec<_> = IntegralType::ALL
        .into_iter()
        .filter_map(|kind| form.domains(kind).map(|m| (kind, m.dim())))
        .collect();
    if installed.is_empty() {
        return Ok(());
    }
    let tdim = form.mesh()?.topological_dim();
    for (kind, dim) in installed {
        let expected = kind.entity_dim(tdim);
        if dim != expected {
            return Err(FemError::Configuration(format!(
                "{kind} domains label dimension-{dim} entities, expected dimension {expected}"
            )));
        }
    }
    Ok(())
}

/// Restrict the coefficients enabled for `integral` to `cell`.
fn gather_coefficients(
    coefficients: &CoefficientSet,
    integral: &Integral,
    cell: PointId,
    coordinates: &[f64],
    out: &mut Vec<f64>,
) -> Result<(), FemError> {
    out.clear();
    for (i, (name, function, _)) in coefficients.iter().enumerate() {
        if !integral.uses_coefficient(i) {
            continue;
        }
        let f = function.ok_or_else(|| {
            FemError::Configuration(format!("coefficient {i} (`{name}`) has not been set"))
        })?;
        f.restrict(cell, coordinates, out)?;
    }
    Ok(())
}

/// Evaluate one kernel on one entity and add the block.
fn add_entity_block<T>(
    form: &VariationalForm,
    tensor: &mut T,
    scratch: &mut Scratch,
    integral: &Integral,
    cell: PointId,
    local_facet: Option<usize>,
    marker: Option<usize>,
) -> Result<(), FemError>
where
    T: GenericTensor + ?Sized,
{
    let mut rows: Vec<&[usize]> = Vec::with_capacity(form.rank());
    for space in form.function_spaces() {
        rows.push(space.cell_dofs(cell)?);
    }
    let n: usize = rows.iter().map(|r| r.len()).product();
    // The scratch block is sized from the exact bound; a larger block means a
    // space reported a wrong maximum.
    if n > scratch.block.len() {
        return Err(FemError::BlockShape {
            expected: scratch.block.len(),
            found: n,
        });
    }
    gather_coefficients(
        form.coefficients(),
        integral,
        cell,
        &scratch.coordinates,
        &mut scratch.coefficients,
    )?;

    let block = &mut scratch.block[..n];
    block.fill(0.0);
    let geometry = EntityGeometry {
        coordinates: &scratch.coordinates,
        local_facet,
    };
    integral
        .kernel()
        .tabulate(block, &scratch.coefficients, &geometry, marker);
    tensor.add(block, &rows)
}
