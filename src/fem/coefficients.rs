//! Ordered registry of the coefficient functions a form's kernels read.
//!
//! Kernels address coefficients positionally, so insertion order is part of
//! the contract. Names are unique and looked up in O(1).

use std::fmt::Debug;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::fem_error::FemError;
use crate::topology::point::PointId;

/// A function that can be restricted to a cell for kernel evaluation.
pub trait CoefficientFunction: Debug + Send + Sync {
    /// Append the values the kernel expects on `cell` to `out`.
    ///
    /// `coordinates` are the cell's vertex coordinates (vertex-major).
    fn restrict(
        &self,
        cell: PointId,
        coordinates: &[f64],
        out: &mut Vec<f64>,
    ) -> Result<(), FemError>;
}

/// Spatially constant coefficient (scalar or vector valued).
#[derive(Clone, Debug, PartialEq)]
pub struct Constant(pub Vec<f64>);

impl Constant {
    pub fn scalar(value: f64) -> Self {
        Constant(vec![value])
    }
}

impl CoefficientFunction for Constant {
    fn restrict(&self, _cell: PointId, _coordinates: &[f64], out: &mut Vec<f64>) -> Result<(), FemError> {
        out.extend_from_slice(&self.0);
        Ok(())
    }
}

/// Piecewise values given per cell, `values_per_cell` entries each.
#[derive(Clone, Debug, PartialEq)]
pub struct CellwiseValues {
    values_per_cell: usize,
    values: Vec<f64>,
}

impl CellwiseValues {
    pub fn new(values_per_cell: usize, values: Vec<f64>) -> Result<Self, FemError> {
        if values_per_cell == 0 || values.len() % values_per_cell != 0 {
            return Err(FemError::Configuration(
                "cellwise values are not a multiple of the per-cell width".into(),
            ));
        }
        Ok(Self {
            values_per_cell,
            values,
        })
    }
}

impl CoefficientFunction for CellwiseValues {
    fn restrict(&self, cell: PointId, _coordinates: &[f64], out: &mut Vec<f64>) -> Result<(), FemError> {
        let c = cell.index();
        let w = self.values_per_cell;
        FemError::check_index("cell", c, self.values.len() / w)?;
        out.extend_from_slice(&self.values[c * w..(c + 1) * w]);
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct Entry {
    name: String,
    function: Option<Arc<dyn CoefficientFunction>>,
    original_position: usize,
}

/// Ordered `(name, function, original position)` registry.
#[derive(Clone, Debug, Default)]
pub struct CoefficientSet {
    entries: Vec<Entry>,
    by_name: HashMap<String, usize>,
}

impl CoefficientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the next coefficient slot (unbound). Returns its index.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        original_position: usize,
    ) -> Result<usize, FemError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(FemError::Configuration(format!(
                "coefficient `{name}` declared twice"
            )));
        }
        let idx = self.entries.len();
        self.by_name.insert(name.clone(), idx);
        self.entries.push(Entry {
            name,
            function: None,
            original_position,
        });
        Ok(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind `function` to slot `i`, replacing any previous binding.
    pub fn set(&mut self, i: usize, function: Arc<dyn CoefficientFunction>) -> Result<(), FemError> {
        FemError::check_index("coefficient", i, self.entries.len())?;
        self.entries[i].function = Some(function);
        Ok(())
    }

    /// Bind `function` to the slot named `name`.
    pub fn set_by_name(
        &mut self,
        name: &str,
        function: Arc<dyn CoefficientFunction>,
    ) -> Result<(), FemError> {
        let i = self
            .index_of(name)
            .ok_or_else(|| FemError::CoefficientNotFound(name.to_string()))?;
        self.set(i, function)
    }

    /// Function bound to slot `i`, `Ok(None)` if declared but unbound.
    pub fn get(&self, i: usize) -> Result<Option<&Arc<dyn CoefficientFunction>>, FemError> {
        FemError::check_index("coefficient", i, self.entries.len())?;
        Ok(self.entries[i].function.as_ref())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, i: usize) -> Option<&str> {
        self.entries.get(i).map(|e| e.name.as_str())
    }

    pub fn original_position(&self, i: usize) -> Result<usize, FemError> {
        FemError::check_index("coefficient", i, self.entries.len())?;
        Ok(self.entries[i].original_position)
    }

    /// Fails with the first slot that has no function bound.
    pub fn check_all_set(&self) -> Result<(), FemError> {
        match self.entries.iter().position(|e| e.function.is_none()) {
            None => Ok(()),
            Some(i) => Err(FemError::Configuration(format!(
                "coefficient {i} (`{}`) has not been set",
                self.entries[i].name
            ))),
        }
    }

    /// Iterate `(name, function, original position)` in slot order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&str, Option<&Arc<dyn CoefficientFunction>>, usize)> + '_ {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.function.as_ref(), e.original_position))
    }
}
