//! Integral kernels of a form, classified by domain kind.

use std::fmt;
use std::sync::Arc;

use crate::fem::kernel::{IntegralKernel, IntegralRecord, IntegralType};
use crate::fem_error::FemError;

/// One registered integral.
#[derive(Clone)]
pub struct Integral {
    subdomain: Option<usize>,
    kernel: Arc<dyn IntegralKernel>,
    enabled_coefficients: Option<Vec<bool>>,
}

impl Integral {
    /// Subdomain marker this integral is restricted to; `None` for the default integral.
    pub fn subdomain(&self) -> Option<usize> {
        self.subdomain
    }

    pub fn kernel(&self) -> &dyn IntegralKernel {
        self.kernel.as_ref()
    }

    /// Whether the kernel reads coefficient `i`.
    pub fn uses_coefficient(&self, i: usize) -> bool {
        self.enabled_coefficients
            .as_ref()
            .map_or(true, |mask| mask.get(i).copied().unwrap_or(false))
    }
}

impl fmt::Debug for Integral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integral")
            .field("subdomain", &self.subdomain)
            .field("enabled_coefficients", &self.enabled_coefficients)
            .finish_non_exhaustive()
    }
}

/// Integrals grouped by [`IntegralType`]; within a kind the default integral
/// comes first, then subdomain integrals by ascending marker.
#[derive(Clone, Debug, Default)]
pub struct IntegralSet {
    by_kind: [Vec<Integral>; 4],
}

impl IntegralSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from descriptor records of a form with `num_coefficients`
    /// coefficients. Two integrals for the same kind and subdomain, or a
    /// coefficient mask longer than the coefficient list, are configuration
    /// errors.
    pub fn from_records<I>(records: I, num_coefficients: usize) -> Result<Self, FemError>
    where
        I: IntoIterator<Item = IntegralRecord>,
    {
        let mut set = Self::new();
        for rec in records {
            if let Some(mask) = &rec.enabled_coefficients {
                if mask.len() > num_coefficients {
                    return Err(FemError::Configuration(format!(
                        "{} integral enables {} coefficients, form declares {num_coefficients}",
                        rec.kind,
                        mask.len()
                    )));
                }
            }
            set.insert(rec)?;
        }
        Ok(set)
    }

    /// Register one integral.
    pub fn insert(&mut self, record: IntegralRecord) -> Result<(), FemError> {
        let list = &mut self.by_kind[record.kind.position()];
        // `None` sorts before every `Some`, which puts the default integral first.
        match list.binary_search_by_key(&record.subdomain, |i| i.subdomain) {
            Ok(_) => Err(FemError::Configuration(format!(
                "duplicate {} integral for subdomain {:?}",
                record.kind, record.subdomain
            ))),
            Err(pos) => {
                list.insert(
                    pos,
                    Integral {
                        subdomain: record.subdomain,
                        kernel: record.kernel,
                        enabled_coefficients: record.enabled_coefficients,
                    },
                );
                Ok(())
            }
        }
    }

    pub fn integrals(&self, kind: IntegralType) -> &[Integral] {
        &self.by_kind[kind.position()]
    }

    pub fn num_integrals(&self, kind: IntegralType) -> usize {
        self.by_kind[kind.position()].len()
    }

    pub fn has_integrals(&self, kind: IntegralType) -> bool {
        !self.by_kind[kind.position()].is_empty()
    }

    /// Kinds with at least one integral, in [`IntegralType::ALL`] order.
    pub fn kinds(&self) -> impl Iterator<Item = IntegralType> + '_ {
        IntegralType::ALL
            .into_iter()
            .filter(|&k| self.has_integrals(k))
    }

    pub fn default_integral(&self, kind: IntegralType) -> Option<&Integral> {
        self.by_kind[kind.position()]
            .first()
            .filter(|i| i.subdomain.is_none())
    }

    /// Integral applying to an entity carrying `marker`: the matching
    /// subdomain integral if one exists, else the default integral.
    pub fn integral_for(&self, kind: IntegralType, marker: Option<usize>) -> Option<&Integral> {
        let list = &self.by_kind[kind.position()];
        marker
            .and_then(|m| {
                list.binary_search_by_key(&Some(m), |i| i.subdomain)
                    .ok()
                    .map(|pos| &list[pos])
            })
            .or_else(|| self.default_integral(kind))
    }

    /// Largest local block for integrals of `kind` alone, given the
    /// per-argument maximum cell dof counts. Zero when the kind is absent.
    pub fn max_block_size(&self, kind: IntegralType, max_dofs: &[usize]) -> usize {
        if !self.has_integrals(kind) {
            return 0;
        }
        let cells = kind.cells_per_entity();
        max_dofs.iter().map(|&n| n * cells).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fem::kernel::{EntityGeometry, kernel_fn};

    fn record(kind: IntegralType, subdomain: Option<usize>, tag: f64) -> IntegralRecord {
        IntegralRecord {
            kind,
            subdomain,
            kernel: Arc::new(kernel_fn(move |out, _, _, _| out[0] = tag)),
            enabled_coefficients: None,
        }
    }

    fn eval(i: &Integral) -> f64 {
        let mut out = [0.0];
        let geom = EntityGeometry {
            coordinates: &[],
            local_facet: None,
        };
        i.kernel().tabulate(&mut out, &[], &geom, None);
        out[0]
    }

    #[test]
    fn subdomain_lookup_falls_back_to_default() {
        let set = IntegralSet::from_records(
            [
                record(IntegralType::Cell, Some(3), 3.0),
                record(IntegralType::Cell, None, -1.0),
                record(IntegralType::Cell, Some(1), 1.0),
            ],
            0,
        )
        .unwrap();
        let subs: Vec<_> = set
            .integrals(IntegralType::Cell)
            .iter()
            .map(Integral::subdomain)
            .collect();
        assert_eq!(subs, vec![None, Some(1), Some(3)]);
        assert_eq!(eval(set.integral_for(IntegralType::Cell, Some(3)).unwrap()), 3.0);
        assert_eq!(eval(set.integral_for(IntegralType::Cell, Some(2)).unwrap()), -1.0);
        assert_eq!(eval(set.integral_for(IntegralType::Cell, None).unwrap()), -1.0);
        assert!(set.integral_for(IntegralType::Vertex, None).is_none());
    }

    #[test]
    fn no_default_means_unmarked_entities_are_skipped() {
        let set =
            IntegralSet::from_records([record(IntegralType::ExteriorFacet, Some(2), 2.0)], 0)
                .unwrap();
        assert!(set.integral_for(IntegralType::ExteriorFacet, None).is_none());
        assert!(set.integral_for(IntegralType::ExteriorFacet, Some(1)).is_none());
        assert!(set.integral_for(IntegralType::ExteriorFacet, Some(2)).is_some());
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = IntegralSet::from_records(
            [
                record(IntegralType::Cell, None, 0.0),
                record(IntegralType::Cell, None, 1.0),
            ],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, FemError::Configuration(_)));
    }

    #[test]
    fn masks_longer_than_the_coefficient_list_are_rejected() {
        let mut rec = record(IntegralType::Cell, None, 0.0);
        rec.enabled_coefficients = Some(vec![true, false]);
        assert!(IntegralSet::from_records([rec.clone()], 2).is_ok());
        assert!(IntegralSet::from_records([rec.clone()], 3).is_ok());
        assert!(matches!(
            IntegralSet::from_records([rec], 1),
            Err(FemError::Configuration(_))
        ));
    }

    #[test]
    fn block_size_per_kind() {
        let set = IntegralSet::from_records(
            [
                record(IntegralType::Cell, None, 0.0),
                record(IntegralType::InteriorFacet, None, 0.0),
            ],
            0,
        )
        .unwrap();
        assert_eq!(set.max_block_size(IntegralType::Cell, &[3, 4]), 12);
        assert_eq!(set.max_block_size(IntegralType::InteriorFacet, &[3, 4]), 48);
        assert_eq!(set.max_block_size(IntegralType::Vertex, &[3, 4]), 0);
        assert_eq!(set.max_block_size(IntegralType::Cell, &[]), 1);
        assert_eq!(
            set.kinds().collect::<Vec<_>>(),
            vec![IntegralType::Cell, IntegralType::InteriorFacet]
        );
    }
}
