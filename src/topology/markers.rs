//! Subdomain markers for mesh entities of one topological dimension.
//!
//! A `DomainMarkers` maps `PointId` → integer subdomain tag. Forms hold
//! markers as shared, read-only handles ([`MarkerRef`]); an unset handle
//! means "integrate uniformly, no subdomain distinction".

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::topology::point::PointId;

/// Shared marker handle as stored on a form. `None` is the "no markers" sentinel.
pub type MarkerRef = Option<Arc<DomainMarkers>>;

/// Integer subdomain tags for entities of dimension `dim`.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DomainMarkers {
    dim: usize,
    values: HashMap<PointId, usize>,
}

impl DomainMarkers {
    /// Creates an empty marker map for entities of topological dimension `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            values: HashMap::new(),
        }
    }

    /// Builds markers from `(entity, marker)` pairs. Later pairs overwrite earlier ones.
    pub fn from_pairs<I>(dim: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (PointId, usize)>,
    {
        Self {
            dim,
            values: pairs.into_iter().collect(),
        }
    }

    /// Topological dimension of the marked entities.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Assigns `marker` to `entity`, returning the previous value, if any.
    pub fn set(&mut self, entity: PointId, marker: usize) -> Option<usize> {
        self.values.insert(entity, marker)
    }

    /// Marker of `entity`, or `None` if the entity is unmarked.
    #[inline]
    pub fn get(&self, entity: PointId) -> Option<usize> {
        self.values.get(&entity).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Distinct marker values, sorted ascending.
    pub fn markers(&self) -> Vec<usize> {
        self.values
            .values()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// All entities tagged with `marker`, in deterministic order.
    pub fn entities_with(&self, marker: usize) -> Vec<PointId> {
        let mut points: Vec<_> = self
            .values
            .iter()
            .filter_map(|(&p, &m)| (m == marker).then_some(p))
            .collect();
        points.sort_unstable();
        points
    }

    /// Iterate over `(entity, marker)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, usize)> + '_ {
        self.values.iter().map(|(&p, &m)| (p, m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(i: u64) -> PointId {
        PointId::new(i).unwrap()
    }

    #[test]
    fn strata_are_sorted() {
        let mut m = DomainMarkers::new(2);
        m.set(pid(5), 1);
        m.set(pid(2), 1);
        m.set(pid(3), 7);
        assert_eq!(m.markers(), vec![1, 7]);
        assert_eq!(m.entities_with(1), vec![pid(2), pid(5)]);
        assert!(m.entities_with(4).is_empty());
        assert_eq!(m.dim(), 2);
    }

    #[test]
    fn set_returns_previous() {
        let mut m = DomainMarkers::new(1);
        assert_eq!(m.set(pid(1), 3), None);
        assert_eq!(m.set(pid(1), 4), Some(3));
        assert_eq!(m.get(pid(1)), Some(4));
        assert_eq!(m.get(pid(2)), None);
    }
}
