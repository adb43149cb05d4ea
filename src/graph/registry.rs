/*!
 * Unit Registry
 * Id-keyed storage for live coordination units with checked lookups
 */

use crate::core::types::{CoordinationUnitId, UnitType};
use crate::graph::node::CoordinationUnit;
use ahash::{AHashMap, AHashSet};

/// Process-wide registry of live coordination units
///
/// Lookups return `Option` rather than trusting raw references; an id
/// that is no longer registered is indistinguishable from one that never
/// existed, which is exactly the semantics teardown races need.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: AHashMap<CoordinationUnitId, CoordinationUnit>,
}

impl UnitRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, unit: CoordinationUnit) {
        self.units.insert(unit.id(), unit);
    }

    pub(crate) fn remove(&mut self, id: CoordinationUnitId) -> Option<CoordinationUnit> {
        self.units.remove(&id)
    }

    #[inline]
    pub fn contains(&self, id: CoordinationUnitId) -> bool {
        self.units.contains_key(&id)
    }

    #[inline]
    pub fn unit(&self, id: CoordinationUnitId) -> Option<&CoordinationUnit> {
        self.units.get(&id)
    }

    #[inline]
    pub(crate) fn unit_mut(&mut self, id: CoordinationUnitId) -> Option<&mut CoordinationUnit> {
        self.units.get_mut(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All live ids of one type, sorted by local id
    pub fn ids_of_type(&self, unit_type: UnitType) -> Vec<CoordinationUnitId> {
        let mut ids: Vec<_> = self
            .units
            .keys()
            .copied()
            .filter(|id| id.unit_type == unit_type)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Whether `candidate` is an ancestor of `id` (or `id` itself)
    ///
    /// Walks the generic parent sets breadth-first; the legal relationship
    /// shapes keep these chains short (frame trees plus one page/process
    /// hop), but the walk is bounded by a visited set regardless.
    pub fn has_ancestor(&self, id: CoordinationUnitId, candidate: CoordinationUnitId) -> bool {
        if id == candidate {
            return true;
        }
        let mut visited: AHashSet<CoordinationUnitId> = AHashSet::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(unit) = self.unit(current) else {
                continue;
            };
            for parent in unit.parents() {
                if *parent == candidate {
                    return true;
                }
                pending.push(*parent);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(ids: &[CoordinationUnitId]) -> UnitRegistry {
        let mut registry = UnitRegistry::new();
        for id in ids {
            registry.insert(CoordinationUnit::new(*id));
        }
        registry
    }

    fn link(registry: &mut UnitRegistry, parent: CoordinationUnitId, child: CoordinationUnitId) {
        registry.unit_mut(parent).unwrap().link_child(child);
        registry.unit_mut(child).unwrap().link_parent(parent);
    }

    #[test]
    fn test_checked_lookup() {
        let registry = registry_with(&[CoordinationUnitId::page(1)]);
        assert!(registry.contains(CoordinationUnitId::page(1)));
        assert!(registry.unit(CoordinationUnitId::page(2)).is_none());
    }

    #[test]
    fn test_has_ancestor_walks_chain() {
        let f1 = CoordinationUnitId::frame(1);
        let f2 = CoordinationUnitId::frame(2);
        let f3 = CoordinationUnitId::frame(3);
        let mut registry = registry_with(&[f1, f2, f3]);
        link(&mut registry, f1, f2);
        link(&mut registry, f2, f3);

        assert!(registry.has_ancestor(f3, f1));
        assert!(registry.has_ancestor(f3, f3));
        assert!(!registry.has_ancestor(f1, f3));
    }

    #[test]
    fn test_has_ancestor_crosses_unit_types() {
        let page = CoordinationUnitId::page(1);
        let frame = CoordinationUnitId::frame(1);
        let mut registry = registry_with(&[page, frame]);
        link(&mut registry, page, frame);

        assert!(registry.has_ancestor(frame, page));
        assert!(!registry.has_ancestor(page, frame));
    }

    #[test]
    fn test_ids_of_type_sorted() {
        let registry = registry_with(&[
            CoordinationUnitId::frame(3),
            CoordinationUnitId::page(1),
            CoordinationUnitId::frame(1),
        ]);
        assert_eq!(
            registry.ids_of_type(UnitType::Frame),
            vec![CoordinationUnitId::frame(1), CoordinationUnitId::frame(3)]
        );
    }
}
