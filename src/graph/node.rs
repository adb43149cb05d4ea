/*!
 * Coordination Unit
 * A node in the resource graph: identity, properties, relationship sets
 */

use crate::core::types::{CoordinationUnitId, UnitType};
use crate::graph::properties::{PropertyKey, PropertyStore, PropertyValue};
use ahash::AHashSet;
use std::time::Duration;

/// A single node of the coordination graph
///
/// Relationships are held as generic parent/child id sets; the typed
/// accessors (`parent_frame`, `page`, `process`) filter those sets by unit
/// type, so a frame's "at most one page parent" invariant is visible as
/// "at most one `Page`-typed id in `parents`". The manager enforces that
/// invariant on every edge add.
#[derive(Debug)]
pub struct CoordinationUnit {
    id: CoordinationUnitId,
    properties: PropertyStore,
    parents: AHashSet<CoordinationUnitId>,
    children: AHashSet<CoordinationUnitId>,
}

impl CoordinationUnit {
    pub fn new(id: CoordinationUnitId) -> Self {
        Self {
            id,
            properties: PropertyStore::new(),
            parents: AHashSet::new(),
            children: AHashSet::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> CoordinationUnitId {
        self.id
    }

    #[inline]
    pub fn unit_type(&self) -> UnitType {
        self.id.unit_type
    }

    #[inline]
    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    #[inline]
    pub(crate) fn properties_mut(&mut self) -> &mut PropertyStore {
        &mut self.properties
    }

    /// Raw property access; absent means unknown
    #[inline]
    pub fn property(&self, key: PropertyKey) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Boolean property, `None` when unset or of another shape
    #[inline]
    pub fn bool_property(&self, key: PropertyKey) -> Option<bool> {
        self.property(key).and_then(PropertyValue::as_bool)
    }

    /// Integer property, `None` when unset or of another shape
    #[inline]
    pub fn int_property(&self, key: PropertyKey) -> Option<i64> {
        self.property(key).and_then(PropertyValue::as_int)
    }

    /// Duration property, `None` when unset or of another shape
    #[inline]
    pub fn duration_property(&self, key: PropertyKey) -> Option<Duration> {
        self.property(key).and_then(PropertyValue::as_duration)
    }

    #[inline]
    pub fn parents(&self) -> &AHashSet<CoordinationUnitId> {
        &self.parents
    }

    #[inline]
    pub fn children(&self) -> &AHashSet<CoordinationUnitId> {
        &self.children
    }

    /// Parent ids of the given type, unordered
    pub fn parents_of_type(
        &self,
        unit_type: UnitType,
    ) -> impl Iterator<Item = CoordinationUnitId> + '_ {
        self.parents
            .iter()
            .copied()
            .filter(move |id| id.unit_type == unit_type)
    }

    /// Child ids of the given type, sorted by local id for deterministic
    /// walk and dispatch order
    pub fn children_of_type(&self, unit_type: UnitType) -> Vec<CoordinationUnitId> {
        let mut ids: Vec<_> = self
            .children
            .iter()
            .copied()
            .filter(|id| id.unit_type == unit_type)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The single parent of the given type, if linked
    #[inline]
    pub fn single_parent_of_type(&self, unit_type: UnitType) -> Option<CoordinationUnitId> {
        self.parents_of_type(unit_type).next()
    }

    pub(crate) fn link_child(&mut self, child: CoordinationUnitId) {
        self.children.insert(child);
    }

    pub(crate) fn link_parent(&mut self, parent: CoordinationUnitId) {
        self.parents.insert(parent);
    }

    pub(crate) fn unlink_child(&mut self, child: CoordinationUnitId) -> bool {
        self.children.remove(&child)
    }

    pub(crate) fn unlink_parent(&mut self, parent: CoordinationUnitId) -> bool {
        self.parents.remove(&parent)
    }
}
