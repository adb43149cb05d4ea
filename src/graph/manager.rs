/*!
 * Coordination Unit Manager
 * Owns the registry, observer list, clock, and timers; routes all mutation
 */

use crate::core::clock::TickClock;
use crate::core::errors::GraphError;
use crate::core::types::{CoordinationUnitId, GraphResult, Timestamp, UnitType};
use crate::graph::events::Event;
use crate::graph::node::CoordinationUnit;
use crate::graph::process;
use crate::graph::properties::{PropertyKey, PropertyValue, WriteOutcome};
use crate::graph::registry::UnitRegistry;
use crate::graph::timers::TimerQueue;
use crate::graph::page;
use crate::observers::{GraphObserver, ObserverCtx};
use log::{debug, error, info};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Shared handle to a registered observer
///
/// Registration holds an `Rc` so tests and embedders can keep their own
/// handle to inspect observer state; the `RefCell` is safe because the
/// whole graph runs on one control sequence and dispatch never borrows the
/// same observer re-entrantly (propagation recursion completes each inner
/// dispatch before the outer one starts).
pub type ObserverHandle = Rc<RefCell<dyn GraphObserver>>;

/// The coordination graph: one instance per process lifetime
///
/// All property writes, events, relationship changes, and unit lifecycle
/// flow through this type on a single control sequence. Observer callbacks
/// run synchronously before the triggering call returns; propagation
/// chains (process CPU change → page CPU recompute → page observers) are
/// processed depth-first to completion.
pub struct CoordinationUnitManager {
    registry: UnitRegistry,
    observers: Vec<ObserverHandle>,
    timers: TimerQueue,
    clock: TickClock,
}

impl CoordinationUnitManager {
    pub fn new() -> Self {
        info!("Coordination unit manager initialized");
        Self {
            registry: UnitRegistry::new(),
            observers: Vec::new(),
            timers: TimerQueue::new(),
            clock: TickClock::new(),
        }
    }

    /// Register an observer; first registered is first notified for every
    /// future dispatch, including unit creation
    pub fn register_observer(&mut self, observer: ObserverHandle) {
        debug!("Graph observer registered (slot {})", self.observers.len());
        self.observers.push(observer);
    }

    #[inline]
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    #[inline]
    pub fn unit(&self, id: CoordinationUnitId) -> Option<&CoordinationUnit> {
        self.registry.unit(id)
    }

    #[inline]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ---- Unit lifecycle ----------------------------------------------

    /// Create and register a unit, then notify observers of creation
    pub fn create_coordination_unit(&mut self, id: CoordinationUnitId) -> GraphResult<()> {
        if self.registry.contains(id) {
            error!("Refusing to create duplicate coordination unit {}", id);
            return Err(GraphError::DuplicateUnit(id));
        }
        self.registry.insert(CoordinationUnit::new(id));
        debug!("Coordination unit {} created", id);
        self.dispatch(id, |observer, registry, ctx| {
            observer.on_coordination_unit_created(registry, id, ctx);
        });
        Ok(())
    }

    /// Destroy a unit: notify observers, sweep its timers, unlink every
    /// relationship symmetrically (telling each peer's observers), then
    /// deregister. Returns false when the unit is already gone.
    pub fn destroy_coordination_unit(&mut self, id: CoordinationUnitId) -> bool {
        if !self.registry.contains(id) {
            debug!("Ignoring destroy for unknown unit {}", id);
            return false;
        }
        self.dispatch(id, |observer, registry, ctx| {
            observer.on_before_destroyed(registry, id, ctx);
        });
        // Observers must cancel their own timers above; this sweep is the
        // backstop that keeps a pending debounce from firing into state
        // that no longer exists.
        let stale = self.timers.cancel_for_unit(id);
        if stale > 0 {
            debug!("Swept {} stale timers for destroyed unit {}", stale, id);
        }

        let parents: Vec<CoordinationUnitId> = self
            .registry
            .unit(id)
            .map(|unit| unit.parents().iter().copied().collect())
            .unwrap_or_default();
        for parent in parents {
            if let Some(parent_unit) = self.registry.unit_mut(parent) {
                parent_unit.unlink_child(id);
            }
            if let Some(unit) = self.registry.unit_mut(id) {
                unit.unlink_parent(parent);
            }
            self.dispatch(parent, |observer, registry, ctx| {
                observer.on_child_removed(registry, parent, id, ctx);
            });
        }

        let children: Vec<CoordinationUnitId> = self
            .registry
            .unit(id)
            .map(|unit| unit.children().iter().copied().collect())
            .unwrap_or_default();
        for child in children {
            if let Some(unit) = self.registry.unit_mut(id) {
                unit.unlink_child(child);
            }
            if let Some(child_unit) = self.registry.unit_mut(child) {
                child_unit.unlink_parent(id);
            }
            self.dispatch(child, |observer, registry, ctx| {
                observer.on_parent_removed(registry, child, id, ctx);
            });
        }

        self.registry.remove(id);
        debug!("Coordination unit {} destroyed", id);
        true
    }

    // ---- Relationships -----------------------------------------------

    /// Link `child` under `parent`
    ///
    /// Silent no-op (`Ok(false)`) when either id is no longer live or the
    /// edge already exists; refuses edges that violate the legal shapes,
    /// a frame's single-parent exclusivity, or the no-cycle invariant.
    pub fn add_child(
        &mut self,
        parent: CoordinationUnitId,
        child: CoordinationUnitId,
    ) -> GraphResult<bool> {
        if !self.registry.contains(parent) || !self.registry.contains(child) {
            debug!("Ignoring add_child {} -> {}: unit gone", parent, child);
            return Ok(false);
        }
        if child.unit_type != UnitType::Frame {
            let err = GraphError::InvalidRelationship {
                detail: format!(
                    "{:?} cannot be a child of {:?}",
                    child.unit_type, parent.unit_type
                )
                .into(),
            };
            error!("Refusing edge {} -> {}: {}", parent, child, err);
            return Err(err);
        }
        if self
            .registry
            .unit(parent)
            .is_some_and(|unit| unit.children().contains(&child))
        {
            return Ok(false);
        }
        if self
            .registry
            .unit(child)
            .and_then(|unit| unit.single_parent_of_type(parent.unit_type))
            .is_some()
        {
            let err = GraphError::InvalidRelationship {
                detail: format!("frame already has a {:?} parent", parent.unit_type).into(),
            };
            error!("Refusing edge {} -> {}: {}", parent, child, err);
            return Err(err);
        }
        if self.registry.has_ancestor(parent, child) {
            let err = GraphError::WouldCreateCycle { parent, child };
            error!("{}", err);
            return Err(err);
        }

        // Both endpoints are updated before any observer runs, so no
        // intermediate state is observable.
        if let Some(parent_unit) = self.registry.unit_mut(parent) {
            parent_unit.link_child(child);
        }
        if let Some(child_unit) = self.registry.unit_mut(child) {
            child_unit.link_parent(parent);
        }
        debug!("Edge added: {} -> {}", parent, child);
        self.dispatch(parent, |observer, registry, ctx| {
            observer.on_child_added(registry, parent, child, ctx);
        });
        self.dispatch(child, |observer, registry, ctx| {
            observer.on_parent_added(registry, child, parent, ctx);
        });
        Ok(true)
    }

    /// Unlink `child` from `parent`; false when the edge did not exist
    pub fn remove_child(
        &mut self,
        parent: CoordinationUnitId,
        child: CoordinationUnitId,
    ) -> bool {
        let linked = self
            .registry
            .unit(parent)
            .is_some_and(|unit| unit.children().contains(&child));
        if !linked {
            debug!("Ignoring remove_child {} -> {}: no edge", parent, child);
            return false;
        }
        if let Some(parent_unit) = self.registry.unit_mut(parent) {
            parent_unit.unlink_child(child);
        }
        if let Some(child_unit) = self.registry.unit_mut(child) {
            child_unit.unlink_parent(parent);
        }
        debug!("Edge removed: {} -> {}", parent, child);
        self.dispatch(parent, |observer, registry, ctx| {
            observer.on_child_removed(registry, parent, child, ctx);
        });
        self.dispatch(child, |observer, registry, ctx| {
            observer.on_parent_removed(registry, child, parent, ctx);
        });
        true
    }

    // ---- Properties and events ---------------------------------------

    /// Store a property; equal-value writes are suppressed and notify
    /// nobody. Returns `Ok(false)` for suppressed writes and for units
    /// that are already gone.
    pub fn set_property(
        &mut self,
        id: CoordinationUnitId,
        key: PropertyKey,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<bool> {
        self.write_property(id, key, value.into(), false)
    }

    /// Store a property unconditionally, re-notifying observers even when
    /// the value is unchanged; the escape hatch for forced re-triggers
    pub fn force_set_property(
        &mut self,
        id: CoordinationUnitId,
        key: PropertyKey,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<bool> {
        self.write_property(id, key, value.into(), true)
    }

    fn write_property(
        &mut self,
        id: CoordinationUnitId,
        key: PropertyKey,
        value: PropertyValue,
        force: bool,
    ) -> GraphResult<bool> {
        if !key.applies_to(id.unit_type) {
            let err = GraphError::PropertyNotApplicable {
                key,
                unit_type: id.unit_type,
            };
            error!("Refusing property write on {}: {}", id, err);
            return Err(err);
        }
        if value.shape() != key.shape() {
            let err = GraphError::PropertyShape {
                key,
                expected: key.shape(),
                actual: value.shape(),
            };
            error!("Refusing property write on {}: {}", id, err);
            return Err(err);
        }
        let Some(unit) = self.registry.unit_mut(id) else {
            debug!("Ignoring property write on unknown unit {}", id);
            return Ok(false);
        };
        let outcome = if force {
            unit.properties_mut().set_forced(key, value.clone())
        } else {
            unit.properties_mut().set(key, value.clone())
        };
        if outcome == WriteOutcome::Unchanged {
            return Ok(false);
        }
        self.propagate_property(id, key, force);
        self.dispatch(id, |observer, registry, ctx| {
            observer.on_property_changed(registry, id, key, &value, ctx);
        });
        Ok(true)
    }

    /// Remove a property; carries the same propagation and notification
    /// semantics as a change, so derived page values are recomputed (or
    /// cleared in turn) before the clear is dispatched
    pub fn clear_property(&mut self, id: CoordinationUnitId, key: PropertyKey) -> bool {
        let Some(unit) = self.registry.unit_mut(id) else {
            debug!("Ignoring property clear on unknown unit {}", id);
            return false;
        };
        if !unit.properties_mut().clear(key) {
            return false;
        }
        self.propagate_clear(id, key);
        self.dispatch(id, |observer, registry, ctx| {
            observer.on_property_cleared(registry, id, key, ctx);
        });
        true
    }

    /// Dispatch a one-shot event to the unit's observers; never stored
    pub fn send_event(&mut self, id: CoordinationUnitId, event: Event) -> GraphResult<bool> {
        if !event.applies_to(id.unit_type) {
            let err = GraphError::EventNotApplicable {
                event,
                unit_type: id.unit_type,
            };
            error!("Refusing event on {}: {}", id, err);
            return Err(err);
        }
        if !self.registry.contains(id) {
            debug!("Ignoring event {:?} for unknown unit {}", event, id);
            return Ok(false);
        }
        self.dispatch(id, |observer, registry, ctx| {
            observer.on_event_received(registry, id, event, ctx);
        });
        Ok(true)
    }

    // ---- Typed convenience setters -----------------------------------

    pub fn set_visibility(&mut self, page: CoordinationUnitId, visible: bool) -> GraphResult<bool> {
        self.set_property(page, PropertyKey::Visible, visible)
    }

    pub fn set_is_loading(&mut self, page: CoordinationUnitId, loading: bool) -> GraphResult<bool> {
        self.set_property(page, PropertyKey::IsLoading, loading)
    }

    pub fn set_ukm_source_id(&mut self, page: CoordinationUnitId, id: i64) -> GraphResult<bool> {
        self.set_property(page, PropertyKey::UkmSourceId, id)
    }

    pub fn set_audibility(&mut self, frame: CoordinationUnitId, audible: bool) -> GraphResult<bool> {
        self.set_property(frame, PropertyKey::Audible, audible)
    }

    pub fn set_network_almost_idle(
        &mut self,
        frame: CoordinationUnitId,
        idle: bool,
    ) -> GraphResult<bool> {
        self.set_property(frame, PropertyKey::NetworkAlmostIdle, idle)
    }

    pub fn set_main_thread_task_load_is_low(
        &mut self,
        unit: CoordinationUnitId,
        low: bool,
    ) -> GraphResult<bool> {
        self.set_property(unit, PropertyKey::MainThreadTaskLoadIsLow, low)
    }

    pub fn set_cpu_usage(&mut self, process: CoordinationUnitId, usage: i64) -> GraphResult<bool> {
        self.set_property(process, PropertyKey::CpuUsage, usage)
    }

    pub fn set_expected_task_queueing_duration(
        &mut self,
        process: CoordinationUnitId,
        eqt: Duration,
    ) -> GraphResult<bool> {
        // EQT is a periodic measurement: the interesting signal is "a new
        // sample arrived", so repeated equal samples still notify.
        self.force_set_property(process, PropertyKey::ExpectedTaskQueueingDuration, eqt)
    }

    // ---- Time --------------------------------------------------------

    /// Advance virtual time and fire every timer that becomes due, in
    /// deadline order; timers armed by fired callbacks are honored within
    /// the same call when already due
    pub fn advance_clock(&mut self, delta: Duration) {
        self.clock.advance(delta);
        let now = self.clock.now();
        loop {
            let due = self.timers.pop_due(now);
            if due.is_empty() {
                break;
            }
            for timer in due {
                let Some(observer) = self.observers.get(timer.observer_slot).cloned() else {
                    continue;
                };
                if !self.registry.contains(timer.unit) {
                    // Should be unreachable: destruction sweeps unit timers.
                    debug!("Dropping timer for destroyed unit {}", timer.unit);
                    continue;
                }
                let mut ctx = ObserverCtx::new(&self.clock, &mut self.timers, timer.observer_slot);
                observer
                    .borrow_mut()
                    .on_timer_fired(&self.registry, timer.unit, timer.handle, &mut ctx);
            }
        }
    }

    // ---- Internals ---------------------------------------------------

    /// Derived-property propagation, run before observer dispatch so the
    /// chain completes depth-first: the propagated write on the peer unit
    /// recurses through `write_property` and notifies that unit's
    /// observers before the originating unit's observers run.
    fn propagate_property(&mut self, id: CoordinationUnitId, key: PropertyKey, force: bool) {
        match (id.unit_type, key) {
            (UnitType::Process, PropertyKey::CpuUsage) => {
                for page_id in process::pages_of_process(&self.registry, id) {
                    let Some(total) = page::aggregate_cpu_usage(&self.registry, page_id) else {
                        continue;
                    };
                    if let Err(err) =
                        self.write_property(page_id, PropertyKey::CpuUsage, total.into(), force)
                    {
                        error!("CPU propagation to {} failed: {}", page_id, err);
                    }
                }
            }
            (UnitType::Process, PropertyKey::ExpectedTaskQueueingDuration) => {
                let Some(eqt) = self
                    .registry
                    .unit(id)
                    .and_then(|unit| unit.duration_property(key))
                else {
                    return;
                };
                for page_id in process::pages_via_main_frames(&self.registry, id) {
                    if let Err(err) = self.write_property(page_id, key, eqt.into(), force) {
                        error!("EQT propagation to {} failed: {}", page_id, err);
                    }
                }
            }
            _ => {}
        }
    }

    /// Clear-side counterpart of `propagate_property`: a cleared source
    /// value recomputes each derived page value from the processes still
    /// reporting, and clears it where none remain
    fn propagate_clear(&mut self, id: CoordinationUnitId, key: PropertyKey) {
        match (id.unit_type, key) {
            (UnitType::Process, PropertyKey::CpuUsage) => {
                for page_id in process::pages_of_process(&self.registry, id) {
                    match page::aggregate_cpu_usage(&self.registry, page_id) {
                        Some(total) => {
                            if let Err(err) = self.write_property(
                                page_id,
                                PropertyKey::CpuUsage,
                                total.into(),
                                false,
                            ) {
                                error!("CPU propagation to {} failed: {}", page_id, err);
                            }
                        }
                        None => {
                            self.clear_property(page_id, PropertyKey::CpuUsage);
                        }
                    }
                }
            }
            (UnitType::Process, PropertyKey::ExpectedTaskQueueingDuration) => {
                for page_id in process::pages_via_main_frames(&self.registry, id) {
                    self.clear_property(page_id, key);
                }
            }
            _ => {}
        }
    }

    /// Notify observers interested in `target`, against a snapshot of the
    /// observer list so registrations during dispatch take effect only for
    /// later dispatches
    fn dispatch<F>(&mut self, target: CoordinationUnitId, mut callback: F)
    where
        F: FnMut(&mut dyn GraphObserver, &UnitRegistry, &mut ObserverCtx<'_>),
    {
        let snapshot: Vec<(usize, ObserverHandle)> =
            self.observers.iter().cloned().enumerate().collect();
        for (slot, observer) in snapshot {
            let Some(unit) = self.registry.unit(target) else {
                return;
            };
            if !observer.borrow().should_observe(unit) {
                continue;
            }
            let mut ctx = ObserverCtx::new(&self.clock, &mut self.timers, slot);
            callback(&mut *observer.borrow_mut(), &self.registry, &mut ctx);
        }
    }
}

impl Default for CoordinationUnitManager {
    fn default() -> Self {
        Self::new()
    }
}
