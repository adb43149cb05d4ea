/*!
 * Graph Observers
 * Subscriber interface for property, event, and relationship changes
 */

pub mod metrics_collector;
pub mod page_signal;
pub mod process_priority;

pub use metrics_collector::{MetricsCollector, MetricsRecorder};
pub use page_signal::{LoadIdleState, PageSignalGenerator, PageSignalSink};
pub use process_priority::{ProcessHostSink, ProcessPriorityObserver};

use crate::core::clock::TickClock;
use crate::core::types::{CoordinationUnitId, Timestamp};
use crate::graph::events::Event;
use crate::graph::node::CoordinationUnit;
use crate::graph::properties::{PropertyKey, PropertyValue};
use crate::graph::registry::UnitRegistry;
use crate::graph::timers::{TimerHandle, TimerQueue};
use std::time::Duration;

/// Per-callback context handed to observers during dispatch
///
/// Exposes the virtual clock and timer arm/cancel; armed timers are tagged
/// with the arming observer so `on_timer_fired` routes back to it, and
/// with a unit id so teardown can sweep them.
pub struct ObserverCtx<'a> {
    clock: &'a TickClock,
    timers: &'a mut TimerQueue,
    observer_slot: usize,
}

impl<'a> ObserverCtx<'a> {
    pub(crate) fn new(clock: &'a TickClock, timers: &'a mut TimerQueue, observer_slot: usize) -> Self {
        Self {
            clock,
            timers,
            observer_slot,
        }
    }

    /// Current virtual time in nanoseconds
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Arm a single-shot timer associated with `unit`, firing after `delay`
    pub fn start_timer(&mut self, delay: Duration, unit: CoordinationUnitId) -> TimerHandle {
        self.timers
            .arm(self.clock.deadline_after(delay), self.observer_slot, unit)
    }

    /// Cancel a previously armed timer; idempotent
    pub fn cancel_timer(&mut self, handle: TimerHandle) {
        self.timers.cancel(handle);
    }
}

/// Subscriber reacting to changes on coordination units it elects to observe
///
/// `should_observe` is the per-dispatch type filter; every other hook has a
/// default no-op body so observers implement only what they need. All hooks
/// run synchronously on the graph's control sequence, in observer
/// registration order, against a snapshot of the observer list.
pub trait GraphObserver {
    /// Type filter: whether this observer wants callbacks for `unit`
    fn should_observe(&self, unit: &CoordinationUnit) -> bool;

    /// A unit finished construction and registration
    fn on_coordination_unit_created(
        &mut self,
        _registry: &UnitRegistry,
        _unit: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }

    /// A durable property changed value (or was force-rewritten)
    fn on_property_changed(
        &mut self,
        _registry: &UnitRegistry,
        _unit: CoordinationUnitId,
        _key: PropertyKey,
        _value: &PropertyValue,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }

    /// A durable property was removed
    fn on_property_cleared(
        &mut self,
        _registry: &UnitRegistry,
        _unit: CoordinationUnitId,
        _key: PropertyKey,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }

    /// A one-shot event was sent to the unit
    fn on_event_received(
        &mut self,
        _registry: &UnitRegistry,
        _unit: CoordinationUnitId,
        _event: Event,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }

    /// `child` was linked under `parent`; filtered on `parent`
    fn on_child_added(
        &mut self,
        _registry: &UnitRegistry,
        _parent: CoordinationUnitId,
        _child: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }

    /// `parent` was linked above `unit`; filtered on `unit`
    fn on_parent_added(
        &mut self,
        _registry: &UnitRegistry,
        _unit: CoordinationUnitId,
        _parent: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }

    /// `child` was unlinked from `parent`; filtered on `parent`
    fn on_child_removed(
        &mut self,
        _registry: &UnitRegistry,
        _parent: CoordinationUnitId,
        _child: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }

    /// `parent` was unlinked from above `unit`; filtered on `unit`
    fn on_parent_removed(
        &mut self,
        _registry: &UnitRegistry,
        _unit: CoordinationUnitId,
        _parent: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }

    /// The unit is about to be destroyed; its state is still readable.
    /// Observers must drop side-map entries and cancel timers here.
    fn on_before_destroyed(
        &mut self,
        _registry: &UnitRegistry,
        _unit: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }

    /// A timer this observer armed became due
    fn on_timer_fired(
        &mut self,
        _registry: &UnitRegistry,
        _unit: CoordinationUnitId,
        _handle: TimerHandle,
        _ctx: &mut ObserverCtx<'_>,
    ) {
    }
}
