/*!
 * Process Priority Observer
 * Derives per-process "can run at background OS priority" from its subtree
 */

use crate::core::types::{CoordinationUnitId, UnitType};
use crate::graph::frame;
use crate::graph::process;
use crate::graph::properties::{PropertyKey, PropertyValue};
use crate::graph::registry::UnitRegistry;
use crate::observers::{GraphObserver, ObserverCtx};
use ahash::AHashMap;
use log::debug;

/// External channel to the process host; receives priority flips only
pub trait ProcessHostSink {
    fn set_background_priority(&mut self, process: CoordinationUnitId, background: bool);
}

/// Observer recomputing, on every relevant change anywhere in a process's
/// subtree, whether that process may drop to background OS priority:
/// true iff no associated page is visible and no hosted frame is audible.
/// The result is pushed through the sink only when it actually flips;
/// processes start foreground.
pub struct ProcessPriorityObserver {
    background: AHashMap<CoordinationUnitId, bool>,
    sink: Box<dyn ProcessHostSink>,
}

impl ProcessPriorityObserver {
    pub fn new(sink: Box<dyn ProcessHostSink>) -> Self {
        Self {
            background: AHashMap::new(),
            sink,
        }
    }

    /// Last value pushed for a process, if any recompute has run
    pub fn is_background(&self, process: CoordinationUnitId) -> Option<bool> {
        self.background.get(&process).copied()
    }

    fn compute(registry: &UnitRegistry, process_id: CoordinationUnitId) -> bool {
        for page in process::pages_of_process(registry, process_id) {
            let visible = registry
                .unit(page)
                .and_then(|unit| unit.bool_property(PropertyKey::Visible));
            if visible == Some(true) {
                return false;
            }
        }
        for frame_id in process::frames_of_process(registry, process_id) {
            let audible = registry
                .unit(frame_id)
                .and_then(|unit| unit.bool_property(PropertyKey::Audible));
            if audible == Some(true) {
                return false;
            }
        }
        true
    }

    fn recompute(&mut self, registry: &UnitRegistry, process_id: CoordinationUnitId) {
        if !registry.contains(process_id) {
            return;
        }
        let background = Self::compute(registry, process_id);
        let previous = self.background.insert(process_id, background);
        // Processes start at foreground priority, so the very first
        // recompute only signals when it disagrees with that default.
        if previous.unwrap_or(false) != background {
            debug!(
                "Process {} background priority: {} -> {}",
                process_id,
                previous.unwrap_or(false),
                background
            );
            self.sink.set_background_priority(process_id, background);
        }
    }

    /// Processes whose derived priority may be affected by a change on
    /// `unit`
    fn affected_processes(
        registry: &UnitRegistry,
        unit: CoordinationUnitId,
    ) -> Vec<CoordinationUnitId> {
        match unit.unit_type {
            UnitType::Process => vec![unit],
            UnitType::Frame => frame::process_of_frame(registry, unit)
                .into_iter()
                .collect(),
            UnitType::Page => crate::graph::page::processes_of_page(registry, unit),
        }
    }
}

impl GraphObserver for ProcessPriorityObserver {
    fn should_observe(&self, _unit: &crate::graph::node::CoordinationUnit) -> bool {
        true
    }

    fn on_property_changed(
        &mut self,
        registry: &UnitRegistry,
        unit: CoordinationUnitId,
        key: PropertyKey,
        _value: &PropertyValue,
        _ctx: &mut ObserverCtx<'_>,
    ) {
        let relevant = matches!(
            (unit.unit_type, key),
            (UnitType::Page, PropertyKey::Visible) | (UnitType::Frame, PropertyKey::Audible)
        );
        if !relevant {
            return;
        }
        for process_id in Self::affected_processes(registry, unit) {
            self.recompute(registry, process_id);
        }
    }

    fn on_child_added(
        &mut self,
        registry: &UnitRegistry,
        parent: CoordinationUnitId,
        child: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
        // A new edge can pull a visible page or audible frame into a
        // process's subtree.
        for process_id in Self::affected_processes(registry, parent)
            .into_iter()
            .chain(Self::affected_processes(registry, child))
        {
            self.recompute(registry, process_id);
        }
    }

    fn on_child_removed(
        &mut self,
        registry: &UnitRegistry,
        parent: CoordinationUnitId,
        child: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
        for process_id in Self::affected_processes(registry, parent)
            .into_iter()
            .chain(Self::affected_processes(registry, child))
        {
            self.recompute(registry, process_id);
        }
    }

    fn on_before_destroyed(
        &mut self,
        _registry: &UnitRegistry,
        unit: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
        if unit.unit_type == UnitType::Process {
            self.background.remove(&unit);
        }
    }
}
