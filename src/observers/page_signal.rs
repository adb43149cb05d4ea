/*!
 * Page Signal Generator
 * Per-page load-idle state machine driving the "page almost idle" signal
 */

use crate::core::types::{CoordinationUnitId, UnitType};
use crate::graph::events::Event;
use crate::graph::page;
use crate::graph::properties::{PropertyKey, PropertyValue};
use crate::graph::registry::UnitRegistry;
use crate::graph::timers::TimerHandle;
use crate::observers::{GraphObserver, ObserverCtx};
use ahash::AHashMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long the idling predicate must hold continuously before a page is
/// considered loaded-and-idle
pub const LOADED_AND_IDLING_TIMEOUT: Duration = Duration::from_secs(1);

/// Derived load-idle state of a page
///
/// Linear with one fork: `LoadedNotIdling` and `LoadedAndIdling` toggle
/// freely until the debounce window elapses; `LoadedAndIdle` is terminal
/// until the next main-frame navigation commit resets the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadIdleState {
    LoadingNotStarted,
    Loading,
    LoadedNotIdling,
    LoadedAndIdling,
    LoadedAndIdle,
}

/// Downstream consumer of per-page load-state signals
pub trait PageSignalSink {
    /// The page's load-idle state changed
    fn on_load_idle_state_changed(&mut self, page: CoordinationUnitId, state: LoadIdleState);

    /// The page finished loading and stayed quiescent for the full
    /// debounce window; safe to background
    fn on_page_almost_idle(&mut self, page: CoordinationUnitId);
}

#[derive(Debug)]
struct PageState {
    state: LoadIdleState,
    idling_timer: Option<TimerHandle>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            state: LoadIdleState::LoadingNotStarted,
            idling_timer: None,
        }
    }
}

/// Observer deriving each page's load-idle state from its main frame's
/// quiescence properties plus the page's own loading flag
pub struct PageSignalGenerator {
    pages: AHashMap<CoordinationUnitId, PageState>,
    sink: Box<dyn PageSignalSink>,
}

impl PageSignalGenerator {
    pub fn new(sink: Box<dyn PageSignalSink>) -> Self {
        Self {
            pages: AHashMap::new(),
            sink,
        }
    }

    /// Current state of a page, if it is being tracked
    pub fn load_idle_state(&self, page: CoordinationUnitId) -> Option<LoadIdleState> {
        self.pages.get(&page).map(|entry| entry.state)
    }

    /// Idling predicate: the page's main frame reports both low main-thread
    /// task load and an almost-idle network. A page with no frames is never
    /// idling; non-main-frame signals are ignored.
    fn page_is_idling(registry: &UnitRegistry, page: CoordinationUnitId) -> bool {
        let Some(main_frame) = page::main_frame_of(registry, page) else {
            return false;
        };
        let Some(unit) = registry.unit(main_frame) else {
            return false;
        };
        unit.bool_property(PropertyKey::MainThreadTaskLoadIsLow) == Some(true)
            && unit.bool_property(PropertyKey::NetworkAlmostIdle) == Some(true)
    }

    fn transition(&mut self, page: CoordinationUnitId, next: LoadIdleState) {
        let entry = self.pages.entry(page).or_default();
        if entry.state == next {
            return;
        }
        debug!("Page {} load-idle: {:?} -> {:?}", page, entry.state, next);
        entry.state = next;
        self.sink.on_load_idle_state_changed(page, next);
        if next == LoadIdleState::LoadedAndIdle {
            self.sink.on_page_almost_idle(page);
        }
    }

    fn enter_idling(
        &mut self,
        page: CoordinationUnitId,
        ctx: &mut ObserverCtx<'_>,
    ) {
        let handle = ctx.start_timer(LOADED_AND_IDLING_TIMEOUT, page);
        self.pages.entry(page).or_default().idling_timer = Some(handle);
        self.transition(page, LoadIdleState::LoadedAndIdling);
    }

    fn cancel_pending_timer(&mut self, page: CoordinationUnitId, ctx: &mut ObserverCtx<'_>) {
        if let Some(handle) = self
            .pages
            .get_mut(&page)
            .and_then(|entry| entry.idling_timer.take())
        {
            ctx.cancel_timer(handle);
        }
    }

    /// Re-evaluate the idling predicate for a page in a loaded state
    fn update_idling(
        &mut self,
        registry: &UnitRegistry,
        page: CoordinationUnitId,
        ctx: &mut ObserverCtx<'_>,
    ) {
        let state = self
            .pages
            .get(&page)
            .map(|entry| entry.state)
            .unwrap_or(LoadIdleState::LoadingNotStarted);
        let idling = Self::page_is_idling(registry, page);
        match state {
            LoadIdleState::LoadedNotIdling if idling => self.enter_idling(page, ctx),
            LoadIdleState::LoadedAndIdling if !idling => {
                self.cancel_pending_timer(page, ctx);
                self.transition(page, LoadIdleState::LoadedNotIdling);
            }
            // Loading states wait for the loading flag; LoadedAndIdle is
            // terminal until navigation resets it.
            _ => {}
        }
    }

    fn on_loading_changed(
        &mut self,
        registry: &UnitRegistry,
        page: CoordinationUnitId,
        loading: bool,
        ctx: &mut ObserverCtx<'_>,
    ) {
        let state = self
            .pages
            .get(&page)
            .map(|entry| entry.state)
            .unwrap_or(LoadIdleState::LoadingNotStarted);
        if loading {
            if state == LoadIdleState::LoadingNotStarted {
                self.transition(page, LoadIdleState::Loading);
            }
        } else if state == LoadIdleState::Loading {
            if Self::page_is_idling(registry, page) {
                self.enter_idling(page, ctx);
            } else {
                self.transition(page, LoadIdleState::LoadedNotIdling);
            }
        }
    }

    fn reset_for_navigation(&mut self, page: CoordinationUnitId, ctx: &mut ObserverCtx<'_>) {
        self.cancel_pending_timer(page, ctx);
        self.transition(page, LoadIdleState::LoadingNotStarted);
    }
}

impl GraphObserver for PageSignalGenerator {
    fn should_observe(&self, unit: &crate::graph::node::CoordinationUnit) -> bool {
        matches!(unit.unit_type(), UnitType::Page | UnitType::Frame)
    }

    fn on_coordination_unit_created(
        &mut self,
        _registry: &UnitRegistry,
        unit: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
        if unit.unit_type == UnitType::Page {
            self.pages.entry(unit).or_default();
        }
    }

    fn on_property_changed(
        &mut self,
        registry: &UnitRegistry,
        unit: CoordinationUnitId,
        key: PropertyKey,
        value: &PropertyValue,
        ctx: &mut ObserverCtx<'_>,
    ) {
        match (unit.unit_type, key) {
            (UnitType::Page, PropertyKey::IsLoading) => {
                if let Some(loading) = value.as_bool() {
                    self.on_loading_changed(registry, unit, loading, ctx);
                }
            }
            (
                UnitType::Frame,
                PropertyKey::NetworkAlmostIdle | PropertyKey::MainThreadTaskLoadIsLow,
            ) => {
                // Only the main frame's quiescence feeds the machine.
                if !crate::graph::frame::is_main_frame(registry, unit) {
                    return;
                }
                if let Some(page) = crate::graph::frame::page_of_frame(registry, unit) {
                    self.update_idling(registry, page, ctx);
                }
            }
            _ => {}
        }
    }

    fn on_event_received(
        &mut self,
        _registry: &UnitRegistry,
        unit: CoordinationUnitId,
        event: Event,
        ctx: &mut ObserverCtx<'_>,
    ) {
        if event == Event::MainFrameNavigationCommitted && unit.unit_type == UnitType::Page {
            self.reset_for_navigation(unit, ctx);
        }
    }

    fn on_child_added(
        &mut self,
        registry: &UnitRegistry,
        parent: CoordinationUnitId,
        _child: CoordinationUnitId,
        ctx: &mut ObserverCtx<'_>,
    ) {
        if parent.unit_type == UnitType::Page {
            self.update_idling(registry, parent, ctx);
        }
    }

    fn on_child_removed(
        &mut self,
        registry: &UnitRegistry,
        parent: CoordinationUnitId,
        _child: CoordinationUnitId,
        ctx: &mut ObserverCtx<'_>,
    ) {
        if parent.unit_type == UnitType::Page {
            self.update_idling(registry, parent, ctx);
        }
    }

    fn on_before_destroyed(
        &mut self,
        _registry: &UnitRegistry,
        unit: CoordinationUnitId,
        ctx: &mut ObserverCtx<'_>,
    ) {
        if unit.unit_type == UnitType::Page {
            self.cancel_pending_timer(unit, ctx);
            self.pages.remove(&unit);
        }
    }

    fn on_timer_fired(
        &mut self,
        _registry: &UnitRegistry,
        unit: CoordinationUnitId,
        handle: TimerHandle,
        _ctx: &mut ObserverCtx<'_>,
    ) {
        let Some(entry) = self.pages.get_mut(&unit) else {
            return;
        };
        if entry.idling_timer != Some(handle) {
            return;
        }
        entry.idling_timer = None;
        if entry.state == LoadIdleState::LoadedAndIdling {
            self.transition(unit, LoadIdleState::LoadedAndIdle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_loading_not_started() {
        assert_eq!(PageState::default().state, LoadIdleState::LoadingNotStarted);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&LoadIdleState::LoadedAndIdle).unwrap();
        assert_eq!(json, "\"loaded_and_idle\"");
    }
}
