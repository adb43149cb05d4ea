/*!
 * Metrics Collector
 * Backgrounded-tab heuristics metrics and EQT responsiveness reporting
 */

use crate::core::types::{CoordinationUnitId, Timestamp, UnitType};
use crate::graph::events::Event;
use crate::graph::frame;
use crate::graph::properties::{PropertyKey, PropertyValue};
use crate::graph::registry::UnitRegistry;
use crate::observers::{GraphObserver, ObserverCtx};
use ahash::AHashMap;
use log::debug;
use std::time::Duration;

/// Grace window after a main-frame navigation commit during which no
/// backgrounded-tab metric is recorded
pub const METRICS_REPORT_DELAY: Duration = Duration::from_secs(5 * 60);

/// A page is "recently audible" until this much silence has elapsed; a new
/// audio start within the window is not a fresh event
pub const MAX_AUDIO_SLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Report the page EQT value to the UKM sink once per this many updates
pub const UKM_EQT_REPORT_FREQUENCY: u64 = 100;

pub const TAB_FROM_BACKGROUNDED_TO_FIRST_AUDIO_STARTS: &str =
    "TabManager.Heuristics.FromBackgroundedToFirstAudioStarts";
pub const TAB_FROM_BACKGROUNDED_TO_FIRST_TITLE_UPDATED: &str =
    "TabManager.Heuristics.FromBackgroundedToFirstTitleUpdated";
pub const TAB_FROM_BACKGROUNDED_TO_FIRST_FAVICON_UPDATED: &str =
    "TabManager.Heuristics.FromBackgroundedToFirstFaviconUpdated";
pub const TAB_FROM_BACKGROUNDED_TO_FIRST_ALERT_FIRED: &str =
    "TabManager.Heuristics.FromBackgroundedToFirstAlertFired";
pub const TAB_FROM_BACKGROUNDED_TO_FIRST_NON_PERSISTENT_NOTIFICATION_CREATED: &str =
    "TabManager.Heuristics.FromBackgroundedToFirstNonPersistentNotificationCreated";

/// External recording sink; duration histograms plus the UKM-style EQT
/// responsiveness entry
pub trait MetricsRecorder {
    fn record_duration(&mut self, name: &'static str, sample: Duration);

    fn record_eqt(&mut self, ukm_source_id: i64, eqt: Duration);
}

/// Which once-per-background-period metrics have fired already
#[derive(Debug, Default)]
struct ReportedLatch {
    audio: bool,
    title: bool,
    favicon: bool,
    alert: bool,
    notification: bool,
}

/// Metric-specific bookkeeping for one page
///
/// Lives in a side map owned by this collector rather than in the page's
/// property store, so generic graph state stays free of metric internals.
#[derive(Debug, Default)]
struct PageMetricsState {
    navigation_committed_at: Option<Timestamp>,
    backgrounded_at: Option<Timestamp>,
    last_audible_ended_at: Option<Timestamp>,
    reported: ReportedLatch,
    eqt_updates: u64,
}

/// Observer emitting "time from backgrounded to first X" heuristics and
/// periodic EQT responsiveness reports
pub struct MetricsCollector {
    pages: AHashMap<CoordinationUnitId, PageMetricsState>,
    recorder: Box<dyn MetricsRecorder>,
}

impl MetricsCollector {
    pub fn new(recorder: Box<dyn MetricsRecorder>) -> Self {
        Self {
            pages: AHashMap::new(),
            recorder,
        }
    }

    fn entry(&mut self, page: CoordinationUnitId) -> &mut PageMetricsState {
        self.pages.entry(page).or_default()
    }

    /// A metric is gated until the navigation grace window has elapsed;
    /// pages that never committed a navigation stay gated
    fn navigation_grace_elapsed(state: &PageMetricsState, now: Timestamp) -> bool {
        state.navigation_committed_at.is_some_and(|committed| {
            now.saturating_sub(committed) >= METRICS_REPORT_DELAY.as_nanos() as Timestamp
        })
    }

    fn recently_audible(state: &PageMetricsState, now: Timestamp) -> bool {
        state.last_audible_ended_at.is_some_and(|ended| {
            now.saturating_sub(ended) < MAX_AUDIO_SLIENT_TIMEOUT.as_nanos() as Timestamp
        })
    }

    /// Record a once-per-background-period metric if the page is
    /// backgrounded, past the navigation grace window, and not yet latched
    fn record_backgrounded_metric(
        &mut self,
        page: CoordinationUnitId,
        name: &'static str,
        now: Timestamp,
        latched: impl Fn(&ReportedLatch) -> bool,
        latch: impl Fn(&mut ReportedLatch),
    ) {
        let state = self.entry(page);
        let Some(backgrounded_at) = state.backgrounded_at else {
            return;
        };
        if !Self::navigation_grace_elapsed(state, now) || latched(&state.reported) {
            return;
        }
        latch(&mut state.reported);
        let sample = Duration::from_nanos(now.saturating_sub(backgrounded_at));
        debug!("Recording {} for {}: {:?}", name, page, sample);
        self.recorder.record_duration(name, sample);
    }

    fn on_visibility_changed(&mut self, page: CoordinationUnitId, visible: bool, now: Timestamp) {
        let state = self.entry(page);
        if visible {
            state.backgrounded_at = None;
        } else {
            // A new background period: metrics latch once per period.
            state.backgrounded_at = Some(now);
            state.reported = ReportedLatch::default();
        }
    }

    fn on_audibility_changed(
        &mut self,
        registry: &UnitRegistry,
        frame_id: CoordinationUnitId,
        audible: bool,
        now: Timestamp,
    ) {
        let Some(page) = frame::page_of_frame(registry, frame_id) else {
            return;
        };
        if !audible {
            self.entry(page).last_audible_ended_at = Some(now);
            return;
        }
        if Self::recently_audible(self.entry(page), now) {
            return;
        }
        self.record_backgrounded_metric(
            page,
            TAB_FROM_BACKGROUNDED_TO_FIRST_AUDIO_STARTS,
            now,
            |latch| latch.audio,
            |latch| latch.audio = true,
        );
    }

    fn on_page_eqt_changed(
        &mut self,
        registry: &UnitRegistry,
        page: CoordinationUnitId,
        eqt: Duration,
    ) {
        let state = self.entry(page);
        state.eqt_updates += 1;
        if state.eqt_updates % UKM_EQT_REPORT_FREQUENCY != 0 {
            return;
        }
        let Some(source_id) = registry
            .unit(page)
            .and_then(|unit| unit.int_property(PropertyKey::UkmSourceId))
        else {
            return;
        };
        debug!("Reporting EQT for {} (source {}): {:?}", page, source_id, eqt);
        self.recorder.record_eqt(source_id, eqt);
    }
}

impl GraphObserver for MetricsCollector {
    fn should_observe(&self, unit: &crate::graph::node::CoordinationUnit) -> bool {
        matches!(unit.unit_type(), UnitType::Page | UnitType::Frame)
    }

    fn on_property_changed(
        &mut self,
        registry: &UnitRegistry,
        unit: CoordinationUnitId,
        key: PropertyKey,
        value: &PropertyValue,
        ctx: &mut ObserverCtx<'_>,
    ) {
        let now = ctx.now();
        match (unit.unit_type, key) {
            (UnitType::Page, PropertyKey::Visible) => {
                if let Some(visible) = value.as_bool() {
                    self.on_visibility_changed(unit, visible, now);
                }
            }
            (UnitType::Frame, PropertyKey::Audible) => {
                if let Some(audible) = value.as_bool() {
                    self.on_audibility_changed(registry, unit, audible, now);
                }
            }
            (UnitType::Page, PropertyKey::ExpectedTaskQueueingDuration) => {
                if let Some(eqt) = value.as_duration() {
                    self.on_page_eqt_changed(registry, unit, eqt);
                }
            }
            _ => {}
        }
    }

    fn on_event_received(
        &mut self,
        registry: &UnitRegistry,
        unit: CoordinationUnitId,
        event: Event,
        ctx: &mut ObserverCtx<'_>,
    ) {
        let now = ctx.now();
        match (unit.unit_type, event) {
            (UnitType::Page, Event::MainFrameNavigationCommitted) => {
                self.entry(unit).navigation_committed_at = Some(now);
            }
            (UnitType::Page, Event::TitleUpdated) => {
                self.record_backgrounded_metric(
                    unit,
                    TAB_FROM_BACKGROUNDED_TO_FIRST_TITLE_UPDATED,
                    now,
                    |latch| latch.title,
                    |latch| latch.title = true,
                );
            }
            (UnitType::Page, Event::FaviconUpdated) => {
                self.record_backgrounded_metric(
                    unit,
                    TAB_FROM_BACKGROUNDED_TO_FIRST_FAVICON_UPDATED,
                    now,
                    |latch| latch.favicon,
                    |latch| latch.favicon = true,
                );
            }
            (UnitType::Frame, Event::AlertFired) => {
                if let Some(page) = frame::page_of_frame(registry, unit) {
                    self.record_backgrounded_metric(
                        page,
                        TAB_FROM_BACKGROUNDED_TO_FIRST_ALERT_FIRED,
                        now,
                        |latch| latch.alert,
                        |latch| latch.alert = true,
                    );
                }
            }
            (UnitType::Frame, Event::NonPersistentNotificationCreated) => {
                if let Some(page) = frame::page_of_frame(registry, unit) {
                    self.record_backgrounded_metric(
                        page,
                        TAB_FROM_BACKGROUNDED_TO_FIRST_NON_PERSISTENT_NOTIFICATION_CREATED,
                        now,
                        |latch| latch.notification,
                        |latch| latch.notification = true,
                    );
                }
            }
            _ => {}
        }
    }

    fn on_before_destroyed(
        &mut self,
        _registry: &UnitRegistry,
        unit: CoordinationUnitId,
        _ctx: &mut ObserverCtx<'_>,
    ) {
        if unit.unit_type == UnitType::Page {
            self.pages.remove(&unit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_grace_window() {
        let mut state = PageMetricsState::default();
        let delay = METRICS_REPORT_DELAY.as_nanos() as Timestamp;
        assert!(!MetricsCollector::navigation_grace_elapsed(&state, delay * 2));

        state.navigation_committed_at = Some(0);
        assert!(!MetricsCollector::navigation_grace_elapsed(&state, delay - 1));
        assert!(MetricsCollector::navigation_grace_elapsed(&state, delay));
    }

    #[test]
    fn test_recently_audible_window() {
        let mut state = PageMetricsState::default();
        let silent = MAX_AUDIO_SLIENT_TIMEOUT.as_nanos() as Timestamp;
        assert!(!MetricsCollector::recently_audible(&state, 0));

        state.last_audible_ended_at = Some(1_000);
        assert!(MetricsCollector::recently_audible(&state, 1_000 + silent - 1));
        assert!(!MetricsCollector::recently_audible(&state, 1_000 + silent));
    }
}
