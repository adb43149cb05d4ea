/*!
 * Page Unit Logic
 * Derived process associations and per-page property aggregation
 */

use crate::core::types::{CoordinationUnitId, UnitType};
use crate::graph::frame;
use crate::graph::properties::PropertyKey;
use crate::graph::registry::UnitRegistry;
use ahash::AHashSet;
use std::time::Duration;

/// Child frames of the page, sorted by local id
pub fn frames_of_page(registry: &UnitRegistry, page: CoordinationUnitId) -> Vec<CoordinationUnitId> {
    registry
        .unit(page)
        .map(|unit| unit.children_of_type(UnitType::Frame))
        .unwrap_or_default()
}

/// Processes associated with the page, derived by walking
/// `page → frame → process` and deduplicating; a page has no direct
/// process edge
pub fn processes_of_page(
    registry: &UnitRegistry,
    page: CoordinationUnitId,
) -> Vec<CoordinationUnitId> {
    let mut seen: AHashSet<CoordinationUnitId> = AHashSet::new();
    let mut processes = Vec::new();
    for frame_id in frames_of_page(registry, page) {
        if let Some(process) = frame::process_of_frame(registry, frame_id) {
            if seen.insert(process) {
                processes.push(process);
            }
        }
    }
    processes.sort_unstable();
    processes
}

/// The page's main frame: a child frame with no parent frame
///
/// Mid-teardown a page can transiently hold more than one root frame; the
/// lowest local id wins so the answer stays deterministic.
pub fn main_frame_of(registry: &UnitRegistry, page: CoordinationUnitId) -> Option<CoordinationUnitId> {
    frames_of_page(registry, page)
        .into_iter()
        .find(|frame_id| frame::is_main_frame(registry, *frame_id))
}

/// Aggregated CPU usage for a page
///
/// Sums, for each process associated with the page, that process's CPU
/// usage divided evenly among all pages associated with the process: a
/// process shared by N pages attributes `usage / N` to each of them.
/// The split truncates toward zero, so up to N-1 units of a shared
/// process's usage go unattributed. `None` until at least one associated
/// process has reported usage.
pub fn aggregate_cpu_usage(registry: &UnitRegistry, page: CoordinationUnitId) -> Option<i64> {
    let mut total: Option<i64> = None;
    for process in processes_of_page(registry, page) {
        let Some(usage) = registry
            .unit(process)
            .and_then(|unit| unit.int_property(PropertyKey::CpuUsage))
        else {
            continue;
        };
        let sharing_pages = crate::graph::process::pages_of_process(registry, process).len() as i64;
        if sharing_pages == 0 {
            continue;
        }
        *total.get_or_insert(0) += usage / sharing_pages;
    }
    total
}

/// Expected task-queueing duration for a page
///
/// Taken straight from the process hosting the page's main frame, not
/// averaged; a page whose main frame has no process has no value.
pub fn expected_task_queueing_duration(
    registry: &UnitRegistry,
    page: CoordinationUnitId,
) -> Option<Duration> {
    let main_frame = main_frame_of(registry, page)?;
    let process = frame::process_of_frame(registry, main_frame)?;
    registry
        .unit(process)?
        .duration_property(PropertyKey::ExpectedTaskQueueingDuration)
}
