/*!
 * Process Unit Logic
 * Derived page associations and propagation targets for process properties
 */

use crate::core::types::{CoordinationUnitId, UnitType};
use crate::graph::frame;
use crate::graph::registry::UnitRegistry;
use ahash::AHashSet;

/// Child frames of the process, sorted by local id
pub fn frames_of_process(
    registry: &UnitRegistry,
    process: CoordinationUnitId,
) -> Vec<CoordinationUnitId> {
    registry
        .unit(process)
        .map(|unit| unit.children_of_type(UnitType::Frame))
        .unwrap_or_default()
}

/// Pages associated with the process, derived by walking
/// `process → frame → page` and deduplicating; a process has no direct
/// page edge
pub fn pages_of_process(
    registry: &UnitRegistry,
    process: CoordinationUnitId,
) -> Vec<CoordinationUnitId> {
    let mut seen: AHashSet<CoordinationUnitId> = AHashSet::new();
    let mut pages = Vec::new();
    for frame_id in frames_of_process(registry, process) {
        if let Some(page) = frame::page_of_frame(registry, frame_id) {
            if seen.insert(page) {
                pages.push(page);
            }
        }
    }
    pages.sort_unstable();
    pages
}

/// Pages reached through the process's *main* frames only
///
/// This is the propagation fan-out for expected task-queueing duration:
/// non-main-frame associations are ignored, and a main frame whose page
/// link is not yet determined is skipped rather than treated as an error.
pub fn pages_via_main_frames(
    registry: &UnitRegistry,
    process: CoordinationUnitId,
) -> Vec<CoordinationUnitId> {
    let mut seen: AHashSet<CoordinationUnitId> = AHashSet::new();
    let mut pages = Vec::new();
    for frame_id in frames_of_process(registry, process) {
        if !frame::is_main_frame(registry, frame_id) {
            continue;
        }
        if let Some(page) = frame::page_of_frame(registry, frame_id) {
            if seen.insert(page) {
                pages.push(page);
            }
        }
    }
    pages.sort_unstable();
    pages
}
