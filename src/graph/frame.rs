/*!
 * Frame Unit Logic
 * Typed accessors and tree rules for frame coordination units
 */

use crate::core::types::{CoordinationUnitId, UnitType};
use crate::graph::registry::UnitRegistry;

/// The frame's parent frame, if any
pub fn parent_frame_of(
    registry: &UnitRegistry,
    frame: CoordinationUnitId,
) -> Option<CoordinationUnitId> {
    registry
        .unit(frame)?
        .single_parent_of_type(UnitType::Frame)
}

/// The page this frame belongs to, if linked
pub fn page_of_frame(
    registry: &UnitRegistry,
    frame: CoordinationUnitId,
) -> Option<CoordinationUnitId> {
    registry.unit(frame)?.single_parent_of_type(UnitType::Page)
}

/// The process hosting this frame, if linked
pub fn process_of_frame(
    registry: &UnitRegistry,
    frame: CoordinationUnitId,
) -> Option<CoordinationUnitId> {
    registry
        .unit(frame)?
        .single_parent_of_type(UnitType::Process)
}

/// A frame is a main frame iff it has no parent frame
pub fn is_main_frame(registry: &UnitRegistry, frame: CoordinationUnitId) -> bool {
    frame.unit_type == UnitType::Frame
        && registry
            .unit(frame)
            .is_some_and(|unit| unit.single_parent_of_type(UnitType::Frame).is_none())
}
