/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::data_structures::InlineString;
use crate::core::types::{CoordinationUnitId, UnitType};
use crate::graph::events::Event;
use crate::graph::properties::{PropertyKey, ValueShape};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Graph mutation errors with serialization support
///
/// Only caller bugs surface here: invariant violations and malformed
/// property or event writes. Operations naming a unit that has already been
/// torn down are silent no-ops, not errors, because teardown races with
/// late-arriving updates are expected.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum GraphError {
    #[error("Unit {0} is already registered")]
    #[diagnostic(
        code(graph::duplicate_unit),
        help("Coordination unit ids must not be reused while a unit with the same id is live.")
    )]
    DuplicateUnit(CoordinationUnitId),

    #[error("Adding {child} under {parent} would create a cycle")]
    #[diagnostic(
        code(graph::would_create_cycle),
        help("No unit may become its own ancestor. This indicates a caller bug, not a race.")
    )]
    WouldCreateCycle {
        parent: CoordinationUnitId,
        child: CoordinationUnitId,
    },

    #[error("Relationship not allowed: {detail}")]
    #[diagnostic(
        code(graph::invalid_relationship),
        help("Only frames can be children; a frame holds at most one frame, page, and process parent.")
    )]
    InvalidRelationship { detail: InlineString },

    #[error("Property {key:?} does not apply to {unit_type:?} units")]
    #[diagnostic(
        code(graph::property_not_applicable),
        help("Each property key belongs to a fixed set of unit types. Check the key's owner type.")
    )]
    PropertyNotApplicable {
        key: PropertyKey,
        unit_type: UnitType,
    },

    #[error("Property {key:?} expects a {expected:?} value, got {actual:?}")]
    #[diagnostic(
        code(graph::property_shape),
        help("Property values are shape-checked at the call boundary; use the typed setters.")
    )]
    PropertyShape {
        key: PropertyKey,
        expected: ValueShape,
        actual: ValueShape,
    },

    #[error("Event {event:?} does not apply to {unit_type:?} units")]
    #[diagnostic(
        code(graph::event_not_applicable),
        help("Each one-shot event targets a fixed unit type. Check the event's owner type.")
    )]
    EventNotApplicable { event: Event, unit_type: UnitType },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::WouldCreateCycle {
            parent: CoordinationUnitId::frame(1),
            child: CoordinationUnitId::frame(2),
        };
        assert_eq!(
            err.to_string(),
            "Adding Frame:2 under Frame:1 would create a cycle"
        );
    }

    #[test]
    fn test_error_serializes_tagged() {
        let err = GraphError::DuplicateUnit(CoordinationUnitId::page(9));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("duplicate_unit"));
    }
}
