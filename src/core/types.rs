/*!
 * Core Types
 * Identity and vocabulary types shared across the graph
 */

use serde::{Deserialize, Serialize};

/// Locally-scoped unit id, unique within a `UnitType` for the process lifetime
pub type LocalId = u64;

/// Virtual monotonic timestamp in nanoseconds
pub type Timestamp = u64;

/// Common result type for graph operations
pub type GraphResult<T> = Result<T, super::errors::GraphError>;

/// Closed set of coordination unit types
///
/// This is the type tag the rest of the crate dispatches on; there is no
/// runtime downcasting between unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum UnitType {
    Frame,
    Page,
    Process,
}

/// Globally unique identity of a coordination unit: `(type, local id)`
///
/// Ids are assigned by the embedder and must not be reused while any unit
/// with the same pair is still registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CoordinationUnitId {
    pub unit_type: UnitType,
    pub local_id: LocalId,
}

impl CoordinationUnitId {
    #[inline]
    pub fn new(unit_type: UnitType, local_id: LocalId) -> Self {
        Self {
            unit_type,
            local_id,
        }
    }

    /// Shorthand for a frame unit id
    #[inline]
    pub fn frame(local_id: LocalId) -> Self {
        Self::new(UnitType::Frame, local_id)
    }

    /// Shorthand for a page unit id
    #[inline]
    pub fn page(local_id: LocalId) -> Self {
        Self::new(UnitType::Page, local_id)
    }

    /// Shorthand for a process unit id
    #[inline]
    pub fn process(local_id: LocalId) -> Self {
        Self::new(UnitType::Process, local_id)
    }
}

impl std::fmt::Display for CoordinationUnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}:{}", self.unit_type, self.local_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equality_is_type_scoped() {
        assert_ne!(CoordinationUnitId::frame(1), CoordinationUnitId::page(1));
        assert_eq!(CoordinationUnitId::page(7), CoordinationUnitId::page(7));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(CoordinationUnitId::process(42).to_string(), "Process:42");
    }
}
