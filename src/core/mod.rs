/*!
 * Core Module
 * Shared leaf types: ids, clock, errors, small-string optimization
 */

pub mod clock;
pub mod data_structures;
pub mod errors;
pub mod types;

pub use clock::TickClock;
pub use data_structures::InlineString;
pub use errors::GraphError;
pub use types::{CoordinationUnitId, GraphResult, LocalId, Timestamp, UnitType};
