/*!
 * Graph Module
 * Coordination units, their registry, properties, events, and the manager
 */

pub mod events;
pub mod frame;
pub mod manager;
pub mod node;
pub mod page;
pub mod process;
pub mod properties;
pub mod registry;
pub mod timers;

pub use events::Event;
pub use manager::{CoordinationUnitManager, ObserverHandle};
pub use node::CoordinationUnit;
pub use properties::{PropertyKey, PropertyStore, PropertyValue, ValueShape, WriteOutcome};
pub use registry::UnitRegistry;
pub use timers::{TimerHandle, TimerQueue};
