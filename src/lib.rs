/*!
 * Resource Graph
 * Typed coordination-unit graph for browser resource tracking: processes,
 * pages, and frames with property propagation, observer dispatch, and a
 * virtual-clock timer queue
 */

pub mod core;
pub mod graph;
pub mod observers;

pub use crate::core::clock::TickClock;
pub use crate::core::errors::GraphError;
pub use crate::core::types::{CoordinationUnitId, GraphResult, LocalId, Timestamp, UnitType};
pub use crate::graph::events::Event;
pub use crate::graph::manager::{CoordinationUnitManager, ObserverHandle};
pub use crate::graph::properties::{PropertyKey, PropertyValue};
pub use crate::graph::timers::TimerHandle;
pub use crate::observers::{
    GraphObserver, LoadIdleState, MetricsCollector, MetricsRecorder, ObserverCtx,
    PageSignalGenerator, PageSignalSink, ProcessHostSink, ProcessPriorityObserver,
};
