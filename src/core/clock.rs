/*!
 * Tick Clock
 * Virtual monotonic time source for the graph's control sequence
 */

use crate::core::types::Timestamp;
use std::time::Duration;

/// Virtual monotonic clock, owned by the coordination unit manager
///
/// All timestamps and debounce deadlines in the graph are read from this
/// clock rather than the OS, so tests (and any embedder that wants
/// deterministic replay) control time explicitly by advancing it.
#[derive(Debug, Default)]
pub struct TickClock {
    now_ns: Timestamp,
}

impl TickClock {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in nanoseconds
    #[inline]
    pub fn now(&self) -> Timestamp {
        self.now_ns
    }

    /// Advance virtual time forward; never moves backwards
    #[inline]
    pub fn advance(&mut self, delta: Duration) {
        self.now_ns = self.now_ns.saturating_add(delta.as_nanos() as Timestamp);
    }

    /// Deadline `delay` from now, saturating at the timestamp range
    #[inline]
    pub fn deadline_after(&self, delay: Duration) -> Timestamp {
        self.now_ns.saturating_add(delay.as_nanos() as Timestamp)
    }
}
