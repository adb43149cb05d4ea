/*!
 * Debounce Timers
 * Single-shot, cancellable timers on the graph's virtual clock
 */

use crate::core::types::{CoordinationUnitId, Timestamp};
use ahash::AHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Handle identifying one armed single-shot timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// A timer that became due: routed back to the observer that armed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct DueTimer {
    pub deadline: Timestamp,
    pub handle: TimerHandle,
    pub observer_slot: usize,
    pub unit: CoordinationUnitId,
}

/// Queue of armed single-shot timers with lazy cancellation
///
/// Cancelled entries stay in the heap and are skipped when they surface;
/// `cancel` is idempotent and cancelling an already-fired handle is a
/// no-op. `cancel_for_unit` is the teardown enforcement hook: any timer
/// still tagged with a destroyed unit is cancelled before the unit's
/// storage goes away.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<DueTimer>>,
    armed: AHashMap<TimerHandle, CoordinationUnitId>,
    next_handle: u64,
}

impl TimerQueue {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a single-shot timer for the given observer slot and unit
    pub(crate) fn arm(
        &mut self,
        deadline: Timestamp,
        observer_slot: usize,
        unit: CoordinationUnitId,
    ) -> TimerHandle {
        self.next_handle += 1;
        let handle = TimerHandle(self.next_handle);
        self.armed.insert(handle, unit);
        self.heap.push(Reverse(DueTimer {
            deadline,
            handle,
            observer_slot,
            unit,
        }));
        handle
    }

    /// Cancel a timer; idempotent, and a no-op for fired handles
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.armed.remove(&handle).is_some()
    }

    /// Cancel every armed timer tagged with `unit`; returns how many
    pub(crate) fn cancel_for_unit(&mut self, unit: CoordinationUnitId) -> usize {
        let stale: Vec<TimerHandle> = self
            .armed
            .iter()
            .filter(|(_, tagged)| **tagged == unit)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in &stale {
            self.armed.remove(handle);
        }
        stale.len()
    }

    /// Pop every still-armed timer with `deadline <= now`, in deadline order
    pub(crate) fn pop_due(&mut self, now: Timestamp) -> Vec<DueTimer> {
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.heap.peek().copied() {
            if entry.deadline > now {
                break;
            }
            self.heap.pop();
            if self.armed.remove(&entry.handle).is_some() {
                due.push(entry);
            }
        }
        due
    }
}
