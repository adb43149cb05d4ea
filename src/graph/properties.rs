/*!
 * Property Store
 * Typed, sparse per-unit properties with equality-suppressed writes
 */

use crate::core::data_structures::InlineString;
use crate::core::types::UnitType;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shape of a property value, checked at the write boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ValueShape {
    Bool,
    Int,
    Duration,
    Text,
}

/// Closed enumeration of durable property keys
///
/// Each key applies to a fixed set of unit types and carries a fixed value
/// shape; writes violating either are rejected before they reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PropertyKey {
    /// Process CPU usage, and the per-page aggregate derived from it
    CpuUsage,
    /// Responsiveness estimate propagated from a process to the page whose
    /// main frame it hosts
    ExpectedTaskQueueingDuration,
    /// Process launch time, nanoseconds of virtual time
    LaunchTime,
    /// OS process id
    ProcessId,
    /// Main-thread task load is low; reported per frame and per process
    MainThreadTaskLoadIsLow,
    /// Page visibility
    Visible,
    /// UKM source id assigned to a page's current navigation
    UkmSourceId,
    /// Page has an in-flight load
    IsLoading,
    /// Frame is playing audio
    Audible,
    /// Frame's network activity has almost quiesced
    NetworkAlmostIdle,
}

impl PropertyKey {
    /// Value shape this key stores
    #[inline]
    pub fn shape(self) -> ValueShape {
        match self {
            Self::CpuUsage | Self::LaunchTime | Self::ProcessId | Self::UkmSourceId => {
                ValueShape::Int
            }
            Self::ExpectedTaskQueueingDuration => ValueShape::Duration,
            Self::MainThreadTaskLoadIsLow
            | Self::Visible
            | Self::IsLoading
            | Self::Audible
            | Self::NetworkAlmostIdle => ValueShape::Bool,
        }
    }

    /// Whether this key is legal on the given unit type
    pub fn applies_to(self, unit_type: UnitType) -> bool {
        match self {
            Self::CpuUsage | Self::ExpectedTaskQueueingDuration => {
                matches!(unit_type, UnitType::Process | UnitType::Page)
            }
            Self::LaunchTime | Self::ProcessId => unit_type == UnitType::Process,
            Self::MainThreadTaskLoadIsLow => {
                matches!(unit_type, UnitType::Frame | UnitType::Process)
            }
            Self::Visible | Self::UkmSourceId | Self::IsLoading => unit_type == UnitType::Page,
            Self::Audible | Self::NetworkAlmostIdle => unit_type == UnitType::Frame,
        }
    }
}

/// A stored property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Duration(Duration),
    Text(InlineString),
}

impl PropertyValue {
    #[inline]
    pub fn shape(&self) -> ValueShape {
        match self {
            Self::Bool(_) => ValueShape::Bool,
            Self::Int(_) => ValueShape::Int,
            Self::Duration(_) => ValueShape::Duration,
            Self::Text(_) => ValueShape::Text,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    #[inline]
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    #[inline]
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<Duration> for PropertyValue {
    #[inline]
    fn from(v: Duration) -> Self {
        Self::Duration(v)
    }
}

impl From<&str> for PropertyValue {
    #[inline]
    fn from(v: &str) -> Self {
        Self::Text(InlineString::from(v))
    }
}

/// Outcome of a store write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Value stored and differs from what was there before (or was forced)
    Updated,
    /// Value equals the stored one; nothing written, nobody notified
    Unchanged,
}

/// Sparse per-unit property map; an absent key means "unknown", not zero
#[derive(Debug, Default)]
pub struct PropertyStore {
    values: AHashMap<PropertyKey, PropertyValue>,
}

impl PropertyStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, key: PropertyKey) -> Option<&PropertyValue> {
        self.values.get(&key)
    }

    /// Store `value`, suppressing writes equal to the current value
    pub fn set(&mut self, key: PropertyKey, value: PropertyValue) -> WriteOutcome {
        if self.values.get(&key) == Some(&value) {
            return WriteOutcome::Unchanged;
        }
        self.values.insert(key, value);
        WriteOutcome::Updated
    }

    /// Store `value` unconditionally; the force-notify path for callers
    /// that must re-trigger observers on an unchanged value
    pub fn set_forced(&mut self, key: PropertyKey, value: PropertyValue) -> WriteOutcome {
        self.values.insert(key, value);
        WriteOutcome::Updated
    }

    /// Remove the key; returns whether it was present
    #[inline]
    pub fn clear(&mut self, key: PropertyKey) -> bool {
        self.values.remove(&key).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
