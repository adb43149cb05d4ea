/*!
 * One-Shot Events
 * Non-durable signals dispatched to observers but never stored
 */

use crate::core::types::UnitType;
use serde::{Deserialize, Serialize};

/// One-shot signal delivered to observers of a unit
///
/// Unlike properties these carry no durable state: they are dispatched once
/// and forgotten, so an equal "value" fired twice notifies twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// A frame ran `alert()`
    AlertFired,
    /// A frame created a non-persistent notification
    NonPersistentNotificationCreated,
    /// The page's main frame committed a navigation
    MainFrameNavigationCommitted,
    /// The page's title changed
    TitleUpdated,
    /// The page's favicon changed
    FaviconUpdated,
}

impl Event {
    /// Whether this event is legal on the given unit type
    pub fn applies_to(self, unit_type: UnitType) -> bool {
        match self {
            Self::AlertFired | Self::NonPersistentNotificationCreated => {
                unit_type == UnitType::Frame
            }
            Self::MainFrameNavigationCommitted | Self::TitleUpdated | Self::FaviconUpdated => {
                unit_type == UnitType::Page
            }
        }
    }
}
