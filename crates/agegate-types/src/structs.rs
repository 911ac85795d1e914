//! Core entity structs: the display bucket, persisted readings and the
//! session view published to the panel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::ReadingId;

/// Width of one display bucket, in years.
pub const BUCKET_WIDTH: i64 = 10;

/// The decade range displayed for the most recently accepted age.
///
/// Outside the idle state `lower <= value < upper` and
/// `upper == lower + BUCKET_WIDTH`. The idle state forces all three
/// fields to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisplayBucket {
    /// The accepted age, floored to a whole number.
    pub value: i64,
    /// Inclusive lower decade boundary.
    pub lower: i64,
    /// Exclusive upper decade boundary.
    pub upper: i64,
}

impl DisplayBucket {
    /// The idle state shown before any reading and after the debounce
    /// window expires.
    pub const IDLE: Self = Self {
        value: 0,
        lower: 0,
        upper: 0,
    };

    /// Whether this is the idle (reset) state.
    pub const fn is_idle(&self) -> bool {
        self.value == 0 && self.lower == 0 && self.upper == 0
    }
}

/// A reading as submitted to the store, before the store assigns its
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NewReading {
    /// Client-generated push key.
    pub id: ReadingId,
    /// Operator-supplied identity label, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// The accepted age.
    pub age: i64,
}

impl NewReading {
    /// Build a reading with a freshly generated key.
    pub fn new(user_name: Option<String>, age: i64) -> Self {
        Self {
            id: ReadingId::new(),
            user_name,
            age,
        }
    }
}

/// A reading as persisted in the append-only `ageComponent` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Reading {
    /// Push key under the collection.
    pub id: ReadingId,
    /// Operator-supplied identity label, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// The accepted age.
    pub age: i64,
    /// Commit time assigned by the store, never by the client clock.
    pub timestamp: DateTime<Utc>,
}

/// Acknowledgement returned by the store for a committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ReadingAck {
    /// Key the reading was stored under.
    pub id: ReadingId,
    /// Server-assigned commit timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of the controller's display and gating state.
///
/// Published after every state change so the panel (and tests) can observe
/// the controller without sharing its internals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SessionView {
    /// Currently displayed bucket.
    pub bucket: DisplayBucket,
    /// Current identity label (trimmed).
    pub user_name: String,
    /// Whether the identity field is being edited.
    pub typing: bool,
    /// Whether a recent successful write is suppressing acceptance.
    pub cooldown: bool,
    /// Whether the debounce timer is pending.
    pub timer_armed: bool,
    /// Number of store writes started but not yet completed.
    pub writes_in_flight: u32,
    /// Number of debounce windows that have expired so far.
    pub window: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn idle_bucket_is_all_zero() {
        assert!(DisplayBucket::IDLE.is_idle());
        assert!(DisplayBucket::default().is_idle());
        let bucket = DisplayBucket {
            value: 5,
            lower: 0,
            upper: 10,
        };
        assert!(!bucket.is_idle());
    }

    #[test]
    fn reading_uses_wire_field_names() {
        let reading = NewReading::new(Some("Alice".to_owned()), 37);
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["userName"], "Alice");
        assert_eq!(json["age"], 37);
    }

    #[test]
    fn anonymous_reading_omits_user_name() {
        let reading = NewReading::new(None, 0);
        let json = serde_json::to_value(&reading).unwrap();
        assert!(json.get("userName").is_none());
    }

    #[test]
    fn session_view_serializes_camel_case() {
        let view = SessionView {
            timer_armed: true,
            ..SessionView::default()
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["timerArmed"], true);
        assert_eq!(json["bucket"]["upper"], 0);
    }
}
