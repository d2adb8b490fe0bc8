//! Point log entry model.
//!
//! # Invariants
//! - Credits carry a positive `point_delta`, redemptions a negative one.
//! - Entries are never edited after creation; they are only deleted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one log entry.
pub type PointLogId = Uuid;

/// One movement of points, shown in the history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointLogEntry {
    pub uuid: PointLogId,
    /// Irritant or reward name at the time of the movement.
    pub label: String,
    pub point_delta: i64,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub is_redemption: bool,
}

impl PointLogEntry {
    /// Builds a credit entry for an irritant tap.
    pub fn credit(label: impl Into<String>, points: i64, timestamp: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            label: label.into(),
            point_delta: points,
            timestamp,
            is_redemption: false,
        }
    }

    /// Builds a redemption entry; `points` is the positive reward cost.
    pub fn redemption(label: impl Into<String>, points: i64, timestamp: i64) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            label: label.into(),
            point_delta: -points,
            timestamp,
            is_redemption: true,
        }
    }
}
