//! Catalog item models: irritants and rewards.
//!
//! # Responsibility
//! - Define the two user-managed catalogs and the capability shared by both.
//! - Validate names and point values before they reach the store.
//! - Produce restorable snapshots for deletion undo.
//!
//! # Invariants
//! - `name` is trimmed and never empty.
//! - Point values lie in `1..=MAX_ITEM_POINTS`.
//! - A restored snapshot always gets a fresh identity.

use crate::model::ordering::Orderable;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for irritants and rewards.
pub type ItemId = Uuid;

/// Largest point value accepted for an irritant or reward.
pub const MAX_ITEM_POINTS: i64 = 999_999;

/// Rejected user input. Never surfaced to the user as an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    PointsOutOfRange(i64),
    IndexOutOfRange { from: usize, to: usize, len: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be blank"),
            Self::PointsOutOfRange(points) => write!(
                f,
                "points must be between 1 and {MAX_ITEM_POINTS}, got {points}"
            ),
            Self::IndexOutOfRange { from, to, len } => write!(
                f,
                "move {from} -> {to} is out of range for {len} item(s)"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Which catalog an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Irritant,
    Reward,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Irritant => "irritant",
            Self::Reward => "reward",
        }
    }
}

/// Recurring negative event; tapping it earns `point_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Irritant {
    pub uuid: ItemId,
    pub name: String,
    pub point_value: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub sort_order: Option<i64>,
}

/// Redeemable goal costing `required_points`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub uuid: ItemId,
    pub name: String,
    pub required_points: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub sort_order: Option<i64>,
}

/// Data kept after a deletion so the item can be re-created on undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub kind: ItemKind,
    pub name: String,
    pub points: i64,
    pub sort_order: Option<i64>,
}

/// Shape shared by irritants and rewards.
pub trait CatalogItem: Orderable + Clone {
    const KIND: ItemKind;

    /// Builds an item from its persisted columns.
    fn from_parts(
        uuid: ItemId,
        name: String,
        points: i64,
        created_at: i64,
        sort_order: Option<i64>,
    ) -> Self;

    fn id(&self) -> ItemId;
    fn name(&self) -> &str;
    /// Point value for irritants, cost for rewards.
    fn points(&self) -> i64;

    fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            kind: Self::KIND,
            name: self.name().to_string(),
            points: self.points(),
            sort_order: self.sort_order(),
        }
    }

    /// Re-creates an item from a snapshot under a new identity.
    fn from_snapshot(snapshot: &ItemSnapshot, created_at: i64) -> Self {
        Self::from_parts(
            Uuid::new_v4(),
            snapshot.name.clone(),
            snapshot.points,
            created_at,
            snapshot.sort_order,
        )
    }
}

impl Orderable for Irritant {
    fn sort_order(&self) -> Option<i64> {
        self.sort_order
    }

    fn set_sort_order(&mut self, sort_order: i64) {
        self.sort_order = Some(sort_order);
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}

impl CatalogItem for Irritant {
    const KIND: ItemKind = ItemKind::Irritant;

    fn from_parts(
        uuid: ItemId,
        name: String,
        points: i64,
        created_at: i64,
        sort_order: Option<i64>,
    ) -> Self {
        Self {
            uuid,
            name,
            point_value: points,
            created_at,
            sort_order,
        }
    }

    fn id(&self) -> ItemId {
        self.uuid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn points(&self) -> i64 {
        self.point_value
    }
}

impl Orderable for Reward {
    fn sort_order(&self) -> Option<i64> {
        self.sort_order
    }

    fn set_sort_order(&mut self, sort_order: i64) {
        self.sort_order = Some(sort_order);
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }
}

impl CatalogItem for Reward {
    const KIND: ItemKind = ItemKind::Reward;

    fn from_parts(
        uuid: ItemId,
        name: String,
        points: i64,
        created_at: i64,
        sort_order: Option<i64>,
    ) -> Self {
        Self {
            uuid,
            name,
            required_points: points,
            created_at,
            sort_order,
        }
    }

    fn id(&self) -> ItemId {
        self.uuid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn points(&self) -> i64 {
        self.required_points
    }
}

/// Trims `name` and rejects blank input.
pub fn normalize_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Accepts point values in `1..=MAX_ITEM_POINTS`.
pub fn validate_points(points: i64) -> Result<i64, ValidationError> {
    if points <= 0 || points > MAX_ITEM_POINTS {
        return Err(ValidationError::PointsOutOfRange(points));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_name, validate_points, CatalogItem, Irritant, ItemKind, Reward,
        ValidationError, MAX_ITEM_POINTS,
    };
    use uuid::Uuid;

    #[test]
    fn normalize_name_trims_and_rejects_blank() {
        assert_eq!(normalize_name("  Rain  ").unwrap(), "Rain");
        assert_eq!(normalize_name(" \t "), Err(ValidationError::EmptyName));
    }

    #[test]
    fn validate_points_enforces_bounds() {
        assert_eq!(validate_points(1), Ok(1));
        assert_eq!(validate_points(MAX_ITEM_POINTS), Ok(MAX_ITEM_POINTS));
        assert!(validate_points(0).is_err());
        assert!(validate_points(-3).is_err());
        assert_eq!(
            validate_points(MAX_ITEM_POINTS + 1),
            Err(ValidationError::PointsOutOfRange(MAX_ITEM_POINTS + 1))
        );
    }

    #[test]
    fn snapshot_restore_keeps_fields_but_not_identity() {
        let original = Reward::from_parts(Uuid::new_v4(), "Cake".to_string(), 300, 10, Some(4));
        let snapshot = original.snapshot();
        assert_eq!(snapshot.kind, ItemKind::Reward);

        let restored = Reward::from_snapshot(&snapshot, 99);
        assert_ne!(restored.uuid, original.uuid);
        assert_eq!(restored.name, "Cake");
        assert_eq!(restored.required_points, 300);
        assert_eq!(restored.sort_order, Some(4));
        assert_eq!(restored.created_at, 99);
    }

    #[test]
    fn irritant_snapshot_serializes_kind_in_snake_case() {
        let irritant =
            Irritant::from_parts(Uuid::new_v4(), "Noise".to_string(), 10, 1, None);
        let json = serde_json::to_value(irritant.snapshot()).unwrap();
        assert_eq!(json["kind"], "irritant");
        assert!(json["sort_order"].is_null());
    }
}
