//! Balance aggregate (`user_stats` singleton).
//!
//! # Responsibility
//! - Apply credit, debit and reversal arithmetic to the two point totals.
//!
//! # Invariants
//! - `current_balance` and `lifetime_total` are never negative.
//! - Non-positive amounts are ignored by every mutation.
//! - A field that has grown past `MAX_SAFE_POINTS` stops growing; no error is
//!   raised and the other field is unaffected.

use crate::model::point_log::PointLogEntry;
use serde::{Deserialize, Serialize};

/// Growth ceiling shared by both totals.
pub const MAX_SAFE_POINTS: i64 = i64::MAX - 1_000_000;

/// Upper bound applied when a history reversal hands points back.
const MAX_RESTORED_BALANCE: i64 = i64::MAX - 1;

/// Current and all-time point totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    /// All points ever earned; only reduced when a credit is reversed.
    pub lifetime_total: i64,
    /// Spendable points.
    pub current_balance: i64,
}

impl UserStats {
    pub fn new(lifetime_total: i64, current_balance: i64) -> Self {
        Self {
            lifetime_total,
            current_balance,
        }
    }

    /// Adds `points` to both totals.
    ///
    /// Each total is guarded separately: one may freeze at the ceiling while
    /// the other keeps growing.
    pub fn credit(&mut self, points: i64) {
        if points <= 0 {
            return;
        }
        if self.lifetime_total <= MAX_SAFE_POINTS {
            self.lifetime_total = self.lifetime_total.saturating_add(points);
        }
        if self.current_balance <= MAX_SAFE_POINTS {
            self.current_balance = self.current_balance.saturating_add(points);
        }
    }

    /// Spends `points` from the current balance, flooring at zero.
    ///
    /// Whether the balance covers the amount is the caller's decision.
    pub fn debit(&mut self, points: i64) {
        if points <= 0 {
            return;
        }
        self.current_balance = floor_zero(self.current_balance.saturating_sub(points));
    }

    /// Takes back a previous credit from both totals.
    pub fn reverse_credit(&mut self, points: i64) {
        if points <= 0 {
            return;
        }
        self.current_balance = floor_zero(self.current_balance.saturating_sub(points));
        self.lifetime_total = floor_zero(self.lifetime_total.saturating_sub(points));
    }

    /// Reverts the balance effect of one log entry.
    ///
    /// Redemptions hand their (negative) delta back to the current balance
    /// only; credits are removed from both totals.
    pub fn reverse_entry(&mut self, entry: &PointLogEntry) {
        if entry.is_redemption {
            let restored = self
                .current_balance
                .saturating_sub(entry.point_delta)
                .min(MAX_RESTORED_BALANCE);
            self.current_balance = floor_zero(restored);
        } else {
            self.current_balance =
                floor_zero(self.current_balance.saturating_sub(entry.point_delta));
            self.lifetime_total = floor_zero(self.lifetime_total.saturating_sub(entry.point_delta));
        }
    }

    /// Returns whether `required_points` can be paid from the current balance.
    pub fn can_afford(&self, required_points: i64) -> bool {
        self.current_balance >= required_points
    }
}

fn floor_zero(value: i64) -> i64 {
    value.max(0)
}

#[cfg(test)]
mod tests {
    use super::{UserStats, MAX_SAFE_POINTS};
    use crate::model::point_log::PointLogEntry;

    #[test]
    fn credit_then_reverse_credit_restores_totals() {
        for points in [1, 7, 10, 999_999] {
            let mut stats = UserStats::new(40, 25);
            stats.credit(points);
            stats.reverse_credit(points);
            assert_eq!(stats, UserStats::new(40, 25), "points={points}");
        }
    }

    #[test]
    fn non_positive_amounts_are_ignored() {
        let mut stats = UserStats::new(5, 5);
        stats.credit(0);
        stats.credit(-5);
        stats.debit(0);
        stats.debit(-5);
        stats.reverse_credit(0);
        stats.reverse_credit(-5);
        assert_eq!(stats, UserStats::new(5, 5));
    }

    #[test]
    fn debit_floors_at_zero_and_keeps_lifetime() {
        let mut stats = UserStats::new(30, 10);
        stats.debit(25);
        assert_eq!(stats, UserStats::new(30, 0));
    }

    #[test]
    fn reverse_credit_floors_both_totals_at_zero() {
        let mut stats = UserStats::new(3, 1);
        stats.reverse_credit(10);
        assert_eq!(stats, UserStats::new(0, 0));
    }

    #[test]
    fn credit_freezes_each_total_independently_past_ceiling() {
        let frozen = MAX_SAFE_POINTS + 1;
        let mut stats = UserStats::new(frozen, 100);
        stats.credit(50);
        assert_eq!(stats.lifetime_total, frozen);
        assert_eq!(stats.current_balance, 150);

        let mut stats = UserStats::new(0, frozen);
        stats.credit(50);
        assert_eq!(stats.lifetime_total, 50);
        assert_eq!(stats.current_balance, frozen);
    }

    #[test]
    fn credit_at_ceiling_still_increments_once() {
        let mut stats = UserStats::new(MAX_SAFE_POINTS, MAX_SAFE_POINTS);
        stats.credit(1);
        assert_eq!(stats.lifetime_total, MAX_SAFE_POINTS + 1);
        stats.credit(1);
        assert_eq!(stats.lifetime_total, MAX_SAFE_POINTS + 1);
    }

    #[test]
    fn reverse_entry_for_redemption_restores_current_only() {
        let mut stats = UserStats::new(10, 0);
        let entry = PointLogEntry::redemption("Cake", 10, 1_000);
        stats.reverse_entry(&entry);
        assert_eq!(stats, UserStats::new(10, 10));
    }

    #[test]
    fn reverse_entry_for_credit_clamps_both_totals() {
        let mut stats = UserStats::new(4, 2);
        let entry = PointLogEntry::credit("Rain", 5, 1_000);
        stats.reverse_entry(&entry);
        assert_eq!(stats, UserStats::new(0, 0));
    }

    #[test]
    fn reverse_entry_for_redemption_caps_restored_balance() {
        let mut stats = UserStats::new(0, i64::MAX - 3);
        let entry = PointLogEntry::redemption("Trip", 999_999, 1_000);
        stats.reverse_entry(&entry);
        assert_eq!(stats.current_balance, i64::MAX - 1);
    }
}
