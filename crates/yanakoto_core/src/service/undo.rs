//! Single-slot, time-bounded undo controller.
//!
//! # Responsibility
//! - Hold the snapshot of the most recent reversible action (a credit or an
//!   item deletion) for a fixed window.
//! - Decide whether an undo request or an expiry callback still applies.
//!
//! # Invariants
//! - At most one pending undo exists; arming replaces it without reversing
//!   the replaced action.
//! - The window is measured on a monotonic clock; at `armed_at + window` the
//!   slot is already expired.
//! - Expiry callbacks carry the ticket they were scheduled with and are
//!   ignored once that ticket is no longer current.
//!
//! The controller holds no thread or timer of its own. Callers either poll
//! `tick` or schedule a one-shot callback that calls `expire(ticket)`.

use crate::model::item::{ItemKind, ItemSnapshot};
use crate::model::point_log::PointLogId;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Length of the undo window.
pub const UNDO_WINDOW: Duration = Duration::from_secs(4);

/// Data needed to exactly reverse one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingUndo {
    /// Points credited by an irritant tap and the log entry it wrote.
    Credit {
        points: i64,
        log_entry_id: PointLogId,
    },
    /// An irritant or reward that was deleted.
    ItemDeletion { snapshot: ItemSnapshot },
}

/// What the presentation layer shows next to the undo affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UndoNotice {
    Credit { points: i64 },
    Deleted { item_kind: ItemKind, name: String },
}

impl PendingUndo {
    pub fn describe(&self) -> UndoNotice {
        match self {
            Self::Credit { points, .. } => UndoNotice::Credit { points: *points },
            Self::ItemDeletion { snapshot } => UndoNotice::Deleted {
                item_kind: snapshot.kind,
                name: snapshot.name.clone(),
            },
        }
    }

    fn kind_label(&self) -> &'static str {
        match self {
            Self::Credit { .. } => "credit",
            Self::ItemDeletion { .. } => "item_deletion",
        }
    }
}

/// Identifies one arming of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UndoTicket(pub u64);

#[derive(Debug)]
struct ArmedSlot {
    ticket: UndoTicket,
    pending: PendingUndo,
    deadline: Instant,
}

/// Undo slot state machine: idle or armed with one snapshot.
#[derive(Debug)]
pub struct UndoController {
    window: Duration,
    next_ticket: u64,
    slot: Option<ArmedSlot>,
}

impl Default for UndoController {
    fn default() -> Self {
        Self::new(UNDO_WINDOW)
    }
}

impl UndoController {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            next_ticket: 1,
            slot: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arms the slot with `pending`, discarding any previous snapshot.
    ///
    /// The returned ticket is what a scheduled expiry callback must present.
    pub fn arm(&mut self, pending: PendingUndo, now: Instant) -> UndoTicket {
        let ticket = UndoTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);

        if let Some(previous) = self.slot.take() {
            debug!(
                "event=undo_arm module=undo status=replaced previous_ticket={} previous_kind={}",
                previous.ticket.0,
                previous.pending.kind_label()
            );
        }

        info!(
            "event=undo_arm module=undo status=ok ticket={} kind={} window_ms={}",
            ticket.0,
            pending.kind_label(),
            self.window.as_millis()
        );
        self.slot = Some(ArmedSlot {
            ticket,
            pending,
            deadline: now + self.window,
        });
        ticket
    }

    /// Takes the pending snapshot for an explicit undo.
    ///
    /// Returns `None` when idle or when the window has already passed; in
    /// the latter case the slot is cleared as if the timer had fired.
    pub fn take(&mut self, now: Instant) -> Option<PendingUndo> {
        self.tick(now);
        let slot = self.slot.take()?;
        info!(
            "event=undo_invoke module=undo status=ok ticket={} kind={}",
            slot.ticket.0,
            slot.pending.kind_label()
        );
        Some(slot.pending)
    }

    /// Clears the slot if `ticket` is still the armed one.
    ///
    /// Stale callbacks (the slot was re-armed, invoked or already expired)
    /// return `false` and change nothing.
    pub fn expire(&mut self, ticket: UndoTicket) -> bool {
        match &self.slot {
            Some(slot) if slot.ticket == ticket => {
                self.slot = None;
                info!(
                    "event=undo_expire module=undo status=ok ticket={} trigger=callback",
                    ticket.0
                );
                true
            }
            _ => {
                debug!(
                    "event=undo_expire module=undo status=skipped ticket={} reason=stale_ticket",
                    ticket.0
                );
                false
            }
        }
    }

    /// Clears the slot when its deadline has passed. Returns whether it did.
    pub fn tick(&mut self, now: Instant) -> bool {
        let expired = matches!(&self.slot, Some(slot) if now >= slot.deadline);
        if expired {
            if let Some(slot) = self.slot.take() {
                info!(
                    "event=undo_expire module=undo status=ok ticket={} trigger=deadline",
                    slot.ticket.0
                );
            }
        }
        expired
    }

    /// Returns the live snapshot, if any, without consuming it.
    pub fn pending(&self, now: Instant) -> Option<&PendingUndo> {
        self.live_slot(now).map(|slot| &slot.pending)
    }

    /// Returns the ticket of the live snapshot, if any.
    pub fn current_ticket(&self, now: Instant) -> Option<UndoTicket> {
        self.live_slot(now).map(|slot| slot.ticket)
    }

    /// Time left before the live snapshot expires.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.live_slot(now)
            .map(|slot| slot.deadline.saturating_duration_since(now))
    }

    pub fn is_armed(&self, now: Instant) -> bool {
        self.live_slot(now).is_some()
    }

    /// Drops the slot without running any reversal.
    pub fn clear(&mut self) {
        self.slot = None;
    }

    fn live_slot(&self, now: Instant) -> Option<&ArmedSlot> {
        self.slot.as_ref().filter(|slot| now < slot.deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::{PendingUndo, UndoController, UndoNotice, UNDO_WINDOW};
    use crate::model::item::{ItemKind, ItemSnapshot};
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    fn credit(points: i64) -> PendingUndo {
        PendingUndo::Credit {
            points,
            log_entry_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn idle_controller_has_nothing_to_undo() {
        let mut undo = UndoController::default();
        let now = Instant::now();
        assert!(!undo.is_armed(now));
        assert_eq!(undo.take(now), None);
    }

    #[test]
    fn take_within_window_returns_snapshot_once() {
        let mut undo = UndoController::default();
        let start = Instant::now();
        let pending = credit(10);
        undo.arm(pending.clone(), start);

        let now = start + Duration::from_millis(3_999);
        assert_eq!(undo.remaining(now), Some(Duration::from_millis(1)));
        assert_eq!(undo.take(now), Some(pending));
        assert_eq!(undo.take(now), None);
    }

    #[test]
    fn take_after_window_has_no_effect() {
        let mut undo = UndoController::default();
        let start = Instant::now();
        undo.arm(credit(10), start);

        assert_eq!(undo.take(start + UNDO_WINDOW), None);
        assert!(!undo.is_armed(start));
    }

    #[test]
    fn rearm_replaces_snapshot_and_only_second_is_reversible() {
        let mut undo = UndoController::default();
        let start = Instant::now();
        let first = undo.arm(credit(10), start);
        let second_pending = credit(25);
        let second = undo.arm(second_pending.clone(), start + Duration::from_secs(1));
        assert_ne!(first, second);

        // Still inside the second window even though the first one has ended.
        let now = start + Duration::from_millis(4_500);
        assert_eq!(undo.take(now), Some(second_pending));
        assert_eq!(undo.take(now), None);
    }

    #[test]
    fn stale_expiry_callback_is_ignored() {
        let mut undo = UndoController::default();
        let start = Instant::now();
        let first = undo.arm(credit(1), start);
        let second = undo.arm(credit(2), start);

        assert!(!undo.expire(first));
        assert!(undo.is_armed(start));
        assert!(undo.expire(second));
        assert!(!undo.is_armed(start));
        assert!(!undo.expire(second));
    }

    #[test]
    fn tick_clears_only_after_deadline() {
        let mut undo = UndoController::new(Duration::from_millis(100));
        let start = Instant::now();
        undo.arm(credit(3), start);

        assert!(!undo.tick(start + Duration::from_millis(99)));
        assert!(undo.is_armed(start + Duration::from_millis(99)));
        assert!(undo.tick(start + Duration::from_millis(100)));
        assert!(!undo.tick(start + Duration::from_millis(200)));
    }

    #[test]
    fn deletion_snapshot_describes_item() {
        let pending = PendingUndo::ItemDeletion {
            snapshot: ItemSnapshot {
                kind: ItemKind::Reward,
                name: "Cake".to_string(),
                points: 300,
                sort_order: Some(1),
            },
        };
        assert_eq!(
            pending.describe(),
            UndoNotice::Deleted {
                item_kind: ItemKind::Reward,
                name: "Cake".to_string(),
            }
        );
        assert_eq!(credit(7).describe(), UndoNotice::Credit { points: 7 });
    }

    #[test]
    fn pending_undo_serializes_with_kind_tag() {
        let json = serde_json::to_value(credit(5)).unwrap();
        assert_eq!(json["kind"], "credit");
        assert_eq!(json["points"], 5);
    }
}
