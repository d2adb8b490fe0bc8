//! Ledger session: the operation surface handed to the presentation layer.
//!
//! # Responsibility
//! - Own the store connection, the clock and the single undo slot.
//! - Arm the undo slot on credits and deletions, and run the matching
//!   reversal when undo is invoked.
//! - Absorb every non-fatal failure: validation rejections are silent no-ops,
//!   store failures are logged and swallowed.
//!
//! # Invariants
//! - Opening the store is the only operation that returns an error.
//! - Redemptions never arm the undo slot.
//! - The undo slot never owns live data; it only keeps enough to re-create
//!   or reverse.

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::balance::UserStats;
use crate::model::item::{CatalogItem, Irritant, ItemId, ItemKind, ItemSnapshot, Reward};
use crate::model::point_log::PointLogId;
use crate::repo::item_repo::SqliteCatalogRepository;
use crate::repo::point_log_repo::SqlitePointLogRepository;
use crate::repo::stats_repo::SqliteStatsRepository;
use crate::service::catalog_service::{reward_progress, CatalogService, RewardProgress};
use crate::service::history::{group_by_day, DayGroup};
use crate::service::ledger_service::{LedgerError, LedgerService, RedemptionReceipt};
use crate::service::retention::{prune_older_than, prune_older_than_months};
use crate::service::undo::{PendingUndo, UndoController, UndoNotice, UndoTicket};
use chrono::FixedOffset;
use log::{debug, error};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

type IrritantService<'conn> = CatalogService<Irritant, SqliteCatalogRepository<'conn, Irritant>>;
type RewardService<'conn> = CatalogService<Reward, SqliteCatalogRepository<'conn, Reward>>;
type SqliteLedgerService<'conn> =
    LedgerService<SqliteStatsRepository<'conn>, SqlitePointLogRepository<'conn>>;

/// Outcome of tapping an irritant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapOutcome {
    pub points: i64,
    pub balance: UserStats,
    /// Ticket a presentation timer passes back to `expire_undo`.
    pub undo_ticket: UndoTicket,
}

/// Outcome of a redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RedeemOutcome {
    /// Points were spent; the presentation layer shows its celebration.
    Redeemed(RedemptionReceipt),
    /// Nothing changed.
    Rejected,
}

/// What an explicit undo reversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UndoOutcome {
    CreditReversed {
        points: i64,
        balance: UserStats,
        log_entry_removed: bool,
    },
    ItemRestored {
        item_kind: ItemKind,
        item_id: ItemId,
        name: String,
    },
}

/// Presentation-facing ledger facade.
pub struct LedgerSession {
    conn: Connection,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    undo: UndoController,
    last_balance: UserStats,
}

impl LedgerSession {
    /// Opens (or creates) the ledger database at `path`.
    ///
    /// # Errors
    /// - Returns the store error when the database cannot be opened or
    ///   migrated. Callers treat this as fatal.
    pub fn open(path: impl AsRef<Path>, config: LedgerConfig) -> DbResult<Self> {
        let conn = open_db(path)?;
        Ok(Self::with_connection(conn, Arc::new(SystemClock), config))
    }

    /// Opens a throwaway in-memory ledger.
    pub fn open_in_memory(config: LedgerConfig) -> DbResult<Self> {
        let conn = open_db_in_memory()?;
        Ok(Self::with_connection(conn, Arc::new(SystemClock), config))
    }

    /// Builds a session from a migrated connection and explicit clock.
    pub fn with_connection(conn: Connection, clock: Arc<dyn Clock>, config: LedgerConfig) -> Self {
        Self {
            conn,
            clock,
            undo: UndoController::new(config.undo_window),
            config,
            last_balance: UserStats::default(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Direct access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ----- startup -------------------------------------------------------

    /// Prunes log entries older than the configured retention horizon.
    ///
    /// Meant to run once per process start. Failures are logged only.
    pub fn run_startup_maintenance(&mut self) -> usize {
        let now_ms = self.clock.now_ms();
        let months = self.config.retention_months;
        let result = SqlitePointLogRepository::try_new(&self.conn)
            .and_then(|logs| prune_older_than_months(&logs, now_ms, months));
        match result {
            Ok(removed) => removed,
            Err(err) => {
                error!(
                    "event=retention_prune module=session status=error error_code=prune_failed error={}",
                    err
                );
                0
            }
        }
    }

    /// Prunes log entries older than `horizon`; returns how many were removed.
    pub fn prune_older_than(&mut self, horizon: Duration) -> usize {
        let now_ms = self.clock.now_ms();
        let result = SqlitePointLogRepository::try_new(&self.conn)
            .and_then(|logs| prune_older_than(&logs, now_ms, horizon));
        match result {
            Ok(removed) => removed,
            Err(err) => {
                error!(
                    "event=retention_prune module=session status=error error_code=prune_failed error={}",
                    err
                );
                0
            }
        }
    }

    /// Ensures the balance exists and optionally seeds the first irritant at
    /// order slot 0.
    pub fn complete_onboarding(&mut self, first_irritant: Option<(&str, i64)>) -> UserStats {
        let balance = self.balance();
        if let Some((name, points)) = first_irritant {
            let now_ms = self.clock.now_ms();
            let result = self
                .irritant_service()
                .and_then(|service| service.insert(name, points, Some(0), now_ms));
            absorb("onboarding", result);
        }
        balance
    }

    // ----- balance & history ---------------------------------------------

    /// Current balance; the last known value when the store cannot be read.
    pub fn balance(&mut self) -> UserStats {
        let result = self.ledger_service().and_then(|ledger| ledger.balance());
        if let Some(balance) = absorb("balance", result) {
            self.last_balance = balance;
        }
        self.last_balance
    }

    /// History grouped by calendar day in `offset`, newest day first.
    pub fn history(&self, offset: FixedOffset) -> Vec<DayGroup> {
        let result = self.ledger_service().and_then(|ledger| ledger.history());
        absorb("history", result)
            .map(|entries| group_by_day(entries, offset))
            .unwrap_or_default()
    }

    /// Reverses one history entry and deletes it. Not undoable.
    pub fn reverse_history_entry(&mut self, entry_id: PointLogId) -> UserStats {
        let result = self
            .ledger_service()
            .and_then(|ledger| ledger.reverse_log_entry(entry_id));
        match absorb("reverse_history_entry", result) {
            Some(balance) => {
                self.last_balance = balance;
                balance
            }
            None => self.balance(),
        }
    }

    // ----- irritants -----------------------------------------------------

    pub fn irritants(&self) -> Vec<Irritant> {
        let result = self.irritant_service().and_then(|service| service.list());
        absorb("list_irritants", result).unwrap_or_default()
    }

    pub fn create_irritant(&mut self, name: &str, point_value: i64) -> Option<Irritant> {
        let now_ms = self.clock.now_ms();
        let result = self
            .irritant_service()
            .and_then(|service| service.create(name, point_value, now_ms));
        absorb("create_irritant", result)
    }

    pub fn update_irritant(&mut self, id: ItemId, name: &str, point_value: i64) -> Option<Irritant> {
        let result = self
            .irritant_service()
            .and_then(|service| service.update(id, name, point_value));
        absorb("update_irritant", result)
    }

    /// Reorders the displayed irritant list; returns the list as displayed
    /// afterwards.
    pub fn move_irritant(&mut self, from: usize, to: usize) -> Vec<Irritant> {
        let result = self
            .irritant_service()
            .and_then(|service| service.move_item(from, to));
        match absorb("move_irritant", result) {
            Some(items) => items,
            None => self.irritants(),
        }
    }

    /// Credits the irritant's point value, logs it and arms undo.
    pub fn tap_irritant(&mut self, id: ItemId) -> Option<TapOutcome> {
        let now_ms = self.clock.now_ms();
        let result = self.irritant_service().and_then(|service| service.get(id));
        let Some(irritant) = absorb("tap_irritant", result).flatten() else {
            debug!("event=ledger_credit module=session status=skipped reason=irritant_missing");
            return None;
        };

        let result = self
            .ledger_service()
            .and_then(|ledger| ledger.credit_irritant(&irritant, now_ms));
        let receipt = absorb("tap_irritant", result)?;
        self.last_balance = receipt.balance;

        let undo_ticket = self.undo.arm(
            PendingUndo::Credit {
                points: receipt.points,
                log_entry_id: receipt.log_entry_id,
            },
            self.clock.monotonic_now(),
        );
        Some(TapOutcome {
            points: receipt.points,
            balance: receipt.balance,
            undo_ticket,
        })
    }

    /// Deletes an irritant and arms undo with its snapshot.
    pub fn delete_irritant(&mut self, id: ItemId) -> Option<UndoTicket> {
        let result = self.irritant_service().and_then(|service| service.delete(id));
        let snapshot = absorb("delete_irritant", result)?;
        Some(self.arm_deletion(snapshot))
    }

    // ----- rewards -------------------------------------------------------

    pub fn rewards(&self) -> Vec<Reward> {
        let result = self.reward_service().and_then(|service| service.list());
        absorb("list_rewards", result).unwrap_or_default()
    }

    /// Rewards in display order with progress against the current balance.
    pub fn reward_progress(&mut self) -> Vec<RewardProgress> {
        let balance = self.balance();
        reward_progress(self.rewards(), &balance)
    }

    pub fn create_reward(&mut self, name: &str, required_points: i64) -> Option<Reward> {
        let now_ms = self.clock.now_ms();
        let result = self
            .reward_service()
            .and_then(|service| service.create(name, required_points, now_ms));
        absorb("create_reward", result)
    }

    pub fn update_reward(&mut self, id: ItemId, name: &str, required_points: i64) -> Option<Reward> {
        let result = self
            .reward_service()
            .and_then(|service| service.update(id, name, required_points));
        absorb("update_reward", result)
    }

    pub fn move_reward(&mut self, from: usize, to: usize) -> Vec<Reward> {
        let result = self
            .reward_service()
            .and_then(|service| service.move_item(from, to));
        match absorb("move_reward", result) {
            Some(items) => items,
            None => self.rewards(),
        }
    }

    /// Spends points on a reward. Does not touch the undo slot.
    pub fn redeem_reward(&mut self, id: ItemId) -> RedeemOutcome {
        let now_ms = self.clock.now_ms();
        let result = self.reward_service().and_then(|service| service.get(id));
        let Some(reward) = absorb("redeem_reward", result).flatten() else {
            debug!("event=ledger_redeem module=session status=skipped reason=reward_missing");
            return RedeemOutcome::Rejected;
        };

        let result = self
            .ledger_service()
            .and_then(|ledger| ledger.redeem(&reward, now_ms));
        match absorb("redeem_reward", result) {
            Some(receipt) => {
                self.last_balance = receipt.balance;
                RedeemOutcome::Redeemed(receipt)
            }
            None => RedeemOutcome::Rejected,
        }
    }

    /// Deletes a reward and arms undo with its snapshot.
    pub fn delete_reward(&mut self, id: ItemId) -> Option<UndoTicket> {
        let result = self.reward_service().and_then(|service| service.delete(id));
        let snapshot = absorb("delete_reward", result)?;
        Some(self.arm_deletion(snapshot))
    }

    // ----- undo ----------------------------------------------------------

    /// What the undo affordance should show, if anything.
    pub fn pending_undo(&mut self) -> Option<UndoNotice> {
        let now = self.clock.monotonic_now();
        self.undo.tick(now);
        self.undo.pending(now).map(PendingUndo::describe)
    }

    /// Time left in the current undo window.
    pub fn undo_remaining(&self) -> Option<Duration> {
        self.undo.remaining(self.clock.monotonic_now())
    }

    /// Clears an expired undo slot. Returns whether it expired now.
    pub fn tick(&mut self) -> bool {
        self.undo.tick(self.clock.monotonic_now())
    }

    /// Expiry callback from a presentation timer scheduled at arm time.
    pub fn expire_undo(&mut self, ticket: UndoTicket) -> bool {
        self.undo.expire(ticket)
    }

    /// Reverses the most recent credit or deletion if still inside the
    /// window.
    pub fn undo(&mut self) -> Option<UndoOutcome> {
        let pending = self.undo.take(self.clock.monotonic_now())?;
        match pending {
            PendingUndo::Credit {
                points,
                log_entry_id,
            } => {
                let result = self
                    .ledger_service()
                    .and_then(|ledger| ledger.reverse_credit(points, log_entry_id));
                let reversal = absorb("undo_credit", result)?;
                self.last_balance = reversal.balance;
                Some(UndoOutcome::CreditReversed {
                    points,
                    balance: reversal.balance,
                    log_entry_removed: reversal.log_entry_removed,
                })
            }
            PendingUndo::ItemDeletion { snapshot } => {
                let now_ms = self.clock.now_ms();
                let restored = match snapshot.kind {
                    ItemKind::Irritant => {
                        let result = self
                            .irritant_service()
                            .and_then(|service| service.restore(&snapshot, now_ms));
                        absorb("undo_delete", result).map(|item| item.id())
                    }
                    ItemKind::Reward => {
                        let result = self
                            .reward_service()
                            .and_then(|service| service.restore(&snapshot, now_ms));
                        absorb("undo_delete", result).map(|item| item.id())
                    }
                }?;
                Some(UndoOutcome::ItemRestored {
                    item_kind: snapshot.kind,
                    item_id: restored,
                    name: snapshot.name,
                })
            }
        }
    }

    fn arm_deletion(&mut self, snapshot: ItemSnapshot) -> UndoTicket {
        self.undo.arm(
            PendingUndo::ItemDeletion { snapshot },
            self.clock.monotonic_now(),
        )
    }

    fn irritant_service(&self) -> Result<IrritantService<'_>, LedgerError> {
        Ok(CatalogService::new(SqliteCatalogRepository::try_new(
            &self.conn,
        )?))
    }

    fn reward_service(&self) -> Result<RewardService<'_>, LedgerError> {
        Ok(CatalogService::new(SqliteCatalogRepository::try_new(
            &self.conn,
        )?))
    }

    fn ledger_service(&self) -> Result<SqliteLedgerService<'_>, LedgerError> {
        Ok(LedgerService::new(
            SqliteStatsRepository::try_new(&self.conn)?,
            SqlitePointLogRepository::try_new(&self.conn)?,
        ))
    }
}

/// Turns a service result into an optional value, logging the failure.
fn absorb<T>(operation: &'static str, result: Result<T, LedgerError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) if err.is_rejection() => {
            debug!(
                "event=ledger_op module=session status=rejected op={} reason={}",
                operation, err
            );
            None
        }
        Err(err) => {
            error!(
                "event=ledger_op module=session status=error op={} error={}",
                operation, err
            );
            None
        }
    }
}
