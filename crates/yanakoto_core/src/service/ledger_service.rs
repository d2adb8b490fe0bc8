//! Ledger use-case service: credits, redemptions and reversals.
//!
//! # Responsibility
//! - Apply balance arithmetic and write the matching point log entry.
//! - Reverse a credit (undo) or any log entry (history view).
//!
//! # Invariants
//! - Balance update and log write are two separate commits; the balance is
//!   written first.
//! - Redemption requires `current_balance >= required_points` and a cost in
//!   `1..=MAX_ITEM_POINTS`.
//! - A credit reversal still applies when its log entry cannot be removed.

use crate::model::balance::UserStats;
use crate::model::item::{validate_points, Irritant, Reward, ValidationError};
use crate::model::point_log::{PointLogEntry, PointLogId};
use crate::repo::point_log_repo::PointLogRepository;
use crate::repo::stats_repo::StatsRepository;
use crate::repo::RepoError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service-level error for ledger and catalog use-cases.
#[derive(Debug)]
pub enum LedgerError {
    /// Input rejected before any state change.
    Validation(ValidationError),
    /// Reward costs more than the current balance.
    InsufficientPoints { required: i64, available: i64 },
    /// History reversal target does not exist.
    EntryNotFound(PointLogId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InsufficientPoints {
                required,
                available,
            } => write!(
                f,
                "insufficient points: required {required}, available {available}"
            ),
            Self::EntryNotFound(id) => write!(f, "point log entry not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::InsufficientPoints { .. } | Self::EntryNotFound(_) => None,
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl LedgerError {
    /// Returns whether this is a silent input rejection rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::InsufficientPoints { .. }
                | Self::EntryNotFound(_)
                | Self::Repo(RepoError::NotFound(_))
        )
    }
}

/// Result of crediting one irritant tap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditReceipt {
    pub points: i64,
    pub log_entry_id: PointLogId,
    pub balance: UserStats,
}

/// Result of a successful redemption; the presentation layer celebrates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    pub reward_name: String,
    pub points: i64,
    pub log_entry_id: PointLogId,
    pub balance: UserStats,
}

/// Result of reversing a credit through undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditReversal {
    pub balance: UserStats,
    /// `false` when the log entry was missing or could not be deleted.
    pub log_entry_removed: bool,
}

/// Ledger service facade over balance and log repositories.
pub struct LedgerService<S: StatsRepository, L: PointLogRepository> {
    stats: S,
    logs: L,
}

impl<S: StatsRepository, L: PointLogRepository> LedgerService<S, L> {
    pub fn new(stats: S, logs: L) -> Self {
        Self { stats, logs }
    }

    /// Loads the balance, creating it on first access.
    pub fn balance(&self) -> Result<UserStats, LedgerError> {
        Ok(self.stats.load_or_create()?)
    }

    /// Credits an irritant's point value and logs the tap.
    pub fn credit_irritant(
        &self,
        irritant: &Irritant,
        now_ms: i64,
    ) -> Result<CreditReceipt, LedgerError> {
        let points = validate_points(irritant.point_value)?;

        let mut balance = self.stats.load_or_create()?;
        balance.credit(points);
        self.stats.save(&balance)?;

        let entry = PointLogEntry::credit(irritant.name.as_str(), points, now_ms);
        let log_entry_id = self.logs.append_entry(&entry)?;

        info!(
            "event=ledger_credit module=ledger status=ok points={} current={} lifetime={}",
            points, balance.current_balance, balance.lifetime_total
        );
        Ok(CreditReceipt {
            points,
            log_entry_id,
            balance,
        })
    }

    /// Exchanges points for `reward` when the balance covers its cost.
    pub fn redeem(&self, reward: &Reward, now_ms: i64) -> Result<RedemptionReceipt, LedgerError> {
        let points = validate_points(reward.required_points)?;

        let mut balance = self.stats.load_or_create()?;
        if !balance.can_afford(points) {
            return Err(LedgerError::InsufficientPoints {
                required: points,
                available: balance.current_balance,
            });
        }
        balance.debit(points);
        self.stats.save(&balance)?;

        let entry = PointLogEntry::redemption(reward.name.as_str(), points, now_ms);
        let log_entry_id = self.logs.append_entry(&entry)?;

        info!(
            "event=ledger_redeem module=ledger status=ok points={} current={}",
            points, balance.current_balance
        );
        Ok(RedemptionReceipt {
            reward_name: reward.name.clone(),
            points,
            log_entry_id,
            balance,
        })
    }

    /// Reverses a credit and removes its log entry on a best-effort basis.
    pub fn reverse_credit(
        &self,
        points: i64,
        log_entry_id: PointLogId,
    ) -> Result<CreditReversal, LedgerError> {
        let mut balance = self.stats.load_or_create()?;
        balance.reverse_credit(points);
        self.stats.save(&balance)?;

        let log_entry_removed = match self.logs.delete_entry(log_entry_id) {
            Ok(removed) => removed,
            Err(err) => {
                warn!(
                    "event=ledger_reverse module=ledger status=degraded source=undo error_code=log_delete_failed error={}",
                    err
                );
                false
            }
        };

        info!(
            "event=ledger_reverse module=ledger status=ok source=undo points={} log_entry_removed={}",
            points, log_entry_removed
        );
        Ok(CreditReversal {
            balance,
            log_entry_removed,
        })
    }

    /// Reverts the balance effect of one log entry and deletes the entry.
    pub fn reverse_log_entry(&self, entry_id: PointLogId) -> Result<UserStats, LedgerError> {
        let entry = self
            .logs
            .get_entry(entry_id)?
            .ok_or(LedgerError::EntryNotFound(entry_id))?;

        let mut balance = self.stats.load_or_create()?;
        balance.reverse_entry(&entry);
        self.stats.save(&balance)?;
        self.logs.delete_entry(entry_id)?;

        info!(
            "event=ledger_reverse module=ledger status=ok source=history is_redemption={} point_delta={}",
            entry.is_redemption, entry.point_delta
        );
        Ok(balance)
    }

    /// Lists every log entry, newest first.
    pub fn history(&self) -> Result<Vec<PointLogEntry>, LedgerError> {
        Ok(self.logs.list_entries()?)
    }
}
