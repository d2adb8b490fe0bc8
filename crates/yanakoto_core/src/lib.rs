//! Core ledger logic for Yanakoto.
//! This crate is the single source of truth for balance, log and catalog
//! invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{resolve_db_path, LedgerConfig, DB_PATH_ENV};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::balance::{UserStats, MAX_SAFE_POINTS};
pub use model::item::{
    CatalogItem, Irritant, ItemId, ItemKind, ItemSnapshot, Reward, ValidationError,
    MAX_ITEM_POINTS,
};
pub use model::point_log::{PointLogEntry, PointLogId};
pub use repo::{RepoError, RepoResult};
pub use service::catalog_service::RewardProgress;
pub use service::history::DayGroup;
pub use service::ledger_service::{LedgerError, RedemptionReceipt};
pub use service::undo::{PendingUndo, UndoController, UndoNotice, UndoTicket, UNDO_WINDOW};
pub use session::{LedgerSession, RedeemOutcome, TapOutcome, UndoOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
