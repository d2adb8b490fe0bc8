//! Ledger configuration and database path resolution.

use crate::service::retention::DEFAULT_RETENTION_MONTHS;
use crate::service::undo::UNDO_WINDOW;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the ledger database location.
pub const DB_PATH_ENV: &str = "YANAKOTO_DB_PATH";

const DEFAULT_DB_FILE_NAME: &str = "yanakoto.sqlite3";

/// Tunables for one ledger session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How long the latest credit or deletion stays undoable.
    pub undo_window: Duration,
    /// Point log entries older than this many calendar months are pruned at
    /// startup.
    pub retention_months: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            undo_window: UNDO_WINDOW,
            retention_months: DEFAULT_RETENTION_MONTHS,
        }
    }
}

impl LedgerConfig {
    pub fn with_undo_window(mut self, undo_window: Duration) -> Self {
        self.undo_window = undo_window;
        self
    }

    pub fn with_retention_months(mut self, retention_months: u32) -> Self {
        self.retention_months = retention_months;
        self
    }
}

/// Resolves the database path.
///
/// Precedence: non-blank `explicit`, then non-blank `YANAKOTO_DB_PATH`, then
/// `<temp_dir>/yanakoto.sqlite3`.
pub fn resolve_db_path(explicit: Option<&str>) -> PathBuf {
    let from_env = std::env::var(DB_PATH_ENV).ok();
    resolve_db_path_with(explicit, from_env.as_deref())
}

fn resolve_db_path_with(explicit: Option<&str>, from_env: Option<&str>) -> PathBuf {
    [explicit, from_env]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
}
