//! Balance aggregate repository.
//!
//! # Invariants
//! - `user_stats` holds at most one row (`id = 1`, enforced by CHECK).
//! - The row is created lazily with zero totals on first access.

use crate::model::balance::UserStats;
use crate::repo::{ensure_connection_ready, RepoResult};
use rusqlite::{params, Connection};

/// Repository interface for the singleton balance record.
pub trait StatsRepository {
    /// Loads the balance, inserting `{0, 0}` when none exists yet.
    fn load_or_create(&self) -> RepoResult<UserStats>;
    fn save(&self, stats: &UserStats) -> RepoResult<()>;
}

/// SQLite-backed balance repository.
pub struct SqliteStatsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStatsRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "user_stats")?;
        Ok(Self { conn })
    }
}

impl StatsRepository for SqliteStatsRepository<'_> {
    fn load_or_create(&self) -> RepoResult<UserStats> {
        self.conn.execute(
            "INSERT OR IGNORE INTO user_stats (id, lifetime_total, current_balance)
             VALUES (1, 0, 0);",
            [],
        )?;
        let stats = self.conn.query_row(
            "SELECT lifetime_total, current_balance FROM user_stats WHERE id = 1;",
            [],
            |row| Ok(UserStats::new(row.get(0)?, row.get(1)?)),
        )?;
        Ok(stats)
    }

    fn save(&self, stats: &UserStats) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO user_stats (id, lifetime_total, current_balance)
             VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                lifetime_total = excluded.lifetime_total,
                current_balance = excluded.current_balance;",
            params![stats.lifetime_total, stats.current_balance],
        )?;
        Ok(())
    }
}
