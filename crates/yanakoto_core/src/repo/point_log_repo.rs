//! Point log repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append, look up, delete and prune point log entries.
//!
//! # Invariants
//! - Entries are never updated in place.
//! - Listing is reverse-chronological: `timestamp DESC, uuid ASC`.
//! - Deleting a missing entry is reported, not treated as an error.

use crate::model::point_log::{PointLogEntry, PointLogId};
use crate::repo::{bool_to_int, ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const POINT_LOG_SELECT_SQL: &str = "SELECT
    uuid,
    label,
    point_delta,
    timestamp,
    is_redemption
FROM point_logs";

/// Repository interface for the append-only point log.
pub trait PointLogRepository {
    fn append_entry(&self, entry: &PointLogEntry) -> RepoResult<PointLogId>;
    fn get_entry(&self, id: PointLogId) -> RepoResult<Option<PointLogEntry>>;
    /// Deletes one entry; returns `false` when it was already gone.
    fn delete_entry(&self, id: PointLogId) -> RepoResult<bool>;
    /// Lists all entries, newest first.
    fn list_entries(&self) -> RepoResult<Vec<PointLogEntry>>;
    /// Deletes entries with `timestamp < cutoff_ms`; returns the count.
    fn delete_older_than(&self, cutoff_ms: i64) -> RepoResult<usize>;
}

/// SQLite-backed point log repository.
pub struct SqlitePointLogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePointLogRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "point_logs")?;
        Ok(Self { conn })
    }
}

impl PointLogRepository for SqlitePointLogRepository<'_> {
    fn append_entry(&self, entry: &PointLogEntry) -> RepoResult<PointLogId> {
        self.conn.execute(
            "INSERT INTO point_logs (
                uuid,
                label,
                point_delta,
                timestamp,
                is_redemption
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                entry.uuid.to_string(),
                entry.label.as_str(),
                entry.point_delta,
                entry.timestamp,
                bool_to_int(entry.is_redemption),
            ],
        )?;
        Ok(entry.uuid)
    }

    fn get_entry(&self, id: PointLogId) -> RepoResult<Option<PointLogEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POINT_LOG_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_point_log_row(row)?));
        }
        Ok(None)
    }

    fn delete_entry(&self, id: PointLogId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM point_logs WHERE uuid = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn list_entries(&self) -> RepoResult<Vec<PointLogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{POINT_LOG_SELECT_SQL} ORDER BY timestamp DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_point_log_row(row)?);
        }
        Ok(entries)
    }

    fn delete_older_than(&self, cutoff_ms: i64) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM point_logs WHERE timestamp < ?1;", [cutoff_ms])?;
        Ok(removed)
    }
}

fn parse_point_log_row(row: &Row<'_>) -> RepoResult<PointLogEntry> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "point_logs.uuid")?;

    let is_redemption = match row.get::<_, i64>("is_redemption")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_redemption value `{other}` in point_logs.is_redemption"
            )));
        }
    };

    Ok(PointLogEntry {
        uuid,
        label: row.get("label")?,
        point_delta: row.get("point_delta")?,
        timestamp: row.get("timestamp")?,
        is_redemption,
    })
}
