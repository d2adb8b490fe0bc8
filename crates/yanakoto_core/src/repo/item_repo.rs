//! Catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist irritants and rewards through one generic implementation.
//! - Keep manual ordering writes (`sort_order`) inside the repository.
//!
//! # Invariants
//! - Write paths validate name and point value before SQL mutations.
//! - Listing is deterministic: `sort_order ASC` (NULL last), then
//!   `created_at ASC, uuid ASC`.
//! - Renumbering runs in one immediate transaction.

use crate::model::item::{normalize_name, validate_points, CatalogItem, ItemId, ItemKind};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::marker::PhantomData;

/// Repository interface for one catalog (irritants or rewards).
pub trait CatalogRepository<T: CatalogItem> {
    /// Inserts one item and returns its id.
    fn create_item(&self, item: &T) -> RepoResult<ItemId>;
    /// Replaces name and point value; order and creation time are kept.
    fn update_item(&self, item: &T) -> RepoResult<()>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<T>>;
    /// Lists every item in display order.
    fn list_items(&self) -> RepoResult<Vec<T>>;
    /// Hard-deletes one item.
    fn delete_item(&self, id: ItemId) -> RepoResult<()>;
    /// Returns `max(sort_order) + 1`, or `0` when no item has an order.
    fn next_sort_order(&self) -> RepoResult<i64>;
    /// Writes `sort_order = index` for every id in `ordered_ids`.
    fn apply_sort_orders(&self, ordered_ids: &[ItemId]) -> RepoResult<()>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn, T> {
    conn: &'conn Connection,
    _item: PhantomData<fn() -> T>,
}

impl<'conn, T: CatalogItem> SqliteCatalogRepository<'conn, T> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, table_name(T::KIND))?;
        Ok(Self {
            conn,
            _item: PhantomData,
        })
    }

    fn select_sql(suffix: &str) -> String {
        format!(
            "SELECT
                uuid,
                name,
                {points} AS points,
                created_at,
                sort_order
             FROM {table}
             {suffix}",
            points = points_column(T::KIND),
            table = table_name(T::KIND),
        )
    }
}

impl<T: CatalogItem> CatalogRepository<T> for SqliteCatalogRepository<'_, T> {
    fn create_item(&self, item: &T) -> RepoResult<ItemId> {
        let name = normalize_name(item.name())?;
        let points = validate_points(item.points())?;

        self.conn.execute(
            &format!(
                "INSERT INTO {table} (uuid, name, {points_col}, created_at, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                table = table_name(T::KIND),
                points_col = points_column(T::KIND),
            ),
            params![
                item.id().to_string(),
                name,
                points,
                item.created_at(),
                item.sort_order(),
            ],
        )?;
        Ok(item.id())
    }

    fn update_item(&self, item: &T) -> RepoResult<()> {
        let name = normalize_name(item.name())?;
        let points = validate_points(item.points())?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE {table}
                 SET name = ?2,
                     {points_col} = ?3
                 WHERE uuid = ?1;",
                table = table_name(T::KIND),
                points_col = points_column(T::KIND),
            ),
            params![item.id().to_string(), name, points],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(item.id()));
        }
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<T>> {
        let mut stmt = self.conn.prepare(&Self::select_sql("WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn list_items(&self) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(&Self::select_sql(
            "ORDER BY sort_order IS NULL ASC, sort_order ASC, created_at ASC, uuid ASC;",
        ))?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE uuid = ?1;", table_name(T::KIND)),
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn next_sort_order(&self) -> RepoResult<i64> {
        let next = self.conn.query_row(
            &format!(
                "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM {};",
                table_name(T::KIND)
            ),
            [],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    fn apply_sort_orders(&self, ordered_ids: &[ItemId]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let sql = format!(
            "UPDATE {} SET sort_order = ?2 WHERE uuid = ?1;",
            table_name(T::KIND)
        );
        for (index, id) in ordered_ids.iter().enumerate() {
            let changed = tx.execute(&sql, params![id.to_string(), index as i64])?;
            if changed == 0 {
                // Dropping `tx` rolls back the partial renumbering.
                return Err(RepoError::NotFound(*id));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_item_row<T: CatalogItem>(row: &Row<'_>) -> RepoResult<T> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, table_name(T::KIND))?;
    Ok(T::from_parts(
        uuid,
        row.get("name")?,
        row.get("points")?,
        row.get("created_at")?,
        row.get("sort_order")?,
    ))
}

fn table_name(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Irritant => "irritants",
        ItemKind::Reward => "rewards",
    }
}

fn points_column(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Irritant => "point_value",
        ItemKind::Reward => "required_points",
    }
}
