//! Catalog use-case service shared by irritants and rewards.
//!
//! # Responsibility
//! - Create, edit, list, reorder and delete catalog items.
//! - Re-create deleted items from undo snapshots.
//!
//! # Invariants
//! - New items are placed after every ordered item
//!   (`max(sort_order) + 1`, starting at 0).
//! - A move renumbers the whole displayed list to `0..n`.
//! - Edits never touch `sort_order` or `created_at`.

use crate::model::balance::UserStats;
use crate::model::item::{
    normalize_name, validate_points, CatalogItem, ItemId, ItemSnapshot, Reward, ValidationError,
};
use crate::model::ordering::{move_item, sort_for_display};
use crate::repo::item_repo::CatalogRepository;
use crate::repo::RepoError;
use crate::service::ledger_service::LedgerError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use uuid::Uuid;

/// Catalog service facade over one repository implementation.
pub struct CatalogService<T: CatalogItem, R: CatalogRepository<T>> {
    repo: R,
    _item: PhantomData<fn() -> T>,
}

impl<T: CatalogItem, R: CatalogRepository<T>> CatalogService<T, R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            _item: PhantomData,
        }
    }

    /// Creates one item at the end of the display order.
    pub fn create(&self, name: &str, points: i64, now_ms: i64) -> Result<T, LedgerError> {
        let sort_order = self.repo.next_sort_order()?;
        self.insert(name, points, Some(sort_order), now_ms)
    }

    /// Creates one item at an explicit order slot (or unordered).
    pub fn insert(
        &self,
        name: &str,
        points: i64,
        sort_order: Option<i64>,
        now_ms: i64,
    ) -> Result<T, LedgerError> {
        let name = normalize_name(name)?;
        let points = validate_points(points)?;
        let item = T::from_parts(Uuid::new_v4(), name, points, now_ms, sort_order);
        self.repo.create_item(&item)?;

        info!(
            "event=catalog_create module=catalog status=ok kind={} sort_order={:?}",
            T::KIND.as_str(),
            sort_order
        );
        Ok(item)
    }

    /// Replaces name and point value of an existing item.
    pub fn update(&self, id: ItemId, name: &str, points: i64) -> Result<T, LedgerError> {
        let name = normalize_name(name)?;
        let points = validate_points(points)?;
        let current = self
            .repo
            .get_item(id)?
            .ok_or(LedgerError::Repo(RepoError::NotFound(id)))?;

        let updated = T::from_parts(
            id,
            name,
            points,
            current.created_at(),
            current.sort_order(),
        );
        self.repo.update_item(&updated)?;
        Ok(updated)
    }

    pub fn get(&self, id: ItemId) -> Result<Option<T>, LedgerError> {
        Ok(self.repo.get_item(id)?)
    }

    /// Lists items in display order.
    pub fn list(&self) -> Result<Vec<T>, LedgerError> {
        let mut items = self.repo.list_items()?;
        sort_for_display(&mut items);
        Ok(items)
    }

    /// Moves the displayed item at `from` to `to` and persists the new order.
    ///
    /// Returns the list in its new display order.
    pub fn move_item(&self, from: usize, to: usize) -> Result<Vec<T>, LedgerError> {
        let mut items = self.list()?;
        let len = items.len();
        if !move_item(&mut items, from, to) {
            return Err(ValidationError::IndexOutOfRange { from, to, len }.into());
        }

        let ids: Vec<ItemId> = items.iter().map(|item| item.id()).collect();
        self.repo.apply_sort_orders(&ids)?;

        info!(
            "event=catalog_move module=catalog status=ok kind={} from={} to={} len={}",
            T::KIND.as_str(),
            from,
            to,
            len
        );
        Ok(items)
    }

    /// Deletes one item and returns the snapshot needed to restore it.
    pub fn delete(&self, id: ItemId) -> Result<ItemSnapshot, LedgerError> {
        let item = self
            .repo
            .get_item(id)?
            .ok_or(LedgerError::Repo(RepoError::NotFound(id)))?;
        self.repo.delete_item(id)?;

        info!(
            "event=catalog_delete module=catalog status=ok kind={}",
            T::KIND.as_str()
        );
        Ok(item.snapshot())
    }

    /// Re-creates a deleted item under a new identity at its prior order.
    pub fn restore(&self, snapshot: &ItemSnapshot, now_ms: i64) -> Result<T, LedgerError> {
        if snapshot.kind != T::KIND {
            warn!(
                "event=catalog_restore module=catalog status=error error_code=kind_mismatch expected={} got={}",
                T::KIND.as_str(),
                snapshot.kind.as_str()
            );
            return Err(LedgerError::Repo(RepoError::InvalidData(format!(
                "snapshot kind `{}` cannot be restored as `{}`",
                snapshot.kind.as_str(),
                T::KIND.as_str()
            ))));
        }

        let item = T::from_snapshot(snapshot, now_ms);
        self.repo.create_item(&item)?;
        info!(
            "event=catalog_restore module=catalog status=ok kind={} sort_order={:?}",
            T::KIND.as_str(),
            snapshot.sort_order
        );
        Ok(item)
    }
}

/// How close the balance is to paying for one reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardProgress {
    pub reward: Reward,
    /// `current_balance / required_points`, capped at `1.0`.
    pub progress: f64,
    pub redeemable: bool,
}

/// Pairs each reward with its progress against `balance`.
pub fn reward_progress(rewards: Vec<Reward>, balance: &UserStats) -> Vec<RewardProgress> {
    rewards
        .into_iter()
        .map(|reward| {
            let progress = if reward.required_points > 0 {
                (balance.current_balance as f64 / reward.required_points as f64).min(1.0)
            } else {
                0.0
            };
            let redeemable = balance.can_afford(reward.required_points);
            RewardProgress {
                reward,
                progress,
                redeemable,
            }
        })
        .collect()
}
