//! Manual display ordering shared by irritants and rewards.
//!
//! # Responsibility
//! - Sort catalog items for display.
//! - Move one item inside the displayed list and renumber the whole list.
//! - Compute the order slot for newly created items.
//!
//! # Invariants
//! - Display order is `sort_order ASC` with missing orders last, then
//!   `created_at ASC`.
//! - After a successful move every item carries `sort_order == index`.

use std::cmp::Ordering;

/// Capability needed by the ordering algorithm.
pub trait Orderable {
    fn sort_order(&self) -> Option<i64>;
    fn set_sort_order(&mut self, sort_order: i64);
    /// Unix epoch milliseconds.
    fn created_at(&self) -> i64;
}

/// Compares two items by display position.
pub fn display_cmp<T: Orderable>(a: &T, b: &T) -> Ordering {
    let order_a = a.sort_order().unwrap_or(i64::MAX);
    let order_b = b.sort_order().unwrap_or(i64::MAX);
    order_a
        .cmp(&order_b)
        .then_with(|| a.created_at().cmp(&b.created_at()))
}

/// Sorts items in place into display order.
pub fn sort_for_display<T: Orderable>(items: &mut [T]) {
    items.sort_by(display_cmp);
}

/// Moves the item at `from` to `to` and renumbers every item.
///
/// Returns `false` without touching `items` when either index is out of
/// range.
pub fn move_item<T: Orderable>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    let len = items.len();
    if from >= len || to >= len {
        return false;
    }

    let moved = items.remove(from);
    items.insert(to, moved);
    for (index, item) in items.iter_mut().enumerate() {
        item.set_sort_order(index as i64);
    }
    true
}

/// Returns the order slot that places a new item after all existing ones.
pub fn next_sort_order<'a, T: Orderable + 'a>(items: impl IntoIterator<Item = &'a T>) -> i64 {
    items
        .into_iter()
        .filter_map(|item| item.sort_order())
        .max()
        .unwrap_or(-1)
        + 1
}
