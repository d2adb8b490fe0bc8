//! Domain model for the points ledger.
//!
//! # Responsibility
//! - Define the records persisted by the ledger store: balance aggregate,
//!   catalog items (irritants, rewards) and point log entries.
//! - Keep the clamp/saturation arithmetic of the balance in one place.
//!
//! # Invariants
//! - Every catalog item and log entry is identified by a stable UUID.
//! - Balance fields never go negative.

pub mod balance;
pub mod item;
pub mod ordering;
pub mod point_log;
