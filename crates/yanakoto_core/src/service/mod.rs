//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into ledger use-cases.
//! - Keep the session/FFI layers decoupled from storage details.

pub mod catalog_service;
pub mod history;
pub mod ledger_service;
pub mod retention;
pub mod undo;
