//! Flutter bridge for the Yanakoto ledger core.

pub mod api;
