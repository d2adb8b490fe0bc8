//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `yanakoto_core` linkage without the Flutter runtime.
//! - Run startup pruning and print a summary of a ledger database.
//!
//! Usage: `yanakoto_cli [DB_PATH]`. Without an argument the path comes from
//! `YANAKOTO_DB_PATH`, then the temp directory.

use chrono::{Local, Offset};
use std::process::ExitCode;
use yanakoto_core::{resolve_db_path, LedgerConfig, LedgerSession};

fn main() -> ExitCode {
    println!("yanakoto_core ping={}", yanakoto_core::ping());
    println!("yanakoto_core version={}", yanakoto_core::core_version());

    let explicit = std::env::args().nth(1);
    let path = resolve_db_path(explicit.as_deref());
    let mut session = match LedgerSession::open(&path, LedgerConfig::default()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("failed to open ledger at {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };
    let pruned = session.run_startup_maintenance();

    let balance = session.balance();
    println!("ledger path={}", path.display());
    println!(
        "balance current={} lifetime={} pruned={}",
        balance.current_balance, balance.lifetime_total, pruned
    );

    println!("irritants:");
    for irritant in session.irritants() {
        println!("  +{:>6}  {}", irritant.point_value, irritant.name);
    }

    println!("rewards:");
    for row in session.reward_progress() {
        let marker = if row.redeemable { '*' } else { ' ' };
        println!(
            " {marker}{:>6}  {} ({:.0}%)",
            row.reward.required_points,
            row.reward.name,
            row.progress * 100.0
        );
    }

    println!("history:");
    let offset = Local::now().offset().fix();
    for day in session.history(offset) {
        println!("  {}", day.day);
        for entry in day.entries {
            println!("    {:+}  {}", entry.point_delta, entry.label);
        }
    }

    ExitCode::SUCCESS
}
