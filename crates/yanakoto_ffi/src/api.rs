//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the ledger session to Dart via FRB as sync, use-case-level calls.
//! - Hold one process-wide session opened by `init_ledger`.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Only `init_ledger` reports a store failure; every other call degrades to
//!   an empty or `ok=false` envelope.
//! - Ids cross the boundary as UUID strings.

use chrono::{FixedOffset, Offset, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use uuid::Uuid;
use yanakoto_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    resolve_db_path, Irritant, LedgerConfig, LedgerSession, PointLogEntry, RedeemOutcome,
    Reward, RewardProgress, UndoNotice, UndoOutcome, UserStats,
};

static LEDGER: OnceLock<Ledger> = OnceLock::new();

struct Ledger {
    path: PathBuf,
    session: Mutex<LedgerSession>,
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Opens the ledger store and prunes old history once per process.
///
/// `db_path` falls back to `YANAKOTO_DB_PATH`, then the temp directory.
///
/// # FFI contract
/// - Returns empty string on success and error message on failure.
/// - Repeated calls for the same path are no-ops; a different path is
///   rejected.
/// - A failure here is fatal for the app: no other call works until init
///   succeeds.
#[flutter_rust_bridge::frb(sync)]
pub fn init_ledger(db_path: Option<String>) -> String {
    let path = resolve_db_path(db_path.as_deref());
    if let Some(active) = LEDGER.get() {
        return same_path_or_error(active, &path);
    }

    let mut session = match LedgerSession::open(&path, LedgerConfig::default()) {
        Ok(session) => session,
        Err(err) => {
            log::error!(
                "event=ledger_init module=ffi status=error error_code=db_open_failed error={}",
                err
            );
            return format!("init_ledger failed: {err}");
        }
    };
    session.run_startup_maintenance();

    let ledger = Ledger {
        path: path.clone(),
        session: Mutex::new(session),
    };
    if LEDGER.set(ledger).is_err() {
        if let Some(active) = LEDGER.get() {
            return same_path_or_error(active, &path);
        }
    }
    log::info!("event=ledger_init module=ffi status=ok");
    String::new()
}

/// Balance pair shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BalanceView {
    pub lifetime_total: i64,
    pub current_balance: i64,
}

/// One irritant or reward row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub item_id: String,
    pub name: String,
    pub points: i64,
    pub sort_order: Option<i64>,
}

/// Reward row with progress against the current balance.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardView {
    pub item: ItemView,
    /// `0.0..=1.0`.
    pub progress: f64,
    pub redeemable: bool,
}

/// Result envelope for create/update/delete calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemActionResponse {
    pub ok: bool,
    pub item: Option<ItemView>,
    /// Set when the action can be undone; pass to `expire_undo` when the
    /// presentation timer fires.
    pub undo_ticket: Option<u64>,
    pub message: String,
}

impl ItemActionResponse {
    fn success(message: impl Into<String>, item: Option<ItemView>, undo_ticket: Option<u64>) -> Self {
        Self {
            ok: true,
            item,
            undo_ticket,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            item: None,
            undo_ticket: None,
            message: message.into(),
        }
    }
}

/// Result of tapping an irritant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapResponse {
    pub ok: bool,
    pub points: i64,
    pub balance: BalanceView,
    pub undo_ticket: Option<u64>,
}

/// Result of a redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemResponse {
    pub ok: bool,
    /// Reward name for the celebration; `None` when nothing was redeemed.
    pub celebration: Option<String>,
    pub balance: BalanceView,
}

/// What the undo affordance shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoBanner {
    pub message: String,
    pub remaining_ms: u64,
}

/// Result of an explicit undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoResponse {
    pub ok: bool,
    pub message: String,
    pub balance: BalanceView,
}

/// One history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntryView {
    pub entry_id: String,
    pub label: String,
    pub point_delta: i64,
    pub timestamp_ms: i64,
    pub is_redemption: bool,
}

/// History rows sharing one local calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryDayView {
    pub day: String,
    pub entries: Vec<HistoryEntryView>,
}

#[flutter_rust_bridge::frb(sync)]
pub fn ledger_balance() -> BalanceView {
    with_session(|session| balance_view(session.balance())).unwrap_or_default()
}

/// Finishes onboarding; optionally seeds the first irritant at the top.
#[flutter_rust_bridge::frb(sync)]
pub fn complete_onboarding(first_irritant_name: Option<String>, points: Option<i64>) -> BalanceView {
    with_session(|session| {
        let seed = first_irritant_name.as_deref().zip(points);
        balance_view(session.complete_onboarding(seed))
    })
    .unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn list_irritants() -> Vec<ItemView> {
    with_session(|session| session.irritants().iter().map(irritant_view).collect())
        .unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn list_rewards() -> Vec<RewardView> {
    with_session(|session| {
        session
            .reward_progress()
            .into_iter()
            .map(reward_view)
            .collect()
    })
    .unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn create_irritant(name: String, point_value: i64) -> ItemActionResponse {
    match with_session(|session| session.create_irritant(&name, point_value)) {
        Ok(Some(item)) => ItemActionResponse::success("Irritant created.", Some(irritant_view(&item)), None),
        Ok(None) => ItemActionResponse::failure("Irritant was not created."),
        Err(message) => ItemActionResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn update_irritant(item_id: String, name: String, point_value: i64) -> ItemActionResponse {
    let Some(id) = parse_id(&item_id) else {
        return ItemActionResponse::failure("Unknown irritant.");
    };
    match with_session(|session| session.update_irritant(id, &name, point_value)) {
        Ok(Some(item)) => ItemActionResponse::success("Irritant updated.", Some(irritant_view(&item)), None),
        Ok(None) => ItemActionResponse::failure("Irritant was not updated."),
        Err(message) => ItemActionResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn move_irritant(from_index: u32, to_index: u32) -> Vec<ItemView> {
    with_session(|session| {
        session
            .move_irritant(from_index as usize, to_index as usize)
            .iter()
            .map(irritant_view)
            .collect()
    })
    .unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_irritant(item_id: String) -> ItemActionResponse {
    let Some(id) = parse_id(&item_id) else {
        return ItemActionResponse::failure("Unknown irritant.");
    };
    match with_session(|session| session.delete_irritant(id)) {
        Ok(Some(ticket)) => ItemActionResponse::success("Irritant deleted.", None, Some(ticket.0)),
        Ok(None) => ItemActionResponse::failure("Irritant was not deleted."),
        Err(message) => ItemActionResponse::failure(message),
    }
}

/// Credits the irritant and arms undo.
#[flutter_rust_bridge::frb(sync)]
pub fn tap_irritant(item_id: String) -> TapResponse {
    let outcome = parse_id(&item_id)
        .and_then(|id| with_session(|session| session.tap_irritant(id)).ok().flatten());
    match outcome {
        Some(outcome) => TapResponse {
            ok: true,
            points: outcome.points,
            balance: balance_view(outcome.balance),
            undo_ticket: Some(outcome.undo_ticket.0),
        },
        None => TapResponse {
            ok: false,
            points: 0,
            balance: ledger_balance(),
            undo_ticket: None,
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn create_reward(name: String, required_points: i64) -> ItemActionResponse {
    match with_session(|session| session.create_reward(&name, required_points)) {
        Ok(Some(item)) => ItemActionResponse::success(
            "Reward created.",
            Some(reward_item_view(&item)),
            None,
        ),
        Ok(None) => ItemActionResponse::failure("Reward was not created."),
        Err(message) => ItemActionResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn update_reward(item_id: String, name: String, required_points: i64) -> ItemActionResponse {
    let Some(id) = parse_id(&item_id) else {
        return ItemActionResponse::failure("Unknown reward.");
    };
    match with_session(|session| session.update_reward(id, &name, required_points)) {
        Ok(Some(item)) => ItemActionResponse::success(
            "Reward updated.",
            Some(reward_item_view(&item)),
            None,
        ),
        Ok(None) => ItemActionResponse::failure("Reward was not updated."),
        Err(message) => ItemActionResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn move_reward(from_index: u32, to_index: u32) -> Vec<RewardView> {
    with_session(|session| {
        session.move_reward(from_index as usize, to_index as usize);
        session
            .reward_progress()
            .into_iter()
            .map(reward_view)
            .collect()
    })
    .unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_reward(item_id: String) -> ItemActionResponse {
    let Some(id) = parse_id(&item_id) else {
        return ItemActionResponse::failure("Unknown reward.");
    };
    match with_session(|session| session.delete_reward(id)) {
        Ok(Some(ticket)) => ItemActionResponse::success("Reward deleted.", None, Some(ticket.0)),
        Ok(None) => ItemActionResponse::failure("Reward was not deleted."),
        Err(message) => ItemActionResponse::failure(message),
    }
}

/// Spends points on a reward. Not undoable.
#[flutter_rust_bridge::frb(sync)]
pub fn redeem_reward(item_id: String) -> RedeemResponse {
    let outcome = parse_id(&item_id)
        .and_then(|id| with_session(|session| session.redeem_reward(id)).ok());
    match outcome {
        Some(RedeemOutcome::Redeemed(receipt)) => RedeemResponse {
            ok: true,
            celebration: Some(receipt.reward_name),
            balance: balance_view(receipt.balance),
        },
        Some(RedeemOutcome::Rejected) | None => RedeemResponse {
            ok: false,
            celebration: None,
            balance: ledger_balance(),
        },
    }
}

/// Current undo affordance, or `None` when there is nothing to undo.
#[flutter_rust_bridge::frb(sync)]
pub fn pending_undo() -> Option<UndoBanner> {
    with_session(|session| {
        let notice = session.pending_undo()?;
        let remaining_ms = session
            .undo_remaining()
            .map(|remaining| u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Some(UndoBanner {
            message: undo_message(&notice),
            remaining_ms,
        })
    })
    .ok()
    .flatten()
}

/// Timer callback scheduled when an undoable action returned `ticket`.
///
/// Returns `false` when a newer action already replaced the slot.
#[flutter_rust_bridge::frb(sync)]
pub fn expire_undo(ticket: u64) -> bool {
    with_session(|session| session.expire_undo(yanakoto_core::UndoTicket(ticket))).unwrap_or(false)
}

/// Reverses the most recent credit or deletion if still undoable.
#[flutter_rust_bridge::frb(sync)]
pub fn undo_last() -> UndoResponse {
    let outcome = with_session(|session| session.undo()).ok().flatten();
    let message = match &outcome {
        Some(UndoOutcome::CreditReversed { points, .. }) => format!("Removed {points} points."),
        Some(UndoOutcome::ItemRestored { name, .. }) => format!("Restored {name}."),
        None => "Nothing to undo.".to_string(),
    };
    UndoResponse {
        ok: outcome.is_some(),
        message,
        balance: ledger_balance(),
    }
}

/// History grouped by local day, newest first.
///
/// `utc_offset_seconds` is the device's current offset from UTC.
#[flutter_rust_bridge::frb(sync)]
pub fn history(utc_offset_seconds: i32) -> Vec<HistoryDayView> {
    let offset = FixedOffset::east_opt(utc_offset_seconds).unwrap_or_else(|| Utc.fix());
    with_session(|session| {
        session
            .history(offset)
            .into_iter()
            .map(|group| HistoryDayView {
                day: group.day.to_string(),
                entries: group.entries.iter().map(history_entry_view).collect(),
            })
            .collect()
    })
    .unwrap_or_default()
}

/// Reverses one history entry's balance effect and deletes it.
#[flutter_rust_bridge::frb(sync)]
pub fn reverse_history_entry(entry_id: String) -> BalanceView {
    match parse_id(&entry_id) {
        Some(id) => with_session(|session| balance_view(session.reverse_history_entry(id)))
            .unwrap_or_default(),
        None => ledger_balance(),
    }
}

fn same_path_or_error(active: &Ledger, requested: &Path) -> String {
    if active.path == requested {
        String::new()
    } else {
        format!(
            "ledger already initialized at `{}`; refusing to switch to `{}`",
            active.path.display(),
            requested.display()
        )
    }
}

fn with_session<T>(f: impl FnOnce(&mut LedgerSession) -> T) -> Result<T, String> {
    let ledger = LEDGER
        .get()
        .ok_or_else(|| "ledger not initialized; call init_ledger first".to_string())?;
    let mut session = ledger
        .session
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Ok(f(&mut session))
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn balance_view(stats: UserStats) -> BalanceView {
    BalanceView {
        lifetime_total: stats.lifetime_total,
        current_balance: stats.current_balance,
    }
}

fn irritant_view(item: &Irritant) -> ItemView {
    ItemView {
        item_id: item.uuid.to_string(),
        name: item.name.clone(),
        points: item.point_value,
        sort_order: item.sort_order,
    }
}

fn reward_item_view(item: &Reward) -> ItemView {
    ItemView {
        item_id: item.uuid.to_string(),
        name: item.name.clone(),
        points: item.required_points,
        sort_order: item.sort_order,
    }
}

fn reward_view(progress: RewardProgress) -> RewardView {
    RewardView {
        item: reward_item_view(&progress.reward),
        progress: progress.progress,
        redeemable: progress.redeemable,
    }
}

fn history_entry_view(entry: &PointLogEntry) -> HistoryEntryView {
    HistoryEntryView {
        entry_id: entry.uuid.to_string(),
        label: entry.label.clone(),
        point_delta: entry.point_delta,
        timestamp_ms: entry.timestamp,
        is_redemption: entry.is_redemption,
    }
}

fn undo_message(notice: &UndoNotice) -> String {
    match notice {
        UndoNotice::Credit { points } => format!("+{points} points"),
        UndoNotice::Deleted { item_kind, name } => format!("Deleted {} {name}", item_kind.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, create_irritant, create_reward, delete_irritant, history, init_ledger,
        init_logging, list_irritants, list_rewards, ping, redeem_reward, tap_irritant,
        update_irritant,
    };
    use std::sync::OnceLock;

    static TEST_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

    fn ledger() {
        let dir = TEST_DIR.get_or_init(|| tempfile::tempdir().expect("temp dir"));
        let path = dir.path().join("ffi-ledger.sqlite3");
        let error = init_ledger(Some(path.to_string_lossy().into_owned()));
        assert!(error.is_empty(), "{error}");
    }

    fn unique_name(prefix: &str) -> String {
        format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_ledger_is_idempotent_and_rejects_a_second_path() {
        ledger();
        ledger();
        let other = std::env::temp_dir().join(unique_name("other-ledger"));
        let error = init_ledger(Some(other.to_string_lossy().into_owned()));
        assert!(error.contains("refusing to switch"));
    }

    #[test]
    fn created_irritant_is_listed_and_tappable() {
        ledger();
        let name = unique_name("ffi-irritant");
        let created = create_irritant(name.clone(), 4);
        assert!(created.ok, "{}", created.message);
        let item = created.item.expect("created item");

        assert!(list_irritants().iter().any(|listed| listed.item_id == item.item_id));

        let tap = tap_irritant(item.item_id.clone());
        assert!(tap.ok);
        assert_eq!(tap.points, 4);
        assert!(tap.undo_ticket.is_some());

        let logged = history(0)
            .into_iter()
            .flat_map(|day| day.entries)
            .any(|entry| entry.label == name && entry.point_delta == 4);
        assert!(logged);
    }

    #[test]
    fn invalid_input_yields_failure_envelopes() {
        ledger();
        assert!(!create_irritant("   ".to_string(), 3).ok);
        assert!(!create_reward("Treat".to_string(), 0).ok);
        assert!(!update_irritant("not-a-uuid".to_string(), "x".to_string(), 1).ok);
        assert!(!delete_irritant(uuid::Uuid::new_v4().to_string()).ok);
        assert!(!tap_irritant("not-a-uuid".to_string()).ok);
    }

    #[test]
    fn unaffordable_reward_is_not_redeemed() {
        ledger();
        let created = create_reward(unique_name("ffi-reward"), 999_999);
        let item = created.item.expect("created reward");

        let listed = list_rewards()
            .into_iter()
            .find(|reward| reward.item.item_id == item.item_id)
            .expect("listed reward");
        assert!(!listed.redeemable);

        let response = redeem_reward(item.item_id);
        assert!(!response.ok);
        assert!(response.celebration.is_none());
    }
}
