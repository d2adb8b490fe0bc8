use chrono::FixedOffset;
use std::sync::Arc;
use std::time::Duration;
use yanakoto_core::{
    open_db_in_memory, ItemKind, LedgerConfig, LedgerSession, ManualClock, RedeemOutcome,
    UndoNotice, UndoOutcome, UserStats, UNDO_WINDOW,
};

const START_MS: i64 = 1_773_133_200_000;

fn session() -> (LedgerSession, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MS));
    let session = LedgerSession::with_connection(
        open_db_in_memory().unwrap(),
        clock.clone(),
        LedgerConfig::default(),
    );
    (session, clock)
}

fn log_len(session: &LedgerSession) -> usize {
    session
        .history(FixedOffset::east_opt(0).unwrap())
        .iter()
        .map(|day| day.entries.len())
        .sum()
}

#[test]
fn undo_reverses_the_latest_credit() {
    let (mut session, _clock) = session();
    let irritant = session.create_irritant("Queue", 6).unwrap();
    session.tap_irritant(irritant.uuid).unwrap();

    assert_eq!(
        session.pending_undo(),
        Some(UndoNotice::Credit { points: 6 })
    );
    let outcome = session.undo().unwrap();
    assert_eq!(
        outcome,
        UndoOutcome::CreditReversed {
            points: 6,
            balance: UserStats::new(0, 0),
            log_entry_removed: true,
        }
    );
    assert_eq!(session.balance(), UserStats::new(0, 0));
    assert_eq!(log_len(&session), 0);
    assert!(session.undo().is_none());
}

#[test]
fn second_action_replaces_the_first_in_the_slot() {
    let (mut session, clock) = session();
    let first = session.create_irritant("First", 5).unwrap();
    let second = session.create_irritant("Second", 3).unwrap();

    session.tap_irritant(first.uuid).unwrap();
    clock.advance(Duration::from_secs(1));
    session.tap_irritant(second.uuid).unwrap();

    session.undo().unwrap();
    assert_eq!(session.balance(), UserStats::new(5, 5));
    assert_eq!(log_len(&session), 1);
    assert!(session.undo().is_none());
}

#[test]
fn slot_expires_after_the_window() {
    let (mut session, clock) = session();
    let irritant = session.create_irritant("Horn", 2).unwrap();
    session.tap_irritant(irritant.uuid).unwrap();

    clock.advance(UNDO_WINDOW - Duration::from_millis(1));
    assert!(session.pending_undo().is_some());
    assert_eq!(session.undo_remaining(), Some(Duration::from_millis(1)));

    clock.advance(Duration::from_millis(1));
    assert!(session.pending_undo().is_none());
    assert!(session.undo().is_none());
    assert_eq!(session.balance(), UserStats::new(2, 2));
}

#[test]
fn tick_reports_expiry_once() {
    let (mut session, clock) = session();
    let irritant = session.create_irritant("Horn", 2).unwrap();
    session.tap_irritant(irritant.uuid).unwrap();

    assert!(!session.tick());
    clock.advance(UNDO_WINDOW);
    assert!(session.tick());
    assert!(!session.tick());
}

#[test]
fn stale_timer_callback_does_not_clear_a_newer_slot() {
    let (mut session, _clock) = session();
    let irritant = session.create_irritant("Ping", 1).unwrap();

    let first = session.tap_irritant(irritant.uuid).unwrap().undo_ticket;
    let second = session.tap_irritant(irritant.uuid).unwrap().undo_ticket;
    assert_ne!(first, second);

    assert!(!session.expire_undo(first));
    assert!(session.pending_undo().is_some());

    assert!(session.expire_undo(second));
    assert!(session.pending_undo().is_none());
    assert_eq!(session.balance(), UserStats::new(2, 2));
}

#[test]
fn undoing_a_deletion_recreates_the_item_under_a_new_identity() {
    let (mut session, _clock) = session();
    session.create_irritant("Alpha", 1).unwrap();
    let doomed = session.create_irritant("Beta", 2).unwrap();
    session.create_irritant("Gamma", 3).unwrap();

    session.delete_irritant(doomed.uuid).unwrap();
    assert_eq!(session.irritants().len(), 2);
    assert_eq!(
        session.pending_undo(),
        Some(UndoNotice::Deleted {
            item_kind: ItemKind::Irritant,
            name: "Beta".to_string(),
        })
    );

    let restored_id = match session.undo().unwrap() {
        UndoOutcome::ItemRestored {
            item_kind,
            item_id,
            name,
        } => {
            assert_eq!(item_kind, ItemKind::Irritant);
            assert_eq!(name, "Beta");
            item_id
        }
        other => panic!("unexpected undo outcome: {other:?}"),
    };
    assert_ne!(restored_id, doomed.uuid);

    let listed = session.irritants();
    let names: Vec<&str> = listed.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, ["Alpha", "Beta", "Gamma"]);
    assert_eq!(listed[1].uuid, restored_id);
    assert_eq!(listed[1].point_value, 2);
    assert_eq!(listed[1].sort_order, doomed.sort_order);
}

#[test]
fn reward_deletion_shares_the_slot() {
    let (mut session, _clock) = session();
    let reward = session.create_reward("Cinema", 40).unwrap();
    let irritant = session.create_irritant("Drizzle", 1).unwrap();

    session.delete_reward(reward.uuid).unwrap();
    session.tap_irritant(irritant.uuid).unwrap();

    assert!(matches!(
        session.undo(),
        Some(UndoOutcome::CreditReversed { .. })
    ));
    assert!(session.rewards().is_empty());

    let other = session.create_reward("Museum", 30).unwrap();
    session.delete_reward(other.uuid).unwrap();
    assert!(matches!(
        session.undo(),
        Some(UndoOutcome::ItemRestored {
            item_kind: ItemKind::Reward,
            ..
        })
    ));
    assert_eq!(session.rewards()[0].name, "Museum");
}

#[test]
fn deleting_a_missing_item_arms_nothing() {
    let (mut session, _clock) = session();
    assert!(session.delete_irritant(uuid::Uuid::new_v4()).is_none());
    assert!(session.delete_reward(uuid::Uuid::new_v4()).is_none());
    assert!(session.pending_undo().is_none());
}

#[test]
fn credit_undo_tolerates_a_missing_log_entry() {
    let (mut session, _clock) = session();
    let irritant = session.create_irritant("Printer", 4).unwrap();
    session.tap_irritant(irritant.uuid).unwrap();
    session
        .connection()
        .execute("DELETE FROM point_logs;", [])
        .unwrap();

    let outcome = session.undo().unwrap();
    assert_eq!(
        outcome,
        UndoOutcome::CreditReversed {
            points: 4,
            balance: UserStats::new(0, 0),
            log_entry_removed: false,
        }
    );
}

#[test]
fn redemption_leaves_the_slot_alone() {
    let (mut session, clock) = session();
    let irritant = session.create_irritant("Spam", 8).unwrap();
    let reward = session.create_reward("Tea", 5).unwrap();

    session.tap_irritant(irritant.uuid).unwrap();
    clock.advance(UNDO_WINDOW);
    assert!(matches!(
        session.redeem_reward(reward.uuid),
        RedeemOutcome::Redeemed(_)
    ));
    assert!(session.pending_undo().is_none());
    assert!(session.undo().is_none());
    assert_eq!(session.balance(), UserStats::new(8, 3));
}

#[test]
fn custom_window_is_honoured() {
    let clock = Arc::new(ManualClock::new(START_MS));
    let mut session = LedgerSession::with_connection(
        open_db_in_memory().unwrap(),
        clock.clone(),
        LedgerConfig::default().with_undo_window(Duration::from_secs(10)),
    );
    let irritant = session.create_irritant("Siren", 1).unwrap();
    session.tap_irritant(irritant.uuid).unwrap();

    clock.advance(Duration::from_secs(9));
    assert!(session.undo().is_some());
}
