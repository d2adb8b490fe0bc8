use rusqlite::{params, Connection};
use yanakoto_core::db::migrations::{apply_migrations_up_to, latest_version};
use yanakoto_core::db::{open_db, open_db_in_memory, DbError};
use yanakoto_core::repo::item_repo::{CatalogRepository, SqliteCatalogRepository};
use yanakoto_core::Irritant;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "irritants");
    assert_table_exists(&conn, "rewards");
    assert_table_exists(&conn, "point_logs");
    assert_table_exists(&conn, "user_stats");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.sqlite3");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "point_logs");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failing_schema_step_reports_its_version_and_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clashing.sqlite3");

    let mut conn = Connection::open(&path).unwrap();
    apply_migrations_up_to(&mut conn, 1).unwrap();
    conn.execute_batch("ALTER TABLE irritants ADD COLUMN sort_order INTEGER NULL;")
        .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert_eq!(err.failed_migration(), Some(2));
    assert!(matches!(err, DbError::Migration { version: 2, .. }));
    assert!(err.to_string().contains("schema step 2"));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 1);
}

#[test]
fn user_stats_table_holds_a_single_row() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO user_stats (id, lifetime_total, current_balance) VALUES (1, 0, 0);",
        [],
    )
    .unwrap();

    let second = conn.execute(
        "INSERT INTO user_stats (id, lifetime_total, current_balance) VALUES (2, 0, 0);",
        [],
    );
    assert!(second.is_err());
}

#[test]
fn rows_from_before_manual_ordering_list_after_ordered_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.sqlite3");

    let mut legacy = Connection::open(&path).unwrap();
    apply_migrations_up_to(&mut legacy, 1).unwrap();
    assert_eq!(schema_version(&legacy), 1);
    for (name, created_at) in [("older", 1_000_i64), ("newer", 2_000_i64)] {
        legacy
            .execute(
                "INSERT INTO irritants (uuid, name, point_value, created_at) VALUES (?1, ?2, 5, ?3);",
                params![uuid::Uuid::new_v4().to_string(), name, created_at],
            )
            .unwrap();
    }
    drop(legacy);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let repo = SqliteCatalogRepository::<Irritant>::try_new(&conn).unwrap();

    let before = repo.list_items().unwrap();
    assert!(before.iter().all(|item| item.sort_order.is_none()));
    assert_eq!(names(&before), ["older", "newer"]);

    let ordered = Irritant {
        uuid: uuid::Uuid::new_v4(),
        name: "placed".to_string(),
        point_value: 3,
        created_at: 3_000,
        sort_order: Some(repo.next_sort_order().unwrap()),
    };
    assert_eq!(ordered.sort_order, Some(0));
    repo.create_item(&ordered).unwrap();

    let after = repo.list_items().unwrap();
    assert_eq!(names(&after), ["placed", "older", "newer"]);
}

fn names(items: &[Irritant]) -> Vec<&str> {
    items.iter().map(|item| item.name.as_str()).collect()
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "expected table `{table_name}` to exist");
}
