use rusqlite::Connection;
use taskify_core::db::migrations::latest_version;
use taskify_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "projects");
    assert_table_exists(&conn, "tasks");
    assert_column_exists(&conn, "tasks", "priority");
}

#[test]
fn reopening_database_file_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskify.db");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO projects (id, user_id, title) VALUES ('p1', 'u1', 'Work');",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn task_priority_defaults_to_normal_and_rejects_unknown_values() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO projects (id, user_id, title) VALUES ('p1', 'u1', 'Work');",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO tasks (id, project_id, title) VALUES ('t1', 'p1', 'report');",
        [],
    )
    .unwrap();

    let priority: String = conn
        .query_row("SELECT priority FROM tasks WHERE id = 't1';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(priority, "normal");

    let err = conn.execute(
        "INSERT INTO tasks (id, project_id, title, priority) VALUES ('t2', 'p1', 'x', 'urgent');",
        [],
    );
    assert!(err.is_err());
}

#[test]
fn foreign_keys_block_orphan_tasks() {
    let conn = open_db_in_memory().unwrap();
    let err = conn.execute(
        "INSERT INTO tasks (id, project_id, title) VALUES ('t1', 'missing', 'orphan');",
        [],
    );
    assert!(err.is_err());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unusable_data_dir_is_reported_with_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();

    match open_db(blocker.join("taskify.db")).unwrap_err() {
        DbError::DataDir { path, .. } => assert_eq!(path, blocker),
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

fn assert_column_exists(conn: &Connection, table_name: &str, column: &str) {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table_name});"))
        .unwrap();
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(
        columns.iter().any(|name| name == column),
        "column {table_name}.{column} does not exist"
    );
}
