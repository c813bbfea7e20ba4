//! Schema migrations for the Taskify database.
//!
//! # Responsibility
//! - List schema migrations in strictly increasing version order.
//! - Apply every pending migration inside one transaction.
//!
//! # Invariants
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - Migration 1 creates `users`, `projects` and `tasks`; later migrations
//!   only add columns or indexes.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "init",
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        name: "task_priority",
        sql: include_str!("0002_task_priority.sql"),
    },
];

/// Schema version this binary migrates databases to.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `DbError::SchemaTooNew` when the file was written by a newer binary.
/// - `DbError::Migration` naming the first step that failed; nothing from
///   the batch is kept.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();

    if current > latest {
        return Err(DbError::SchemaTooNew {
            found: current,
            supported: latest,
        });
    }
    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        tx.execute_batch(migration.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", migration.version))
            .map_err(|source| DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            })?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn versions_are_strictly_increasing() {
        for pair in MIGRATIONS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn failed_step_is_reported_and_rolled_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.execute_batch("ALTER TABLE tasks ADD COLUMN priority TEXT;")
            .unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        match apply_migrations(&mut conn).unwrap_err() {
            DbError::Migration { version, name, .. } => {
                assert_eq!(version, 2);
                assert_eq!(name, "task_priority");
            }
            other => panic!("unexpected error: {other}"),
        }
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn upgrades_version_one_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();
        conn.execute(
            "INSERT INTO projects (id, user_id, title) VALUES ('p1', 'u1', 'Work');",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO tasks (id, project_id, title) VALUES ('t1', 'p1', 'old');",
            [],
        )
        .unwrap();

        apply_migrations(&mut conn).unwrap();

        let priority: String = conn
            .query_row("SELECT priority FROM tasks WHERE id = 't1';", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(priority, "normal");
    }
}
