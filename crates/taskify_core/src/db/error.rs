//! Failures raised while opening or migrating the Taskify database.
//!
//! Each variant carries the context needed to tell a broken file apart from
//! an unwritable data directory or a database written by a newer binary.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// SQLite refused to open the file or in-memory database.
    Open {
        mode: &'static str,
        source: rusqlite::Error,
    },
    /// The data directory holding the database file could not be created.
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A migration step failed; its transaction was rolled back.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The file was migrated by a newer binary.
    SchemaTooNew { found: u32, supported: u32 },
    /// Connection setup outside a migration step failed.
    Sqlite(rusqlite::Error),
}

impl DbError {
    /// Stable identifier written to `error_code=` in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Open { .. } => "db_open_failed",
            Self::DataDir { .. } => "db_data_dir_failed",
            Self::Migration { .. } => "db_migration_failed",
            Self::SchemaTooNew { .. } => "db_schema_too_new",
            Self::Sqlite(_) => "db_bootstrap_failed",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { mode, source } => write!(f, "cannot open {mode} database: {source}"),
            Self::DataDir { path, source } => {
                write!(f, "cannot create data directory {}: {source}", path.display())
            }
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "database schema version {found} is newer than supported {supported}"
            ),
            Self::Sqlite(source) => write!(f, "database setup failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } | Self::Migration { source, .. } | Self::Sqlite(source) => {
                Some(source)
            }
            Self::DataDir { source, .. } => Some(source),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::error::Error;

    #[test]
    fn migration_failure_names_the_step() {
        let err = DbError::Migration {
            version: 2,
            name: "task_priority",
            source: rusqlite::Error::InvalidQuery,
        };
        assert_eq!(err.code(), "db_migration_failed");
        assert!(err.to_string().starts_with("migration 2 (task_priority) failed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn newer_schema_has_no_source() {
        let err = DbError::SchemaTooNew {
            found: 9,
            supported: 2,
        };
        assert_eq!(err.code(), "db_schema_too_new");
        assert!(err.source().is_none());
    }
}
