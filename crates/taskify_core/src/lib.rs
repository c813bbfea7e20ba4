//! Core of Taskify: projects, tasks and their synchronization with a
//! per-user remote store.
//! Rendering layers read snapshots and call store operations; every
//! business rule lives here.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod store;
pub mod view;

pub use auth::{AuthError, AuthSession, Identity, IdentityReceiver, LocalAuthSession, UserId};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_shared_db, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status};
pub use model::project::{Project, ProjectId, ProjectValidationError};
pub use model::task::{Priority, Task, TaskId, TaskValidationError, FALLBACK_CATEGORY};
pub use remote::{
    MemoryRemoteStore, RemoteError, RemoteOp, RemoteResult, RemoteStore, SqliteRemoteStore,
};
pub use store::{
    CascadeFailure, EntityKind, StoreSnapshot, SyncError, SyncResult, SyncStore,
    ValidationError,
};
pub use view::{
    DueDateFilter, PriorityFilter, TaskGroup, ViewCounts, ViewMode, ViewState,
};

/// Health-check used by hosts and the CLI.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
