//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure the SQLite connection backing the local auth session
//!   and the SQLite remote store.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No application data is read or written before migrations succeed.

mod error;
pub mod migrations;
mod open;

pub use error::{DbError, DbResult};
pub use open::{open_db, open_db_in_memory, open_shared_db};
