//! Client-side synchronization between callers, local state and the remote
//! store.
//!
//! # Responsibility
//! - Expose one explicit store handle (`SyncStore`) with snapshot reads and
//!   async mutations.
//! - Classify failures so callers can tell validation, auth, missing
//!   records, remote failures and partial cascades apart.
//!
//! # Invariants
//! - Remote-backed mutations apply locally only after remote confirmation.
//! - Reads never call the remote store; reloads are explicit.

mod entity_lock;
mod error;
mod snapshot;
mod sync_store;

pub use error::{CascadeFailure, EntityKind, SyncError, SyncResult, ValidationError};
pub use snapshot::StoreSnapshot;
pub use sync_store::SyncStore;
