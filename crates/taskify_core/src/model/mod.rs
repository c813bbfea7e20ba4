//! Domain model for projects and tasks.
//!
//! # Responsibility
//! - Define the records the synchronization store keeps in memory.
//! - Keep user-input normalization next to the types it guards.
//!
//! # Invariants
//! - Project ids are remote-assigned; task ids are remote-assigned unless the
//!   task is local-only (fallback category).
//! - A task references its project by id; display names resolve at read time.

pub mod project;
pub mod task;
