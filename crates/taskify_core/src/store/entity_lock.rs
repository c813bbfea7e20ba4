//! Per-entity mutation queue.
//!
//! # Invariants
//! - At most one mutation per entity id runs at a time; waiters are served
//!   in arrival order.
//! - An entry is dropped from the registry once nobody holds or waits on it.

use crate::model::project::ProjectId;
use crate::model::task::TaskId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum EntityKey {
    Project(ProjectId),
    Task(TaskId),
}

#[derive(Default)]
pub(crate) struct EntityLocks {
    registry: RefCell<HashMap<EntityKey, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    /// Waits until every earlier mutation of `key` has finished.
    pub(crate) async fn acquire(&self, key: EntityKey) -> EntityGuard<'_> {
        let lock = Arc::clone(self.registry.borrow_mut().entry(key.clone()).or_default());
        let guard = lock.lock_owned().await;
        EntityGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.registry.borrow().len()
    }
}

pub(crate) struct EntityGuard<'a> {
    locks: &'a EntityLocks,
    key: EntityKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut registry = self.locks.registry.borrow_mut();
        let idle = registry
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            registry.remove(&self.key);
        }
    }
}
