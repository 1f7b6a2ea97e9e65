//! Per-project reader/writer locks.
//!
//! Script writes and restores hold a project's write lock; snapshots hold its
//! read lock only while reading from the store. Projects never contend with
//! each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

#[derive(Debug, Clone, Default)]
pub struct ProjectLocks {
    inner: Arc<Mutex<HashMap<String, Arc<RwLock<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, project_id: &str) -> Arc<RwLock<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(project_id.to_string()).or_default())
    }

    pub async fn read(&self, project_id: &str) -> OwnedRwLockReadGuard<()> {
        self.lock_for(project_id).read_owned().await
    }

    pub async fn write(&self, project_id: &str) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(project_id).write_owned().await
    }
}
