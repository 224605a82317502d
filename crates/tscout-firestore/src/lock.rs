//! Per-project write serialization.
//!
//! All writes to a project document go through a read-modify-write cycle;
//! the lock registry keeps two workers from interleaving partial updates
//! on the same project. Reads stay lock-free.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use tscout_models::ProjectId;

/// Registry of per-project mutexes.
#[derive(Debug, Default, Clone)]
pub struct ProjectLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the write lock for a project, creating it on first use.
    pub async fn lock(&self, project_id: &ProjectId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(
                locks
                    .entry(project_id.as_str().to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry for a deleted project.
    pub async fn forget(&self, project_id: &ProjectId) {
        self.locks.lock().await.remove(project_id.as_str());
    }
}
