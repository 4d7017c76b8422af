//! Per-path write locks scoped to a session.
//!
//! `create_file` and `edit_file` hold one of these across their
//! exists-check → write sequence so two calls on the same path in a turn
//! serialize. Entries are dropped from the table when the last holder goes.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockKey = (String, String);
type LockTable = DashMap<LockKey, Arc<Mutex<()>>>;

/// Table of async mutexes keyed by (session id, normalized path).
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    table: Arc<LockTable>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock for `path` in `session_id`.
    pub async fn lock(&self, session_id: &str, path: &str) -> PathGuard {
        let key = (session_id.to_string(), path.to_string());
        let mutex = self.table.entry(key.clone()).or_default().clone();
        let guard = mutex.lock_owned().await;
        PathGuard {
            guard: Some(guard),
            key,
            table: self.table.clone(),
        }
    }

    /// Number of paths currently locked or waited on.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Held lock on one path. Releases (and prunes) on drop.
#[derive(Debug)]
pub struct PathGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: LockKey,
    table: Arc<LockTable>,
}

impl PathGuard {
    pub fn path(&self) -> &str {
        &self.key.1
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.table
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
