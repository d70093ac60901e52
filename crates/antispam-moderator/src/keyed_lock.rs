// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-key async mutex.
//!
//! [`KeyedMutex`] hands out one lock per string key. Locks are created on
//! first use and removed from the map once no task holds or waits on them,
//! so the map only ever contains keys that are currently contended.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// A lazily populated map of per-key mutexes.
#[derive(Clone, Default)]
pub struct KeyedMutex {
    locks: LockMap,
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, waiting while another task holds it.
    ///
    /// The lock is released when the returned guard is dropped. Dropping the
    /// future before it resolves releases the waiter's claim on the entry.
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let mut guard = KeyedGuard {
            key: key.to_string(),
            locks: self.locks.clone(),
            mutex: Some(mutex.clone()),
            inner: None,
        };
        guard.inner = Some(mutex.lock_owned().await);
        guard
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Guard for a single key of a [`KeyedMutex`].
pub struct KeyedGuard {
    key: String,
    locks: LockMap,
    mutex: Option<Arc<Mutex<()>>>,
    inner: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // Both handles must be gone before counting references.
        drop(self.inner.take());
        drop(self.mutex.take());
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
