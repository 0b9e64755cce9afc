//! Lazily created per-name mutexes for serializing tensor data access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Map from resolved tensor name to its advisory lock.
///
/// The map itself is mutex-guarded so get-or-insert is atomic: two threads
/// asking for the same name always receive the same underlying mutex.
/// Entries are never removed; the table is bounded by the number of
/// distinct tensor names the workspace ever locks.
#[derive(Debug, Default)]
pub(crate) struct LockTable {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub(crate) fn handle(&self, resolved: &str) -> TensorLock {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        let inner = locks
            .entry(resolved.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        TensorLock { inner }
    }
}

/// Cloneable handle to one tensor's advisory lock.
///
/// The lock serializes access to a tensor's *contents* between producers and
/// consumers; it does not protect the workspace's own index structures.
#[derive(Debug, Clone)]
pub struct TensorLock {
    inner: Arc<Mutex<()>>,
}

impl TensorLock {
    /// Blocks until the lock is held. Acquisition is unbounded; there is no
    /// timeout concept.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().expect("tensor lock poisoned")
    }

    /// Attempts the lock without blocking.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, ()>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(_)) => panic!("tensor lock poisoned"),
        }
    }
}
