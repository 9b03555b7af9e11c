//! Retention lock shared between export and pruning.
//!
//! The lock is held while an export enumerates and opens segments, and while a
//! pruning pass deletes them. It does not protect segments after an export
//! returns; the reader registry does that.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Process-wide mutual exclusion between segment export and pruning.
///
/// Cloning the lock shares it.
#[derive(Clone, Default)]
pub struct RetentionLock {
    inner: Arc<Mutex<()>>,
}

/// Holds the [`RetentionLock`] until dropped.
#[must_use = "the retention lock is released as soon as the guard is dropped"]
pub struct RetentionGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl RetentionLock {
    /// Creates a new, unlocked retention lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the lock is acquired. There is no timeout.
    pub fn lock(&self) -> RetentionGuard<'_> {
        RetentionGuard {
            _guard: self.inner.lock(),
        }
    }

    /// Acquires the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<RetentionGuard<'_>> {
        self.inner
            .try_lock()
            .map(|guard| RetentionGuard { _guard: guard })
    }

    /// Waits up to `timeout` for the lock.
    pub fn try_lock_for(&self, timeout: Duration) -> Option<RetentionGuard<'_>> {
        self.inner
            .try_lock_for(timeout)
            .map(|guard| RetentionGuard { _guard: guard })
    }

    /// Returns true if someone currently holds the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl fmt::Debug for RetentionLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetentionLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl fmt::Debug for RetentionGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetentionGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn guard_releases_on_drop() {
        let lock = RetentionLock::new();
        {
            let _guard = lock.lock();
            assert!(lock.is_locked());
            assert!(lock.try_lock().is_none());
        }
        assert!(!lock.is_locked());
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn clones_share_the_lock() {
        let lock = RetentionLock::new();
        let pruning_side = lock.clone();

        let _guard = lock.lock();
        assert!(pruning_side.is_locked());
        assert!(pruning_side.try_lock_for(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn waiter_proceeds_after_release() {
        let lock = RetentionLock::new();
        let other = lock.clone();
        let (tx, rx) = mpsc::channel();

        let guard = lock.lock();
        let handle = thread::spawn(move || {
            let _guard = other.lock();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        drop(guard);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
    }
}
