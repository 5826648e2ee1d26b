//! Namespace locks
//!
//! Per-(volume, path) shared/exclusive locks. The write pipeline takes the
//! shared lock only for the sidecar version scan and the exclusive lock only
//! around commit; no lock is held while streaming. Entries are removed from
//! the map when the last holder releases, so the map stays proportional to
//! the number of keys currently contended.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;

#[derive(Default)]
struct LockState {
    readers: usize,
    writer: bool,
}

#[derive(Default)]
struct Inner {
    locks: HashMap<(String, String), LockState>,
}

/// Map of per-key shared/exclusive namespace locks
#[derive(Default)]
pub struct NamespaceLocks {
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl NamespaceLocks {
    /// Create an empty lock map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the shared lock on (volume, path), blocking until granted
    pub fn shared(&self, volume: &str, path: &str) -> SharedNsGuard<'_> {
        let key = (volume.to_owned(), path.to_owned());
        let mut inner = self.inner.lock();
        loop {
            let state = inner.locks.entry(key.clone()).or_default();
            if !state.writer {
                state.readers += 1;
                break;
            }
            self.cond.wait(&mut inner);
        }
        SharedNsGuard { locks: self, key }
    }

    /// Acquire the exclusive lock on (volume, path), blocking until granted
    pub fn exclusive(&self, volume: &str, path: &str) -> ExclusiveNsGuard<'_> {
        let key = (volume.to_owned(), path.to_owned());
        let mut inner = self.inner.lock();
        loop {
            let state = inner.locks.entry(key.clone()).or_default();
            if !state.writer && state.readers == 0 {
                state.writer = true;
                break;
            }
            self.cond.wait(&mut inner);
        }
        ExclusiveNsGuard { locks: self, key }
    }

    fn release_shared(&self, key: &(String, String)) {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.locks.get_mut(key) {
            state.readers -= 1;
            if state.readers == 0 && !state.writer {
                inner.locks.remove(key);
            }
        }
        self.cond.notify_all();
    }

    fn release_exclusive(&self, key: &(String, String)) {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.locks.get_mut(key) {
            state.writer = false;
            if state.readers == 0 {
                inner.locks.remove(key);
            }
        }
        self.cond.notify_all();
    }

    #[cfg(test)]
    fn held_keys(&self) -> usize {
        self.inner.lock().locks.len()
    }
}

/// Shared lock guard; releases on drop
pub struct SharedNsGuard<'a> {
    locks: &'a NamespaceLocks,
    key: (String, String),
}

impl Drop for SharedNsGuard<'_> {
    fn drop(&mut self) {
        self.locks.release_shared(&self.key);
    }
}

/// Exclusive lock guard; releases on drop
pub struct ExclusiveNsGuard<'a> {
    locks: &'a NamespaceLocks,
    key: (String, String),
}

impl Drop for ExclusiveNsGuard<'_> {
    fn drop(&mut self) {
        self.locks.release_exclusive(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_shared_locks_coexist() {
        let locks = NamespaceLocks::new();
        let a = locks.shared("vol", "obj");
        let b = locks.shared("vol", "obj");
        drop(a);
        drop(b);
        assert_eq!(locks.held_keys(), 0);
    }

    #[test]
    fn test_exclusive_waits_for_shared() {
        let locks = Arc::new(NamespaceLocks::new());
        let shared = locks.shared("vol", "obj");

        let acquired = Arc::new(AtomicBool::new(false));
        let handle = {
            let locks = Arc::clone(&locks);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let _guard = locks.exclusive("vol", "obj");
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        drop(shared);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert_eq!(locks.held_keys(), 0);
    }

    #[test]
    fn test_exclusive_blocks_shared() {
        let locks = Arc::new(NamespaceLocks::new());
        let exclusive = locks.exclusive("vol", "obj");

        let acquired = Arc::new(AtomicBool::new(false));
        let handle = {
            let locks = Arc::clone(&locks);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let _guard = locks.shared("vol", "obj");
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));

        drop(exclusive);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_distinct_keys_independent() {
        let locks = NamespaceLocks::new();
        let _a = locks.exclusive("vol", "one");
        let _b = locks.exclusive("vol", "two");
        assert_eq!(locks.held_keys(), 2);
    }
}
