use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Opaque session identifier handed across the FFI boundary.
pub type Handle = u64;

/// Never issued. Returned by init on failure.
pub const INVALID_HANDLE: Handle = 0;

struct Inner<S> {
    sessions: HashMap<Handle, Arc<S>>,
    next_id: Handle,
}

/// Thread-safe map from handle to live session.
///
/// Handles start at 1 and only ever increase, so a handle is never reused
/// after its session is removed. The lock is held for map access only;
/// callers get an `Arc` and do their I/O after it is released.
pub struct SessionRegistry<S> {
    inner: Mutex<Inner<S>>,
}

impl<S> SessionRegistry<S> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    // The map is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a session and return its new handle.
    pub fn register(&self, session: S) -> Handle {
        let mut inner = self.lock();
        let handle = inner.next_id;
        inner.next_id += 1;
        inner.sessions.insert(handle, Arc::new(session));
        handle
    }

    pub fn lookup(&self, handle: Handle) -> Option<Arc<S>> {
        self.lock().sessions.get(&handle).cloned()
    }

    /// Remove a session. In-flight calls holding the `Arc` finish normally.
    pub fn remove(&self, handle: Handle) -> Option<Arc<S>> {
        self.lock().sessions.remove(&handle)
    }

    /// Live handles, ascending.
    pub fn handles(&self) -> Vec<Handle> {
        let mut handles: Vec<Handle> = self.lock().sessions.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().sessions.is_empty()
    }

    /// Drop every session, returning how many there were. The handle
    /// counter keeps counting.
    pub fn clear(&self) -> usize {
        // Sessions are dropped after the lock is released.
        let drained: Vec<Arc<S>> = {
            let mut inner = self.lock();
            inner.sessions.drain().map(|(_, session)| session).collect()
        };
        drained.len()
    }
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_handles_start_at_one() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.register("a"), 1);
        assert_eq!(registry.register("b"), 2);
        assert_eq!(registry.lookup(1).as_deref(), Some(&"a"));
        assert_eq!(registry.lookup(2).as_deref(), Some(&"b"));
    }

    #[test]
    fn test_unknown_handles() {
        let registry = SessionRegistry::new();
        registry.register(());
        assert!(registry.lookup(INVALID_HANDLE).is_none());
        assert!(registry.lookup(999).is_none());
        assert!(registry.lookup(u64::MAX).is_none());
    }

    #[test]
    fn test_handles_not_reused() {
        let registry = SessionRegistry::new();
        let first = registry.register(1);
        assert!(registry.remove(first).is_some());
        assert!(registry.remove(first).is_none());
        assert_eq!(registry.register(2), 2);

        assert_eq!(registry.clear(), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.register(3), 3);
    }

    #[test]
    fn test_removed_session_outlives_removal() {
        let registry = SessionRegistry::new();
        let handle = registry.register(String::from("session"));
        let held = registry.lookup(handle).unwrap();
        registry.remove(handle);
        assert_eq!(held.as_str(), "session");
        assert!(registry.lookup(handle).is_none());
    }

    #[test]
    fn test_concurrent_register() {
        let registry = Arc::new(SessionRegistry::new());
        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..100)
                        .map(|i| registry.register(worker * 100 + i))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for handle in worker.join().unwrap() {
                assert_ne!(handle, INVALID_HANDLE);
                assert!(seen.insert(handle), "duplicate handle {}", handle);
            }
        }
        assert_eq!(seen.len(), 800);
        assert_eq!(registry.len(), 800);
        assert_eq!(registry.handles(), (1..=800).collect::<Vec<_>>());
    }
}
