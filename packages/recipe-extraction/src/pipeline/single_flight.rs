//! Per-key async locks for de-duplicating concurrent identical requests.
//!
//! The map holds weak references only, so a key's lock disappears once the
//! last holder and waiter drop it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Held while a request owns its cache key.
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Keyed async mutexes.
#[derive(Default)]
pub struct KeyedLocks {
    locks: RwLock<HashMap<String, Weak<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = self.mutex_for(key);
        KeyGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of keys with a live lock.
    pub fn active_keys(&self) -> usize {
        self.locks
            .read()
            .unwrap()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn mutex_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.write().unwrap();
        if let Some(existing) = locks.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        locks.retain(|_, w| w.strong_count() > 0);
        let mutex = Arc::new(Mutex::new(()));
        locks.insert(key.to_string(), Arc::downgrade(&mutex));
        mutex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let (locks, inside, max_inside) = (locks.clone(), inside.clone(), max_inside.clone());
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("k").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("a").await;
        let acquired = tokio::time::timeout(Duration::from_millis(50), locks.lock("b")).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_locks_are_released() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.lock("k").await;
            assert_eq!(locks.active_keys(), 1);
        }
        assert_eq!(locks.active_keys(), 0);
    }
}
