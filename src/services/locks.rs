//! Per-key async mutual exclusion

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Mutex for one key and the number of guards, held or pending, using it
struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    users: usize,
}

type Slots = Arc<Mutex<HashMap<String, Slot>>>;

/// One async mutex per key, created on demand and dropped once nobody holds
/// or waits on it.
#[derive(Default, Clone)]
pub struct KeyedLocks {
    slots: Slots,
}

/// Held lock on a single key
pub struct KeyGuard {
    key: String,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            let slot = slots.entry(key.to_string()).or_insert_with(|| Slot {
                mutex: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            slot.mutex.clone()
        };
        // Registered before waiting: a cancelled wait still releases its use.
        let mut held = KeyGuard {
            key: key.to_string(),
            slots: self.slots.clone(),
            guard: None,
        };
        held.guard = Some(mutex.lock_owned().await);
        held
    }

    /// Number of keys currently locked or awaited
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.users -= 1;
            if slot.users == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_entries_released() {
        let locks = KeyedLocks::new();
        {
            let _a = locks.lock("a").await;
            let _b = locks.lock("b").await;
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_serialized() {
        let locks = KeyedLocks::new();
        let counter = Arc::new(Mutex::new(Vec::new()));

        let guard = locks.lock("isbn").await;
        let task = {
            let locks = locks.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("isbn").await;
                counter.lock().unwrap().push("second");
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        counter.lock().unwrap().push("first");
        drop(guard);
        task.await.unwrap();

        assert_eq!(*counter.lock().unwrap(), vec!["first", "second"]);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_independent() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_releases_entry() {
        let locks = KeyedLocks::new();
        let holder = locks.lock("isbn").await;
        {
            let waiter = locks.lock("isbn");
            tokio::pin!(waiter);
            let timed_out = tokio::time::timeout(Duration::from_millis(10), &mut waiter).await;
            assert!(timed_out.is_err());
            drop(holder);
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());

        let _again = locks.lock("isbn").await;
        assert_eq!(locks.len(), 1);
    }
}
