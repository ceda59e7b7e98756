//! Per-identifier exclusive locks.
//!
//! Two sales of the same product run one after the other; sales of
//! different products run side by side.
//!
//! ```text
//! sell BRK001 ──► lock("BRK001") ──► get ─► check ─► adjust ─► append ──► unlock
//! sell BRK001 ──► lock("BRK001") ··· waits ·································► runs
//! sell MNM001 ──► lock("MNM001") ──► runs concurrently
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// A lazily-populated map of one mutex per key.
///
/// An entry only the map still references has no holder and no waiter.
/// Such entries are dropped on the next `lock` call, so looking up unknown
/// identifiers does not grow the map.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock("BRK001").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("BRK001").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("BRK001").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.lock("MNM001"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_released_keys_are_forgotten() {
        let locks = KeyedLocks::new();
        for i in 0..100 {
            let _guard = locks.lock(&format!("UNKNOWN{i}")).await;
        }
        assert_eq!(locks.len().await, 1);

        let held = locks.lock("BRK001").await;
        let _other = locks.lock("MNM001").await;
        assert_eq!(locks.len().await, 2);
        drop(held);
        let _third = locks.lock("SNK001").await;
        assert_eq!(locks.len().await, 2);
    }
}
