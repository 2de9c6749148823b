//! Per-user critical sections.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use common::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 1024;

/// Registry of one async mutex per user.
///
/// The registry only holds weak references; a user's mutex lives as long as
/// someone holds or waits for it. Dead entries are pruned whenever the map
/// grows past a threshold, so its size tracks the number of users with
/// in-flight requests.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Weak<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access on behalf of `user`.
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            match locks.get(&user).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    if locks.len() >= PRUNE_THRESHOLD {
                        locks.retain(|_, weak| weak.strong_count() > 0);
                    }
                    let lock = Arc::new(Mutex::new(()));
                    locks.insert(user, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Number of users with a registered mutex, dead entries included.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_user_is_serialized() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.lock(UserId::new(1)).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(UserId::new(1)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.lock(UserId::new(1)).await;
        let _b = locks.lock(UserId::new(2)).await;
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test]
    async fn released_lock_is_recreated() {
        let locks = UserLocks::new();
        drop(locks.lock(UserId::new(1)).await);
        let _again = locks.lock(UserId::new(1)).await;
        assert_eq!(locks.len().await, 1);
    }

    #[tokio::test]
    async fn dead_entries_are_pruned() {
        let locks = UserLocks::new();
        for id in 0..PRUNE_THRESHOLD as i64 {
            drop(locks.lock(UserId::new(id)).await);
        }
        assert_eq!(locks.len().await, PRUNE_THRESHOLD);

        let _guard = locks.lock(UserId::new(-1)).await;
        assert_eq!(locks.len().await, 1);
    }
}
