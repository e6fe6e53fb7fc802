use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<u64, Arc<Mutex<()>>>;

/// One async mutex per account, serializing the load, verify and save of a
/// credential check so concurrent attempts can't lose a failure count.
///
/// Entries only live while someone holds or waits for them.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Arc<LockTable>,
}

/// Exclusive access to one account, released on drop.
#[derive(Debug)]
pub struct AccountGuard {
    account_id: u64,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the account.
    pub async fn lock(&self, account_id: u64) -> AccountGuard {
        // the map shard guard must be released before awaiting
        let lock = Arc::clone(self.locks.entry(account_id).or_default().value());
        let guard = lock.lock_owned().await;
        AccountGuard { account_id, guard: Some(guard), locks: Arc::clone(&self.locks) }
    }

    /// Accounts with a holder or a waiter.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // waiters hold their own clone, so only an idle entry has a count of one
        self.locks.remove_if(&self.account_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_account_is_exclusive() {
        let locks = Arc::new(AccountLocks::new());
        let guard = locks.lock(1).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // other accounts are independent
        let _other = locks.lock(2).await;

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn released_entries_are_removed() {
        let locks = Arc::new(AccountLocks::new());
        let guard = locks.lock(7).await;
        assert_eq!(locks.len(), 1);

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock(7).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // the waiter still needs the entry
        drop(guard);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());

        drop(locks.lock(8).await);
        assert!(locks.is_empty());
    }
}
