//! One in-flight sync per wallet id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Caller-owned lock tokens keyed by wallet id. Different wallets never
/// contend; the same wallet queues behind the sync already running.
#[derive(Clone, Default)]
pub struct WalletLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl WalletLocks {
    pub fn new() -> Self { Self::default() }

    fn slot(&self, wallet_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(wallet_id.to_string()).or_default().clone()
    }

    /// Wait for the wallet's token. Dropping the guard releases it.
    pub async fn acquire(&self, wallet_id: &str) -> OwnedMutexGuard<()> {
        self.slot(wallet_id).lock_owned().await
    }

    /// `None` if a sync for this wallet is already running.
    pub fn try_acquire(&self, wallet_id: &str) -> Option<OwnedMutexGuard<()>> {
        self.slot(wallet_id).try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_wallet_is_exclusive() {
        let locks = WalletLocks::new();
        let guard = locks.acquire("w1").await;
        assert!(locks.try_acquire("w1").is_none());
        assert!(locks.try_acquire("w2").is_some());
        drop(guard);
        assert!(locks.try_acquire("w1").is_some());
    }
}
