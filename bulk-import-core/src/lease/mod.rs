//! Per-tracker exclusive leases
//!
//! A lease is a time-bounded lock on a key. Holders release it when they are done;
//! if a holder crashes, the lease expires and the next invocation may take it.
//! The store is a coordination aid only: when it is unavailable, acquisition simply
//! fails and the invocation exits as if another worker held the lease.

pub mod database;
pub mod memory;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

pub use database::DatabaseLeaseStore;
pub use memory::InMemoryLeaseStore;

/// Proof of holding a lease; required to release it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseToken {
    pub key: String,
    pub token: String,
}

impl LeaseToken {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Take the lease on `key` for `ttl`; `None` if someone else holds it
    async fn try_obtain(&self, key: &str, ttl: Duration) -> anyhow::Result<Option<LeaseToken>>;

    /// Give the lease back; a no-op if it expired and was taken by someone else
    async fn release(&self, lease: &LeaseToken) -> anyhow::Result<()>;
}

/// Runs work only while holding the lease for a key
#[derive(Clone)]
pub struct LeaseGuard {
    store: Arc<dyn LeaseStore>,
    timeout: Duration,
}

impl LeaseGuard {
    pub fn new(store: Arc<dyn LeaseStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Run `work` under the lease. Returns `None` without running it when the lease
    /// is held elsewhere or the store cannot be reached. The lease is released
    /// whether `work` succeeds or fails.
    pub async fn try_with_lease<F, Fut, T>(&self, key: &str, work: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lease = match self.store.try_obtain(key, self.timeout).await {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                debug!(lease_key = key, "Lease already held, skipping");
                return None;
            }
            Err(err) => {
                warn!(lease_key = key, error = %err, "Lease store unavailable, skipping");
                return None;
            }
        };

        let result = work().await;

        if let Err(err) = self.store.release(&lease).await {
            // The lease still expires on its own
            warn!(lease_key = key, error = %err, "Failed to release lease");
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenStore;

    #[async_trait]
    impl LeaseStore for BrokenStore {
        async fn try_obtain(&self, _key: &str, _ttl: Duration) -> anyhow::Result<Option<LeaseToken>> {
            anyhow::bail!("lock store offline")
        }

        async fn release(&self, _lease: &LeaseToken) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_runs_work_and_releases() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let guard = LeaseGuard::new(store.clone(), Duration::from_secs(30));

        let result = guard.try_with_lease("tracker:1", || async { 7 }).await;
        assert_eq!(result, Some(7));

        // Released, so a second caller can take it
        assert!(store
            .try_obtain("tracker:1", Duration::from_secs(30))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_held_lease_skips_work() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let _held = store
            .try_obtain("tracker:2", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();
        let guard = LeaseGuard::new(store, Duration::from_secs(30));
        let calls = AtomicUsize::new(0);

        let result = guard
            .try_with_lease("tracker:2", || async {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_not_an_error() {
        let guard = LeaseGuard::new(Arc::new(BrokenStore), Duration::from_secs(30));
        let result = guard.try_with_lease("tracker:3", || async { "ran" }).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_released_after_failed_work() {
        let store = Arc::new(InMemoryLeaseStore::new());
        let guard = LeaseGuard::new(store.clone(), Duration::from_secs(30));

        let result: Option<Result<(), String>> = guard
            .try_with_lease("tracker:4", || async { Err("boom".to_string()) })
            .await;
        assert_eq!(result, Some(Err("boom".to_string())));
        assert!(store
            .try_obtain("tracker:4", Duration::from_secs(30))
            .await
            .unwrap()
            .is_some());
    }
}
