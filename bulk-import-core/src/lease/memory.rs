use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{LeaseStore, LeaseToken};

struct Held {
    token: String,
    expires_at: Instant,
}

/// Process-local lease store
#[derive(Default)]
pub struct InMemoryLeaseStore {
    leases: Mutex<HashMap<String, Held>>,
}

impl InMemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn try_obtain(&self, key: &str, ttl: Duration) -> anyhow::Result<Option<LeaseToken>> {
        let mut leases = self.leases.lock().await;
        let now = Instant::now();

        if let Some(held) = leases.get(key) {
            if held.expires_at > now {
                return Ok(None);
            }
        }

        let lease = LeaseToken::new(key);
        leases.insert(
            key.to_string(),
            Held {
                token: lease.token.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(Some(lease))
    }

    async fn release(&self, lease: &LeaseToken) -> anyhow::Result<()> {
        let mut leases = self.leases.lock().await;
        if leases
            .get(&lease.key)
            .is_some_and(|held| held.token == lease.token)
        {
            leases.remove(&lease.key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exclusive_until_released() {
        let store = InMemoryLeaseStore::new();
        let ttl = Duration::from_secs(30);

        let first = store.try_obtain("k", ttl).await.unwrap().unwrap();
        assert!(store.try_obtain("k", ttl).await.unwrap().is_none());
        assert!(store.try_obtain("other", ttl).await.unwrap().is_some());

        store.release(&first).await.unwrap();
        assert!(store.try_obtain("k", ttl).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_can_be_taken_over() {
        let store = InMemoryLeaseStore::new();
        let stale = store
            .try_obtain("k", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;

        let fresh = store
            .try_obtain("k", Duration::from_secs(30))
            .await
            .unwrap()
            .unwrap();

        // The crashed holder must not free the new holder's lease
        store.release(&stale).await.unwrap();
        assert!(store
            .try_obtain("k", Duration::from_secs(30))
            .await
            .unwrap()
            .is_none());

        store.release(&fresh).await.unwrap();
    }
}
