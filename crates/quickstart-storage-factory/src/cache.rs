use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use quickstart_core::QuickstartError;
use quickstart_ports::MessageCache;

/// TTL-bounded key/value map guarded by a tokio mutex.
///
/// Expired entries are dropped lazily on each write.
#[derive(Default)]
pub struct InMemoryMessageCache {
    inner: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryMessageCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageCache for InMemoryMessageCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), QuickstartError> {
        let now = Instant::now();
        let mut guard = self.inner.lock().await;
        guard.retain(|_, (_, expires_at)| *expires_at > now);
        guard.insert(key.to_string(), (value.to_string(), now + ttl));
        tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "message cached");
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, QuickstartError> {
        let mut guard = self.inner.lock().await;
        Ok(guard
            .remove(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn take_returns_value_once() {
        let cache = InMemoryMessageCache::new();
        cache.set("u1", "hello", Duration::from_secs(5)).await.unwrap();

        assert_eq!(cache.take("u1").await.unwrap().as_deref(), Some("hello"));
        assert_eq!(cache.take("u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn later_set_overwrites() {
        let cache = InMemoryMessageCache::new();
        cache.set("u1", "first", Duration::from_secs(5)).await.unwrap();
        cache.set("u1", "second", Duration::from_secs(5)).await.unwrap();
        assert_eq!(cache.take("u1").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_read_as_absent() {
        let cache = InMemoryMessageCache::new();
        cache.set("u1", "stale", Duration::from_secs(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.take("u1").await.unwrap(), None);
    }
}
