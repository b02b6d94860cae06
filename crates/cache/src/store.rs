use dashmap::DashMap;
use std::time::{Duration, Instant};
use txidx_errors::CoreError;

/// The raw KV operations the cache facade needs: opaque-bytes `get`/`set`
/// with a per-key TTL. Any failure is reported as [`CoreError::CacheError`]
/// -- the facade downgrades every one of these to a miss, per the design
/// ("all cache reads are best-effort").
#[async_trait::async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Fetch the raw value for `key`, if present and not expired.
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Store `value` under `key` with the given TTL.
    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CoreError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// An in-process, concurrent-map-backed [`KvStore`].
///
/// This is the cache the core ships with: no external Redis dependency is
/// assumed. The trait boundary exists precisely so a networked
/// implementation can be swapped in later without touching any caller.
#[derive(Debug, Default)]
pub struct InMemoryKv {
    inner: DashMap<String, Entry>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry").field("expires_at", &self.expires_at).finish()
    }
}

impl InMemoryKv {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }

    /// Number of live (possibly stale, not yet swept) entries. Exposed for
    /// tests.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait::async_trait]
impl KvStore for InMemoryKv {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CoreError> {
        let Some(entry) = self.inner.get(key) else {
            return Ok(None);
        };
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.inner.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CoreError> {
        self.inner.insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_value() {
        let kv = InMemoryKv::new();
        kv.set_raw("k", "v".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(kv.get_raw("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entries_read_as_a_miss() {
        let kv = InMemoryKv::new();
        kv.set_raw("k", "v".into(), Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(kv.get_raw("k").await.unwrap(), None);
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let kv = InMemoryKv::new();
        assert_eq!(kv.get_raw("nope").await.unwrap(), None);
    }
}
