//! Derived cache module
//!
//! Aggregates computed from a player's inventories (pin and award lists,
//! stamp books) are cached under `"<aggregate>.<player id>"`. The game core
//! only ever invalidates them.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use crate::error::Result;
use crate::game::PlayerId;

pub mod redis;

pub use self::redis::RedisCache;

/// Build the cache key of an aggregate for a player
pub fn cache_key(aggregate: &str, player_id: PlayerId) -> String {
    format!("{}.{}", aggregate, player_id)
}

/// Cache holding derived per-player aggregates
#[async_trait]
pub trait DerivedCache: Send + Sync {
    /// Remove a key; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Process-local cache used in development mode and tests
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    /// Read a value
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    /// Check if a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DerivedCache for MemoryCache {
    async fn delete(&self, key: &str) -> Result<()> {
        let removed = self.entries.remove(key).is_some();
        trace!(key = %key, removed = removed, "Cache key invalidated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(cache_key("pins", 101), "pins.101");
        assert_eq!(cache_key("stamps", 1), "stamps.1");
    }

    #[tokio::test]
    async fn test_memory_cache_delete() {
        let cache = MemoryCache::new();
        cache.set("pins.1", "[]");
        cache.set("pins.2", "[]");

        cache.delete("pins.1").await.unwrap();
        assert!(!cache.contains("pins.1"));
        assert_eq!(cache.get("pins.2").as_deref(), Some("[]"));

        // Missing keys are fine
        cache.delete("pins.1").await.unwrap();
        assert_eq!(cache.len(), 1);
    }
}
