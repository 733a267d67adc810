//! Redis-backed derived cache

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use super::DerivedCache;
use crate::error::Result;

/// Derived cache stored in Redis
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;

        info!(url = %url, "Connected to Redis cache");

        Ok(Self { manager })
    }
}

#[async_trait]
impl DerivedCache for RedisCache {
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let removed: u32 = conn.del(key).await?;
        debug!(key = %key, removed = removed, "Cache key invalidated");
        Ok(())
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}
