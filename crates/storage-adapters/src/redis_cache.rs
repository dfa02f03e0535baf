//! Redis-backed listing cache, shared by every instance behind the same
//! Redis. Values are JSON under a key prefix.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use tracing::debug;

use domains::{DomainResult, ForumStats, ListingCache};

use crate::error::StorageError;

const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct RedisListingCache {
    pool: Pool,
    key_prefix: String,
    ttl: Duration,
}

impl RedisListingCache {
    pub fn connect(url: &str) -> Result<Self, StorageError> {
        let pool = PoolConfig::from_url(url).create_pool(Some(Runtime::Tokio1))?;
        Ok(Self {
            pool,
            key_prefix: "huntboard".to_string(),
            ttl: DEFAULT_TTL,
        })
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn generation_key(&self) -> String {
        format!("{}:listings:generation", self.key_prefix)
    }

    /// Stats live under their generation, so entries from before an
    /// invalidation are never read again and simply expire.
    fn stats_key(&self, generation: u64) -> String {
        format!("{}:listings:stats:{generation}", self.key_prefix)
    }

    async fn get_generation(&self) -> Result<u64, StorageError> {
        let mut conn = self.pool.get().await?;
        let generation: Option<u64> = conn.get(self.generation_key()).await?;
        Ok(generation.unwrap_or(0))
    }

    async fn get_stats(&self) -> Result<Option<ForumStats>, StorageError> {
        let generation = self.get_generation().await?;
        let mut conn = self.pool.get().await?;
        let raw: Option<Vec<u8>> = conn.get(self.stats_key(generation)).await?;
        raw.map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn set_stats(&self, stats: ForumStats, generation: u64) -> Result<(), StorageError> {
        if self.get_generation().await? != generation {
            debug!(generation, "dropping stats computed before an invalidation");
            return Ok(());
        }
        let payload = serde_json::to_vec(&stats)?;
        let mut conn = self.pool.get().await?;
        let _: () = conn
            .set_ex(self.stats_key(generation), payload, self.ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn bump_generation(&self) -> Result<(), StorageError> {
        let mut conn = self.pool.get().await?;
        let generation: u64 = conn.incr(self.generation_key(), 1u64).await?;
        debug!(prefix = %self.key_prefix, generation, "redis listing cache invalidated");
        Ok(())
    }
}

#[async_trait]
impl ListingCache for RedisListingCache {
    async fn invalidate_listings(&self) -> DomainResult<()> {
        Ok(self.bump_generation().await?)
    }

    async fn listings_generation(&self) -> DomainResult<u64> {
        Ok(self.get_generation().await?)
    }

    async fn cached_stats(&self) -> DomainResult<Option<ForumStats>> {
        Ok(self.get_stats().await?)
    }

    async fn store_stats(&self, stats: ForumStats, generation: u64) -> DomainResult<()> {
        Ok(self.set_stats(stats, generation).await?)
    }
}
