//! In-process listing cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use domains::{DomainResult, ForumStats, ListingCache};

const STATS_KEY: &str = "forum:stats";

#[derive(Debug, Clone, Copy)]
struct Entry {
    stats: ForumStats,
    generation: u64,
    stored_at: Instant,
}

/// Listing cache for a single instance. Entries live until invalidated or
/// until the optional TTL elapses.
#[derive(Debug, Default)]
pub struct MemoryListingCache {
    entries: DashMap<&'static str, Entry>,
    generation: AtomicU64,
    ttl: Option<Duration>,
}

impl MemoryListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingCache for MemoryListingCache {
    async fn invalidate_listings(&self) -> DomainResult<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.entries.clear();
        debug!(generation, "listing cache cleared");
        Ok(())
    }

    async fn listings_generation(&self) -> DomainResult<u64> {
        Ok(self.current_generation())
    }

    async fn cached_stats(&self) -> DomainResult<Option<ForumStats>> {
        let Some(entry) = self.entries.get(STATS_KEY).map(|e| *e) else {
            return Ok(None);
        };
        let expired = self.ttl.is_some_and(|ttl| entry.stored_at.elapsed() > ttl);
        if expired || entry.generation != self.current_generation() {
            self.entries.remove(STATS_KEY);
            return Ok(None);
        }
        Ok(Some(entry.stats))
    }

    async fn store_stats(&self, stats: ForumStats, generation: u64) -> DomainResult<()> {
        if generation != self.current_generation() {
            debug!(generation, "dropping stats computed before an invalidation");
            return Ok(());
        }
        self.entries.insert(
            STATS_KEY,
            Entry {
                stats,
                generation,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn invalidation_drops_cached_stats() {
        let cache = MemoryListingCache::new();
        let stats = ForumStats {
            threads: 2,
            ..ForumStats::default()
        };
        let generation = cache.listings_generation().await.unwrap();
        assert_ok!(cache.store_stats(stats, generation).await);
        assert_eq!(cache.cached_stats().await.unwrap(), Some(stats));

        assert_ok!(cache.invalidate_listings().await);
        assert_eq!(cache.cached_stats().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stats_computed_across_an_invalidation_are_not_served() {
        let cache = MemoryListingCache::new();
        let seen = cache.listings_generation().await.unwrap();

        // a mutation lands while the stats are being computed
        assert_ok!(cache.invalidate_listings().await);
        assert_ok!(cache.store_stats(ForumStats::default(), seen).await);
        assert_eq!(cache.cached_stats().await.unwrap(), None);

        let fresh = cache.listings_generation().await.unwrap();
        assert_eq!(fresh, seen + 1);
        assert_ok!(cache.store_stats(ForumStats::default(), fresh).await);
        assert!(cache.cached_stats().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = MemoryListingCache::new().with_ttl(Duration::ZERO);
        assert_ok!(cache.store_stats(ForumStats::default(), 0).await);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(cache.cached_stats().await.unwrap(), None);
    }
}
