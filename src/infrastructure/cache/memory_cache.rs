//! In-process cache backed by `moka`.

use super::service::{CacheResult, CacheService, original_key, short_key};
use crate::domain::entities::ShortUrl;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, trace};

/// A bounded, TTL-evicting cache living inside the process.
///
/// Suitable for single-node deployments without Redis and for tests. Entries
/// are independent clones of the record, one per lookup axis.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    cache: Cache<String, ShortUrl>,
}

impl MemoryCache {
    /// Creates a cache holding at most `max_capacity` entries, each living `ttl`.
    ///
    /// Every record occupies two entries.
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    async fn get_live(&self, key: String) -> Option<ShortUrl> {
        let url = self.cache.get(&key).await?;

        if !url.is_live() {
            debug!(short = %url.short, "Cached record expired, evicting");
            self.cache.invalidate(&short_key(&url.short)).await;
            self.cache.invalidate(&original_key(&url.original)).await;
            return None;
        }

        trace!(key = %key, "Cache HIT");
        Some(url)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(24 * 60 * 60))
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn set(&self, url: &ShortUrl) -> CacheResult<()> {
        self.cache.insert(short_key(&url.short), url.clone()).await;
        self.cache
            .insert(original_key(&url.original), url.clone())
            .await;
        trace!(short = %url.short, "Cache SET");
        Ok(())
    }

    async fn get_by_short(&self, short: &str) -> CacheResult<Option<ShortUrl>> {
        Ok(self.get_live(short_key(short)).await)
    }

    async fn get_by_original(&self, original: &str) -> CacheResult<Option<ShortUrl>> {
        Ok(self.get_live(original_key(original)).await)
    }

    async fn increment_clicks(&self, short: &str) -> CacheResult<()> {
        if let Some(mut url) = self.get_live(short_key(short)).await {
            url.clicks += 1;
            self.set(&url).await?;
        }
        Ok(())
    }

    async fn delete(&self, short: &str) -> CacheResult<()> {
        let cached = self.get_live(short_key(short)).await;

        self.cache.invalidate(&short_key(short)).await;
        if let Some(url) = cached {
            self.cache.invalidate(&original_key(&url.original)).await;
        }
        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        self.cache.invalidate_all();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
