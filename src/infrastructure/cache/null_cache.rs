//! No-op cache implementation for disabled caching.

use super::service::{CacheResult, CacheService};
use crate::domain::entities::ShortUrl;
use async_trait::async_trait;
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Writes succeed without storing anything and every lookup is a clean miss,
/// so all reads fall through to the durable store.
///
/// # Use Cases
///
/// - `CACHE_BACKEND=none`
/// - Fallback when Redis cannot be reached at startup
pub struct NullCache;

impl NullCache {
    /// Creates a new NullCache instance.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn set(&self, _url: &ShortUrl) -> CacheResult<()> {
        Ok(())
    }

    async fn get_by_short(&self, _short: &str) -> CacheResult<Option<ShortUrl>> {
        Ok(None)
    }

    async fn get_by_original(&self, _original: &str) -> CacheResult<Option<ShortUrl>> {
        Ok(None)
    }

    async fn increment_clicks(&self, _short: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _short: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
