//! Cache service trait and error types.

use crate::domain::entities::ShortUrl;
use async_trait::async_trait;
use std::fmt;

/// Errors that can occur during cache operations.
///
/// A cache miss is not an error: lookups report it as `Ok(None)`.
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
    SerializationError(String),
    /// The cache was closed with [`CacheService::close`].
    Closed,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
            Self::SerializationError(e) => write!(f, "Cache serialization error: {}", e),
            Self::Closed => write!(f, "Cache is closed"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key under which a record is cached by its short code.
pub(crate) fn short_key(short: &str) -> String {
    format!("short:{}", short)
}

/// Key under which a record is cached by its original URL.
pub(crate) fn original_key(original: &str) -> String {
    format!("original:{}", original)
}

/// Best-effort, TTL-bounded accelerator for URL lookups.
///
/// The cache is never authoritative. Every record is stored twice, once per
/// lookup axis, as full independent copies sharing the same TTL. Lookups apply
/// the same liveness rule as the durable store and evict both copies of a
/// record found to be expired.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process cache
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Stores a record under both its short-code key and its original-URL key.
    ///
    /// Overwriting an existing entry refreshes its TTL.
    async fn set(&self, url: &ShortUrl) -> CacheResult<()>;

    /// Retrieves a live record by short code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(url))` on cache hit
    /// - `Ok(None)` on miss, TTL expiry, or a cached copy whose record has expired
    async fn get_by_short(&self, short: &str) -> CacheResult<Option<ShortUrl>>;

    /// Retrieves a live record by original URL. Same contract as [`Self::get_by_short`].
    async fn get_by_original(&self, original: &str) -> CacheResult<Option<ShortUrl>>;

    /// Increments the cached click counter by rewriting the whole record.
    ///
    /// The rewrite goes through [`Self::set`] and therefore refreshes the TTL,
    /// so frequently clicked records stay cached. The cached counter may lag the
    /// durable one. A miss is a no-op.
    async fn increment_clicks(&self, short: &str) -> CacheResult<()>;

    /// Removes both cached copies of a record.
    ///
    /// The short-code entry is looked up first to find the original-URL key.
    /// Deleting an absent record is not an error.
    async fn delete(&self, short: &str) -> CacheResult<()>;

    /// Releases the underlying connection. Calling it twice is harmless.
    async fn close(&self) -> CacheResult<()>;

    /// Checks if the cache backend is reachable.
    async fn health_check(&self) -> bool;
}
