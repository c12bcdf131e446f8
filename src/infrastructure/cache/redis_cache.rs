//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService, original_key, short_key};
use crate::domain::entities::ShortUrl;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Namespace for every key this cache writes.
const KEY_PREFIX: &str = "shortlink:";

/// Redis cache storing URL records as JSON strings.
///
/// Uses `ConnectionManager` for automatic reconnection; the manager is cloned
/// per operation. Unlike a fail-open cache, errors are returned so the service
/// can decide whether they are fatal.
pub struct RedisCache {
    connection: Mutex<Option<ConnectionManager>>,
    ttl_seconds: u64,
}

impl RedisCache {
    /// Connects to Redis, validates the connection with a PING, and configures the TTL.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `ttl_seconds` - TTL applied to both keys of every cached record;
    ///   controlled via `CACHE_TTL_SECONDS` env var
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            connection: Mutex::new(Some(manager)),
            ttl_seconds,
        })
    }

    fn conn(&self) -> CacheResult<ConnectionManager> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| CacheError::OperationError("connection lock poisoned".to_string()))?;
        guard.clone().ok_or(CacheError::Closed)
    }

    fn build_key(&self, key: String) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    /// Fetches and decodes the record stored at `key`, evicting it when no longer live.
    async fn get_live(&self, key: String) -> CacheResult<Option<ShortUrl>> {
        let mut conn = self.conn()?;
        let key = self.build_key(key);

        let raw = conn
            .get::<_, Option<String>>(&key)
            .await
            .map_err(|e| CacheError::OperationError(format!("GET {}: {}", key, e)))?;

        let Some(raw) = raw else {
            debug!(key = %key, "Cache MISS");
            return Ok(None);
        };

        let url: ShortUrl = serde_json::from_str(&raw)?;

        if !url.is_live() {
            debug!(short = %url.short, "Cached record expired, evicting");
            let keys = vec![
                self.build_key(short_key(&url.short)),
                self.build_key(original_key(&url.original)),
            ];
            if let Err(e) = conn.del::<_, ()>(keys).await {
                warn!(short = %url.short, error = %e, "Failed to evict expired cache entries");
            }
            return Ok(None);
        }

        debug!(key = %key, "Cache HIT");
        Ok(Some(url))
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn set(&self, url: &ShortUrl) -> CacheResult<()> {
        let mut conn = self.conn()?;
        let data = serde_json::to_string(url)?;

        redis::pipe()
            .atomic()
            .set_ex(self.build_key(short_key(&url.short)), &data, self.ttl_seconds)
            .ignore()
            .set_ex(
                self.build_key(original_key(&url.original)),
                &data,
                self.ttl_seconds,
            )
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::OperationError(format!("SET {}: {}", url.short, e)))?;

        debug!(short = %url.short, ttl = self.ttl_seconds, "Cache SET");
        Ok(())
    }

    async fn get_by_short(&self, short: &str) -> CacheResult<Option<ShortUrl>> {
        self.get_live(short_key(short)).await
    }

    async fn get_by_original(&self, original: &str) -> CacheResult<Option<ShortUrl>> {
        self.get_live(original_key(original)).await
    }

    async fn increment_clicks(&self, short: &str) -> CacheResult<()> {
        match self.get_by_short(short).await? {
            Some(mut url) => {
                url.clicks += 1;
                self.set(&url).await
            }
            None => {
                debug!(short = %short, "Click increment skipped, record not cached");
                Ok(())
            }
        }
    }

    async fn delete(&self, short: &str) -> CacheResult<()> {
        // An unreadable entry still loses its short key; only the original key is unknown.
        let cached = match self.get_by_short(short).await {
            Ok(cached) => cached,
            Err(CacheError::Closed) => return Err(CacheError::Closed),
            Err(e) => {
                warn!(short = %short, error = %e, "Failed to read cached record before delete");
                None
            }
        };
        let mut conn = self.conn()?;

        conn.del::<_, ()>(self.build_key(short_key(short)))
            .await
            .map_err(|e| CacheError::OperationError(format!("DEL {}: {}", short, e)))?;

        if let Some(url) = cached {
            conn.del::<_, ()>(self.build_key(original_key(&url.original)))
                .await
                .map_err(|e| CacheError::OperationError(format!("DEL {}: {}", url.original, e)))?;
        }

        debug!(short = %short, "Cache INVALIDATE");
        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| CacheError::OperationError("connection lock poisoned".to_string()))?;
        if guard.take().is_some() {
            info!("Redis cache closed");
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        match self.conn() {
            Ok(mut conn) => conn.ping::<()>().await.is_ok(),
            Err(_) => false,
        }
    }
}
