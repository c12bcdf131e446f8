//! Startup wiring: cache selection, database pool, migrations and the click worker.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::application::services::UrlService;
use crate::config::{CacheBackend, Config};
use crate::domain::click_worker::ClickRecorder;
use crate::infrastructure::cache::{CacheService, MemoryCache, NullCache, RedisCache};
use crate::infrastructure::persistence::{
    PgClickRepository, PgUrlRepository, connect_pool, run_migrations,
};
use crate::state::AppState;

/// Builds the cache layer for the configured backend.
///
/// An unreachable Redis degrades to [`NullCache`] instead of failing startup;
/// the durable store stays authoritative either way.
pub async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    match config.cache_backend {
        CacheBackend::Redis => {
            let Some(redis_url) = &config.redis_url else {
                tracing::warn!("CACHE_BACKEND=redis without REDIS_URL. Using NullCache.");
                return Arc::new(NullCache::new());
            };

            match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
                Ok(redis) => {
                    tracing::info!("Cache enabled (Redis)");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                    Arc::new(NullCache::new())
                }
            }
        }
        CacheBackend::Memory => {
            tracing::info!(
                capacity = config.memory_cache_capacity,
                "Cache enabled (in-memory)"
            );
            Arc::new(MemoryCache::new(
                config.memory_cache_capacity,
                Duration::from_secs(config.cache_ttl_seconds),
            ))
        }
        CacheBackend::None => {
            tracing::info!("Cache disabled (NullCache)");
            Arc::new(NullCache::new())
        }
    }
}

/// Connects to every backing service and starts the click worker.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the database stays unreachable after all retries or
/// migrations fail.
pub async fn initialize(config: &Config) -> Result<AppState> {
    let pool = connect_pool(config)
        .await
        .context("Failed to connect to database")?;

    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let cache = build_cache(config).await;

    let pool = Arc::new(pool);
    let url_repository = Arc::new(PgUrlRepository::new(pool.clone()));
    let click_repository = Arc::new(PgClickRepository::new(pool.clone()));
    let url_service = Arc::new(UrlService::new(url_repository, click_repository, cache));

    let clicks = ClickRecorder::spawn(
        url_service.clone(),
        config.click_queue_capacity,
        config.click_worker_concurrency,
    );

    Ok(AppState::new(pool, url_service, clicks))
}
