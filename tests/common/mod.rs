#![allow(dead_code)]

use sqlx::PgPool;
use std::sync::Arc;
use shortlink::application::services::UrlService;
use shortlink::domain::entities::{NewShortUrl, ShortUrl};
use shortlink::domain::repositories::UrlRepository;
use shortlink::infrastructure::cache::{CacheService, MemoryCache, NullCache};
use shortlink::infrastructure::persistence::{PgClickRepository, PgUrlRepository};

pub type TestService = UrlService<PgUrlRepository, PgClickRepository>;

pub fn new_url(short: &str, original: &str) -> NewShortUrl {
    NewShortUrl {
        short: short.to_string(),
        original: original.to_string(),
        title: None,
        expires_at: None,
        creator_reference: None,
    }
}

pub async fn create_test_url(pool: &PgPool, short: &str, original: &str) -> ShortUrl {
    PgUrlRepository::new(Arc::new(pool.clone()))
        .create(new_url(short, original))
        .await
        .unwrap()
}

pub async fn create_owned_url(pool: &PgPool, short: &str, original: &str, creator: &str) -> ShortUrl {
    let mut url = new_url(short, original);
    url.creator_reference = Some(creator.to_string());

    PgUrlRepository::new(Arc::new(pool.clone()))
        .create(url)
        .await
        .unwrap()
}

pub async fn create_expired_url(pool: &PgPool, short: &str, original: &str) {
    sqlx::query(
        "INSERT INTO urls (short, original, expires_at) VALUES ($1, $2, NOW() - INTERVAL '1 hour')",
    )
    .bind(short)
    .bind(original)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn create_deleted_url(pool: &PgPool, short: &str, original: &str) {
    sqlx::query("INSERT INTO urls (short, original, deleted_at) VALUES ($1, $2, NOW())")
        .bind(short)
        .bind(original)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn count_history(pool: &PgPool, short: &str, action: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM url_history WHERE url_short = $1 AND action = $2")
        .bind(short)
        .bind(action)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn stored_clicks(pool: &PgPool, short: &str) -> i64 {
    sqlx::query_scalar("SELECT clicks FROM urls WHERE short = $1 AND deleted_at IS NULL")
        .bind(short)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub fn service_with_cache(pool: PgPool, cache: Arc<dyn CacheService>) -> TestService {
    let pool = Arc::new(pool);
    UrlService::new(
        Arc::new(PgUrlRepository::new(pool.clone())),
        Arc::new(PgClickRepository::new(pool)),
        cache,
    )
}

pub fn service(pool: PgPool) -> TestService {
    service_with_cache(pool, Arc::new(NullCache::new()))
}

pub fn memory_cache() -> Arc<MemoryCache> {
    Arc::new(MemoryCache::default())
}
