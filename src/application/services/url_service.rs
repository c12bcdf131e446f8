//! URL shortening service: the canonical protocol over cache and durable store.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::domain::entities::{
    Click, ClickAnalytics, NewClick, NewHistoryEntry, NewShortUrl, ShortUrl, UrlPatch,
};
use crate::domain::repositories::{ClickRepository, UrlRepository};
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::{generate_code, validate_custom_code};
use crate::utils::url_validator::validate_url;

/// Attempts at drawing an unused random code before giving up.
const MAX_GENERATION_ATTEMPTS: usize = 5;

/// Orchestrates the durable repositories and the cache.
///
/// Writes go to the repository first and are mirrored into the cache; reads try
/// the cache first and repopulate it from the repository on a miss. Cache
/// failures are logged and tolerated everywhere except on creation, where a
/// freshly created record must be cache-consistent on return.
///
/// The service holds only shared handles and is safe to call concurrently.
pub struct UrlService<U: UrlRepository, K: ClickRepository> {
    url_repository: Arc<U>,
    click_repository: Arc<K>,
    cache: Arc<dyn CacheService>,
}

impl<U: UrlRepository, K: ClickRepository> UrlService<U, K> {
    /// Creates a new URL service.
    pub fn new(url_repository: Arc<U>, click_repository: Arc<K>, cache: Arc<dyn CacheService>) -> Self {
        Self {
            url_repository,
            click_repository,
            cache,
        }
    }

    /// Creates a short URL.
    ///
    /// # Arguments
    ///
    /// - `original` - The destination URL, stored exactly as given
    /// - `custom_code` - Optional short code; a random 6-character code is generated otherwise
    /// - `title` - Optional display label
    /// - `ttl` - Lifetime of the record; `None` or zero means it never expires
    /// - `creator_reference` - Optional owner identity for creator-scoped operations
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidUrl`] if `original` is not an absolute http(s) URL.
    /// Returns [`AppError::InvalidCode`] if the custom code has disallowed characters.
    /// Returns [`AppError::AlreadyExists`] if the custom code is taken, a concurrent
    /// creation won the code, or no free random code was found.
    /// Returns a store failure if the repository or the cache fails.
    pub async fn create_short_url(
        &self,
        original: String,
        custom_code: Option<String>,
        title: Option<String>,
        ttl: Option<Duration>,
        creator_reference: Option<String>,
    ) -> Result<ShortUrl, AppError> {
        debug!(original = %original, custom_code = ?custom_code, ttl = ?ttl, "Creating short URL");

        validate_url(&original)?;

        let short = match custom_code.filter(|c| !c.is_empty()) {
            Some(custom) => {
                validate_custom_code(&custom)?;
                self.ensure_code_unused(&custom).await?;
                custom
            }
            None => self.generate_unique_code().await?,
        };

        let new_url = NewShortUrl {
            short,
            original,
            title: title.filter(|t| !t.is_empty()),
            expires_at: expiry_from_ttl(ttl),
            creator_reference: creator_reference.filter(|c| !c.is_empty()),
        };

        let created = self.url_repository.create(new_url).await.inspect_err(|e| {
            error!(error = %e, "Failed to save URL to database");
        })?;

        self.cache.set(&created).await?;

        info!(
            id = created.id,
            short = %created.short,
            original = %created.original,
            expires_at = ?created.expires_at,
            "Short URL created"
        );
        Ok(created)
    }

    /// Retrieves a live record by short code, cache first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record uses the code.
    /// Returns a store failure if the repository fails. Cache failures are logged only.
    pub async fn get_by_short(&self, short: &str) -> Result<ShortUrl, AppError> {
        match self.cache.get_by_short(short).await {
            Ok(Some(url)) => {
                debug!(short = %short, "URL served from cache");
                return Ok(url);
            }
            Ok(None) => debug!(short = %short, "URL not cached, checking database"),
            Err(e) => warn!(short = %short, error = %e, "Cache error, falling back to database"),
        }

        let url = self
            .url_repository
            .find_by_short(short)
            .await?
            .ok_or_else(|| AppError::NotFound(short.to_string()))?;

        self.repopulate(&url).await;
        Ok(url)
    }

    /// Retrieves a live record by its original URL, cache first.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_by_short`].
    pub async fn get_by_original(&self, original: &str) -> Result<ShortUrl, AppError> {
        match self.cache.get_by_original(original).await {
            Ok(Some(url)) => {
                debug!(original = %original, "URL served from cache");
                return Ok(url);
            }
            Ok(None) => debug!(original = %original, "URL not cached, checking database"),
            Err(e) => {
                warn!(original = %original, error = %e, "Cache error, falling back to database")
            }
        }

        let url = self
            .url_repository
            .find_by_original(original)
            .await?
            .ok_or_else(|| AppError::NotFound(original.to_string()))?;

        self.repopulate(&url).await;
        Ok(url)
    }

    /// Lists every live record owned by `creator_reference`. Reads bypass the cache.
    pub async fn get_by_creator(&self, creator_reference: &str) -> Result<Vec<ShortUrl>, AppError> {
        let urls = self.url_repository.find_by_creator(creator_reference).await?;
        debug!(creator_reference = %creator_reference, count = urls.len(), "URLs listed by creator");
        Ok(urls)
    }

    /// Increments the click counter.
    ///
    /// The repository counter is authoritative; the cached copy is bumped
    /// afterwards and may lag. A code with no live record is not an error.
    ///
    /// # Errors
    ///
    /// Returns a store failure if the repository update fails.
    pub async fn increment_clicks(&self, short: &str) -> Result<(), AppError> {
        if !self.url_repository.increment_clicks(short).await? {
            debug!(short = %short, "No live record to increment");
        }

        if let Err(e) = self.cache.increment_clicks(short).await {
            warn!(short = %short, error = %e, "Failed to increment click count in cache");
        }

        Ok(())
    }

    /// Records a visit unless the same visitor clicked within the dedup window.
    ///
    /// Does not touch the click counter; call [`Self::increment_clicks`] after a
    /// successful recording.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::RecentClick`] for a repeat visit. This is a signal to
    /// skip the counter, not a fault.
    /// Returns [`AppError::NotFound`] if no live record uses the code.
    /// Returns a store failure if the repository fails.
    pub async fn record_click(
        &self,
        short: &str,
        ip: &str,
        location: &str,
        browser: &str,
        device: &str,
    ) -> Result<Click, AppError> {
        if self
            .click_repository
            .has_recent_click(short, ip, browser, device)
            .await?
        {
            return Err(AppError::RecentClick(short.to_string()));
        }

        let url = self.get_by_short(short).await?;

        let click = self
            .click_repository
            .store_click(NewClick::new(url.id, short, ip, location, browser, device))
            .await?;

        debug!(short = %short, click_id = click.id, "Click recorded");
        Ok(click)
    }

    /// Soft-deletes a record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record uses the code.
    /// Returns a store failure if the repository fails.
    pub async fn delete(&self, short: &str) -> Result<(), AppError> {
        self.delete_inner(short, None).await
    }

    /// Soft-deletes a record owned by `creator_reference`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the record belongs to someone else.
    /// Otherwise the same as [`Self::delete`].
    pub async fn delete_with_creator(
        &self,
        short: &str,
        creator_reference: &str,
    ) -> Result<(), AppError> {
        self.delete_inner(short, Some(creator_reference)).await
    }

    /// Physically removes a record with its clicks and history, and evicts it from the cache.
    ///
    /// Returns `false` if no row matched. Used for cleanup, bypasses the read path.
    pub async fn purge(&self, short: &str) -> Result<bool, AppError> {
        let removed = self.url_repository.hard_delete(short).await?;

        if let Err(e) = self.cache.delete(short).await {
            warn!(short = %short, error = %e, "Failed to delete URL from cache");
        }

        info!(short = %short, removed, "URL purged");
        Ok(removed)
    }

    /// Overwrites the destination, title and optionally the expiry of a record.
    ///
    /// A `ttl` of `None` or zero keeps the current expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record uses the code.
    /// Returns [`AppError::InvalidUrl`] if a changed destination is not a valid URL.
    /// Returns a store failure if the repository fails.
    pub async fn update_url(
        &self,
        short: &str,
        title: Option<String>,
        original: String,
        ttl: Option<Duration>,
    ) -> Result<ShortUrl, AppError> {
        self.update_inner(short, title, original, ttl, None).await
    }

    /// Like [`Self::update_url`], restricted to the record's owner.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the record belongs to someone else.
    /// Otherwise the same as [`Self::update_url`].
    pub async fn update_url_with_creator(
        &self,
        short: &str,
        title: Option<String>,
        original: String,
        ttl: Option<Duration>,
        creator_reference: &str,
    ) -> Result<ShortUrl, AppError> {
        self.update_inner(short, title, original, ttl, Some(creator_reference))
            .await
    }

    /// Lists every click for a code, newest first.
    pub async fn get_clicks_by_short(&self, short: &str) -> Result<Vec<Click>, AppError> {
        self.click_repository.find_by_short(short).await
    }

    /// Aggregates all clicks for a code by browser, device and location.
    pub async fn get_click_analytics(&self, short: &str) -> Result<ClickAnalytics, AppError> {
        self.click_repository.analytics(short).await
    }

    /// Reports whether the cache backend answers.
    pub async fn cache_healthy(&self) -> bool {
        self.cache.health_check().await
    }

    /// Releases the cache connection.
    pub async fn close(&self) -> Result<(), AppError> {
        self.cache.close().await?;
        Ok(())
    }

    async fn delete_inner(
        &self,
        short: &str,
        creator_reference: Option<&str>,
    ) -> Result<(), AppError> {
        let url = self.get_by_short(short).await?;
        // Checked before history so rejected attempts leave no audit entry.
        ensure_owned(&url, creator_reference)?;

        self.log_history(NewHistoryEntry::deletion(&url, creator_reference))
            .await;

        match creator_reference {
            Some(creator) => {
                self.url_repository
                    .soft_delete_with_creator(short, creator)
                    .await?
            }
            None => {
                self.url_repository.soft_delete(short).await?;
            }
        }

        if let Err(e) = self.cache.delete(short).await {
            warn!(short = %short, error = %e, "Failed to delete URL from cache");
        }

        info!(short = %short, creator_reference = ?creator_reference, "URL deleted");
        Ok(())
    }

    async fn update_inner(
        &self,
        short: &str,
        title: Option<String>,
        original: String,
        ttl: Option<Duration>,
        creator_reference: Option<&str>,
    ) -> Result<ShortUrl, AppError> {
        let existing = self.get_by_short(short).await?;
        // Checked before history so rejected attempts leave no audit entry.
        ensure_owned(&existing, creator_reference)?;

        let original_changed = original != existing.original;
        if original_changed {
            validate_url(&original)?;
        }

        let updated = ShortUrl {
            original,
            title: title.filter(|t| !t.is_empty()),
            expires_at: expiry_from_ttl(ttl).or(existing.expires_at),
            ..existing.clone()
        };

        self.log_history(NewHistoryEntry::update(&existing, &updated, creator_reference))
            .await;

        let patch = UrlPatch::from(&updated);
        match creator_reference {
            Some(creator) => {
                self.url_repository
                    .update_with_creator(short, patch, creator)
                    .await?
            }
            None => self.url_repository.update(short, patch).await?,
        }

        // The entry under the old original URL would otherwise outlive the change.
        if original_changed && let Err(e) = self.cache.delete(short).await {
            warn!(short = %short, error = %e, "Failed to evict stale cache entries");
        }
        if let Err(e) = self.cache.set(&updated).await {
            warn!(short = %short, error = %e, "Failed to update URL in cache");
        }

        info!(short = %short, creator_reference = ?creator_reference, "URL updated");
        Ok(updated)
    }

    /// Returns `Ok(())` if no live record uses `code`.
    async fn ensure_code_unused(&self, code: &str) -> Result<(), AppError> {
        match self.get_by_short(code).await {
            Ok(_) => Err(AppError::AlreadyExists(code.to_string())),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Draws random codes until one is unused.
    ///
    /// Lookup failures other than not-found count as a spent attempt.
    async fn generate_unique_code(&self) -> Result<String, AppError> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let code = match generate_code() {
                Ok(code) => code,
                Err(e) => {
                    warn!(attempt, error = %e, "Random source failed");
                    continue;
                }
            };

            match self.get_by_short(&code).await {
                Err(e) if e.is_not_found() => return Ok(code),
                Ok(_) => debug!(attempt, code = %code, "Generated code already in use"),
                Err(e) => warn!(attempt, code = %code, error = %e, "Failed to check generated code"),
            }
        }

        error!("Exhausted short code generation attempts");
        Err(AppError::AlreadyExists(format!(
            "no unused code after {} attempts",
            MAX_GENERATION_ATTEMPTS
        )))
    }

    /// Best-effort cache fill after a repository hit.
    async fn repopulate(&self, url: &ShortUrl) {
        if let Err(e) = self.cache.set(url).await {
            warn!(short = %url.short, error = %e, "Failed to cache URL");
        }
    }

    /// Best-effort audit write.
    async fn log_history(&self, entry: NewHistoryEntry) {
        let short = entry.url_short.clone();
        let action = entry.action;
        if let Err(e) = self.url_repository.log_history(entry).await {
            warn!(short = %short, action = %action, error = %e, "Failed to log URL history");
        }
    }
}

/// Rejects a creator-scoped write on a record owned by someone else.
///
/// The repository repeats the check atomically with the write.
fn ensure_owned(url: &ShortUrl, creator_reference: Option<&str>) -> Result<(), AppError> {
    match creator_reference {
        Some(creator) if !url.is_owned_by(creator) => Err(AppError::Unauthorized(url.short.clone())),
        _ => Ok(()),
    }
}

/// Absolute expiry for a lifetime; `None` for no lifetime, a zero one, or one past the calendar.
fn expiry_from_ttl(ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    let ttl = ttl.filter(|t| !t.is_zero())?;
    let ttl = chrono::Duration::from_std(ttl).ok()?;
    Utc::now().checked_add_signed(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::url::sample_url;
    use crate::domain::repositories::{MockClickRepository, MockUrlRepository};
    use crate::infrastructure::cache::{CacheError, MemoryCache, MockCacheService, NullCache};
    use chrono::Duration as ChronoDuration;

    fn service(
        url_repo: MockUrlRepository,
        click_repo: MockClickRepository,
        cache: Arc<dyn CacheService>,
    ) -> UrlService<MockUrlRepository, MockClickRepository> {
        UrlService::new(Arc::new(url_repo), Arc::new(click_repo), cache)
    }

    fn memory_cache() -> Arc<dyn CacheService> {
        Arc::new(MemoryCache::new(100, Duration::from_secs(60)))
    }

    /// What the store would hand back for `new_url`.
    fn stored(id: i64, new_url: NewShortUrl) -> ShortUrl {
        ShortUrl {
            id,
            short: new_url.short,
            original: new_url.original,
            title: new_url.title,
            created_at: Utc::now(),
            expires_at: new_url.expires_at,
            clicks: 0,
            creator_reference: new_url.creator_reference,
            deleted_at: None,
        }
    }

    fn cache_down() -> CacheError {
        CacheError::ConnectionError("connection refused".to_string())
    }

    #[tokio::test]
    async fn test_create_generates_code_and_caches_record() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .times(1)
            .returning(|_| Ok(None));
        url_repo
            .expect_create()
            .withf(|new_url| new_url.short.len() == 6 && new_url.original == "https://example.com")
            .times(1)
            .returning(|new_url| Ok(stored(1, new_url)));

        let mut cache = MockCacheService::new();
        cache.expect_get_by_short().times(1).returning(|_| Ok(None));
        cache
            .expect_set()
            .withf(|url| url.id == 1)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(url_repo, MockClickRepository::new(), Arc::new(cache));

        let url = service
            .create_short_url(
                "https://example.com".to_string(),
                None,
                Some("My Site".to_string()),
                Some(Duration::from_secs(3600)),
                Some("user1".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(url.short.len(), 6);
        assert_eq!(url.clicks, 0);
        assert_eq!(url.title.as_deref(), Some("My Site"));
        assert_eq!(url.creator_reference.as_deref(), Some("user1"));

        let expires_in = url.expires_at.unwrap() - Utc::now();
        assert!(expires_in > ChronoDuration::minutes(59));
        assert!(expires_in <= ChronoDuration::hours(1));
    }

    #[tokio::test]
    async fn test_create_without_ttl_never_expires() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_create()
            .withf(|new_url| new_url.expires_at.is_none() && new_url.short == "promo")
            .times(1)
            .returning(|new_url| Ok(stored(1, new_url)));
        url_repo.expect_find_by_short().returning(|_| Ok(None));

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let url = service
            .create_short_url(
                "https://example.com".to_string(),
                Some("promo".to_string()),
                None,
                Some(Duration::ZERO),
                None,
            )
            .await
            .unwrap();

        assert!(url.expires_at.is_none());
        assert!(url.creator_reference.is_none());
    }

    #[tokio::test]
    async fn test_create_invalid_url() {
        let service = service(
            MockUrlRepository::new(),
            MockClickRepository::new(),
            Arc::new(MockCacheService::new()),
        );

        let result = service
            .create_short_url("not-a-url".to_string(), None, None, None, None)
            .await;

        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_create_invalid_custom_code() {
        let service = service(
            MockUrlRepository::new(),
            MockClickRepository::new(),
            Arc::new(MockCacheService::new()),
        );

        let result = service
            .create_short_url(
                "https://example.com".to_string(),
                Some("has/slash".to_string()),
                None,
                None,
                None,
            )
            .await;

        assert!(matches!(result, Err(AppError::InvalidCode(_))));
    }

    #[tokio::test]
    async fn test_create_custom_code_taken() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .withf(|short| short == "taken")
            .times(1)
            .returning(|_| Ok(Some(sample_url(5, "taken", "https://other.com"))));
        url_repo.expect_create().times(0);

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let result = service
            .create_short_url(
                "https://example.com".to_string(),
                Some("taken".to_string()),
                None,
                None,
                None,
            )
            .await;

        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_create_custom_code_taken_in_cache() {
        let cache = memory_cache();
        cache
            .set(&sample_url(5, "taken", "https://other.com"))
            .await
            .unwrap();

        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().times(0);
        url_repo.expect_create().times(0);

        let service = service(url_repo, MockClickRepository::new(), cache);

        let result = service
            .create_short_url(
                "https://example.com".to_string(),
                Some("taken".to_string()),
                None,
                None,
                None,
            )
            .await;

        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_create_lost_race_reports_already_exists() {
        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().returning(|_| Ok(None));
        url_repo
            .expect_create()
            .times(1)
            .returning(|new_url| Err(AppError::AlreadyExists(new_url.short)));

        let mut cache = MockCacheService::new();
        cache.expect_get_by_short().returning(|_| Ok(None));
        cache.expect_set().times(0);

        let service = service(url_repo, MockClickRepository::new(), Arc::new(cache));

        let result = service
            .create_short_url(
                "https://example.com".to_string(),
                Some("race".to_string()),
                None,
                None,
                None,
            )
            .await;

        assert!(matches!(result, Err(AppError::AlreadyExists(code)) if code == "race"));
    }

    #[tokio::test]
    async fn test_create_cache_failure_is_fatal() {
        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().returning(|_| Ok(None));
        url_repo
            .expect_create()
            .times(1)
            .returning(|new_url| Ok(stored(1, new_url)));

        let mut cache = MockCacheService::new();
        cache.expect_get_by_short().returning(|_| Ok(None));
        cache.expect_set().times(1).returning(|_| Err(cache_down()));

        let service = service(url_repo, MockClickRepository::new(), Arc::new(cache));

        let result = service
            .create_short_url(
                "https://example.com".to_string(),
                Some("fresh".to_string()),
                None,
                None,
                None,
            )
            .await;

        assert!(matches!(result, Err(AppError::Cache(_))));
    }

    #[tokio::test]
    async fn test_create_code_generation_exhausted() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .times(MAX_GENERATION_ATTEMPTS)
            .returning(|short| Ok(Some(sample_url(1, short, "https://other.com"))));
        url_repo.expect_create().times(0);

        let service = service(url_repo, MockClickRepository::new(), Arc::new(NullCache::new()));

        let result = service
            .create_short_url("https://example.com".to_string(), None, None, None, None)
            .await;

        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_create_generation_survives_lookup_failure() {
        let mut url_repo = MockUrlRepository::new();
        let mut calls = 0;
        url_repo
            .expect_find_by_short()
            .times(2)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Err(AppError::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(None)
                }
            });
        url_repo
            .expect_create()
            .times(1)
            .returning(|new_url| Ok(stored(1, new_url)));

        let service = service(url_repo, MockClickRepository::new(), Arc::new(NullCache::new()));

        let result = service
            .create_short_url("https://example.com".to_string(), None, None, None, None)
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_get_by_short_cache_hit_skips_repository() {
        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().times(0);

        let mut cache = MockCacheService::new();
        cache
            .expect_get_by_short()
            .times(1)
            .returning(|_| Ok(Some(sample_url(1, "abc123", "https://example.com"))));

        let service = service(url_repo, MockClickRepository::new(), Arc::new(cache));

        let url = service.get_by_short("abc123").await.unwrap();
        assert_eq!(url.original, "https://example.com");
    }

    #[tokio::test]
    async fn test_get_by_short_reads_through_once() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .withf(|short| short == "abc123")
            .times(1)
            .returning(|_| Ok(Some(sample_url(1, "abc123", "https://example.com"))));

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let first = service.get_by_short("abc123").await.unwrap();
        let second = service.get_by_short("abc123").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_get_by_original_reads_through_once() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_original()
            .times(1)
            .returning(|_| Ok(Some(sample_url(1, "abc123", "https://example.com"))));
        url_repo.expect_find_by_short().times(0);

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let first = service.get_by_original("https://example.com").await.unwrap();
        // Populated under both keys.
        let by_short = service.get_by_short("abc123").await.unwrap();

        assert_eq!(first, by_short);
    }

    #[tokio::test]
    async fn test_get_by_short_tolerates_cache_errors() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .times(1)
            .returning(|_| Ok(Some(sample_url(1, "abc123", "https://example.com"))));

        let mut cache = MockCacheService::new();
        cache
            .expect_get_by_short()
            .returning(|_| Err(cache_down()));
        cache.expect_set().returning(|_| Err(cache_down()));

        let service = service(url_repo, MockClickRepository::new(), Arc::new(cache));

        assert!(service.get_by_short("abc123").await.is_ok());
    }

    #[tokio::test]
    async fn test_get_by_short_not_found() {
        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().returning(|_| Ok(None));

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let result = service.get_by_short("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_by_short_repository_error_is_fatal() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let result = service.get_by_short("abc123").await;
        assert!(result.unwrap_err().is_store_failure());
    }

    #[tokio::test]
    async fn test_expired_record_unreachable_through_cache() {
        let cache = memory_cache();
        let mut expired = sample_url(1, "old123", "https://expired.test");
        expired.expires_at = Some(Utc::now() - ChronoDuration::minutes(1));
        cache.set(&expired).await.unwrap();

        // The store filters expired rows out of its lookups.
        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().returning(|_| Ok(None));
        url_repo.expect_find_by_original().returning(|_| Ok(None));

        let service = service(url_repo, MockClickRepository::new(), cache);

        assert!(matches!(
            service.get_by_short("old123").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.get_by_original("https://expired.test").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_increment_clicks_tolerates_cache_errors() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_increment_clicks()
            .times(1)
            .returning(|_| Ok(true));

        let mut cache = MockCacheService::new();
        cache
            .expect_increment_clicks()
            .times(1)
            .returning(|_| Err(cache_down()));

        let service = service(url_repo, MockClickRepository::new(), Arc::new(cache));

        assert!(service.increment_clicks("abc123").await.is_ok());
    }

    #[tokio::test]
    async fn test_increment_clicks_repository_error_is_fatal() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_increment_clicks()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let mut cache = MockCacheService::new();
        cache.expect_increment_clicks().times(0);

        let service = service(url_repo, MockClickRepository::new(), Arc::new(cache));

        assert!(service.increment_clicks("abc123").await.is_err());
    }

    #[tokio::test]
    async fn test_record_click_recent_visitor() {
        let mut click_repo = MockClickRepository::new();
        click_repo
            .expect_has_recent_click()
            .withf(|short, ip, browser, device| {
                short == "abc123" && ip == "1.2.3.4" && browser == "Chrome" && device == "Desktop"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));
        click_repo.expect_store_click().times(0);

        let service = service(MockUrlRepository::new(), click_repo, memory_cache());

        let result = service
            .record_click("abc123", "1.2.3.4", "Unknown", "Chrome", "Desktop")
            .await;

        assert!(matches!(result, Err(AppError::RecentClick(_))));
    }

    #[tokio::test]
    async fn test_record_click_stores_click_for_record() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .returning(|_| Ok(Some(sample_url(42, "abc123", "https://example.com"))));

        let mut click_repo = MockClickRepository::new();
        click_repo
            .expect_has_recent_click()
            .returning(|_, _, _, _| Ok(false));
        click_repo
            .expect_store_click()
            .withf(|click| click.url_id == 42 && click.url_short == "abc123" && click.browser == "Firefox")
            .times(1)
            .returning(|c| {
                Ok(Click {
                    id: 7,
                    url_id: c.url_id,
                    url_short: c.url_short,
                    ip: c.ip,
                    location: c.location,
                    browser: c.browser,
                    device: c.device,
                    timestamp: c.timestamp,
                })
            });

        let service = service(url_repo, click_repo, memory_cache());

        let click = service
            .record_click("abc123", "1.2.3.4", "Unknown", "Firefox", "Mobile")
            .await
            .unwrap();

        assert_eq!(click.id, 7);
        assert_eq!(click.device, "Mobile");
    }

    #[tokio::test]
    async fn test_record_click_unknown_code() {
        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().returning(|_| Ok(None));

        let mut click_repo = MockClickRepository::new();
        click_repo
            .expect_has_recent_click()
            .returning(|_, _, _, _| Ok(false));
        click_repo.expect_store_click().times(0);

        let service = service(url_repo, click_repo, memory_cache());

        let result = service
            .record_click("missing", "1.2.3.4", "Unknown", "Chrome", "Desktop")
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_survives_history_and_cache_failures() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .returning(|_| Ok(Some(sample_url(1, "abc123", "https://example.com"))));
        url_repo
            .expect_log_history()
            .withf(|entry| entry.old_value.is_some() && entry.new_value.is_none())
            .times(1)
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        url_repo
            .expect_soft_delete()
            .times(1)
            .returning(|_| Ok(true));

        let mut cache = MockCacheService::new();
        cache.expect_get_by_short().returning(|_| Ok(None));
        cache.expect_set().returning(|_| Ok(()));
        cache
            .expect_delete()
            .times(1)
            .returning(|_| Err(cache_down()));

        let service = service(url_repo, MockClickRepository::new(), Arc::new(cache));

        assert!(service.delete("abc123").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().returning(|_| Ok(None));
        url_repo.expect_log_history().times(0);
        url_repo.expect_soft_delete().times(0);

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        assert!(matches!(
            service.delete("missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_with_creator_unauthorized() {
        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().returning(|_| {
            let mut url = sample_url(1, "abc123", "https://example.com");
            url.creator_reference = Some("A".to_string());
            Ok(Some(url))
        });
        url_repo.expect_log_history().times(0);
        url_repo.expect_soft_delete_with_creator().times(0);

        let cache = memory_cache();
        let service = service(url_repo, MockClickRepository::new(), cache.clone());

        let result = service.delete_with_creator("abc123", "B").await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        // Still cached: the failed delete must not evict it.
        assert!(cache.get_by_short("abc123").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_with_creator_unauthorized() {
        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().returning(|_| {
            let mut url = sample_url(1, "abc123", "https://example.com");
            url.creator_reference = Some("A".to_string());
            Ok(Some(url))
        });
        url_repo.expect_log_history().times(0);
        url_repo.expect_update_with_creator().times(0);

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let result = service
            .update_url_with_creator(
                "abc123",
                None,
                "https://example.com/new".to_string(),
                None,
                "B",
            )
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_update_preserves_expiry_without_ttl() {
        let expires_at = Utc::now() + ChronoDuration::days(2);

        let mut url_repo = MockUrlRepository::new();
        url_repo.expect_find_by_short().returning(move |_| {
            let mut url = sample_url(1, "abc123", "https://example.com");
            url.expires_at = Some(expires_at);
            url.clicks = 9;
            Ok(Some(url))
        });
        url_repo.expect_log_history().returning(|_| Ok(()));
        url_repo
            .expect_update()
            .withf(move |short, patch| short == "abc123" && patch.expires_at == Some(expires_at))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let updated = service
            .update_url(
                "abc123",
                Some("Renamed".to_string()),
                "https://example.com".to_string(),
                Some(Duration::ZERO),
            )
            .await
            .unwrap();

        assert_eq!(updated.expires_at, Some(expires_at));
        assert_eq!(updated.clicks, 9);
        assert_eq!(updated.title.as_deref(), Some("Renamed"));
    }

    #[tokio::test]
    async fn test_update_recomputes_expiry_with_ttl() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .returning(|_| Ok(Some(sample_url(1, "abc123", "https://example.com"))));
        url_repo.expect_log_history().returning(|_| Ok(()));
        url_repo
            .expect_update()
            .withf(|_, patch| patch.expires_at.is_some())
            .times(1)
            .returning(|_, _| Ok(()));

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let updated = service
            .update_url(
                "abc123",
                None,
                "https://example.com".to_string(),
                Some(Duration::from_secs(600)),
            )
            .await
            .unwrap();

        assert!(updated.expires_at.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_url() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .returning(|_| Ok(Some(sample_url(1, "abc123", "https://example.com"))));
        url_repo.expect_update().times(0);

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let result = service
            .update_url("abc123", None, "javascript:alert(1)".to_string(), None)
            .await;

        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_update_moves_cached_original_key() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .returning(|_| Ok(Some(sample_url(1, "abc123", "https://old.example.com"))));
        url_repo.expect_log_history().returning(|_| Ok(()));
        url_repo.expect_update().returning(|_, _| Ok(()));
        url_repo.expect_find_by_original().returning(|_| Ok(None));

        let cache = memory_cache();
        let service = service(url_repo, MockClickRepository::new(), cache.clone());

        service
            .update_url("abc123", None, "https://new.example.com".to_string(), None)
            .await
            .unwrap();

        assert!(
            cache
                .get_by_original("https://old.example.com")
                .await
                .unwrap()
                .is_none()
        );
        let cached = cache.get_by_short("abc123").await.unwrap().unwrap();
        assert_eq!(cached.original, "https://new.example.com");
    }

    #[tokio::test]
    async fn test_create_get_increment_scenario() {
        let mut url_repo = MockUrlRepository::new();
        url_repo
            .expect_find_by_short()
            .times(1)
            .returning(|_| Ok(None));
        url_repo
            .expect_create()
            .times(1)
            .returning(|new_url| Ok(stored(1, new_url)));
        url_repo
            .expect_increment_clicks()
            .times(1)
            .returning(|_| Ok(true));

        let service = service(url_repo, MockClickRepository::new(), memory_cache());

        let created = service
            .create_short_url(
                "https://example.com".to_string(),
                None,
                Some("My Site".to_string()),
                Some(Duration::from_secs(3600)),
                Some("user1".to_string()),
            )
            .await
            .unwrap();

        let fetched = service.get_by_short(&created.short).await.unwrap();
        assert_eq!(fetched.original, "https://example.com");
        assert_eq!(fetched.title.as_deref(), Some("My Site"));

        service.increment_clicks(&created.short).await.unwrap();

        let fetched = service.get_by_short(&created.short).await.unwrap();
        assert_eq!(fetched.clicks, 1);
    }

    #[test]
    fn test_expiry_from_ttl() {
        assert!(expiry_from_ttl(None).is_none());
        assert!(expiry_from_ttl(Some(Duration::ZERO)).is_none());
        assert!(expiry_from_ttl(Some(Duration::MAX)).is_none());
        assert!(expiry_from_ttl(Some(Duration::from_secs(60))).unwrap() > Utc::now());
    }
}
