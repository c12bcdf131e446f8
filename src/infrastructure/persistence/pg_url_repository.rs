//! PostgreSQL implementation of URL repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{NewHistoryEntry, NewShortUrl, ShortUrl, UrlPatch};
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;
use crate::utils::db_error::is_unique_violation_on_short;

const URL_COLUMNS: &str =
    "id, short, original, title, created_at, expires_at, clicks, creator_reference, deleted_at";

/// Predicate selecting live rows.
const LIVE: &str = "deleted_at IS NULL AND (expires_at IS NULL OR expires_at > NOW())";

#[derive(sqlx::FromRow)]
struct UrlRow {
    id: i64,
    short: String,
    original: String,
    title: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    clicks: i64,
    creator_reference: Option<String>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<UrlRow> for ShortUrl {
    fn from(r: UrlRow) -> Self {
        Self {
            id: r.id,
            short: r.short,
            original: r.original,
            title: r.title,
            created_at: r.created_at,
            expires_at: r.expires_at,
            clicks: r.clicks,
            creator_reference: r.creator_reference,
            deleted_at: r.deleted_at,
        }
    }
}

/// PostgreSQL repository for URL records and their audit history.
///
/// Uniqueness of live short codes rests on the partial unique index
/// `urls_short_live_key`, not on a check-then-insert.
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
}

impl PgUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Checks ownership of a live record before a creator-scoped write.
    async fn ensure_owner(&self, short: &str, creator_reference: &str) -> Result<(), AppError> {
        let url = self
            .find_by_short(short)
            .await?
            .ok_or_else(|| AppError::NotFound(short.to_string()))?;

        if !url.is_owned_by(creator_reference) {
            return Err(AppError::Unauthorized(short.to_string()));
        }
        Ok(())
    }

    /// Classifies a creator-scoped write that matched no row after a passing ownership check.
    async fn scoped_write_miss(&self, short: &str) -> AppError {
        match self.find_by_short(short).await {
            Ok(Some(_)) => AppError::Unauthorized(short.to_string()),
            Ok(None) => AppError::NotFound(short.to_string()),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let mut tx = self.pool.begin().await?;

        // An expired row still holds the unique index until it is soft-deleted.
        sqlx::query(
            r#"
            UPDATE urls SET deleted_at = NOW()
            WHERE short = $1 AND deleted_at IS NULL
              AND expires_at IS NOT NULL AND expires_at <= NOW()
            "#,
        )
        .bind(&new_url.short)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, UrlRow>(&format!(
            r#"
            INSERT INTO urls (short, original, title, expires_at, creator_reference)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {URL_COLUMNS}
            "#
        ))
        .bind(&new_url.short)
        .bind(&new_url.original)
        .bind(&new_url.title)
        .bind(new_url.expires_at)
        .bind(&new_url.creator_reference)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation_on_short(&e) {
                AppError::AlreadyExists(new_url.short.clone())
            } else {
                AppError::Database(e)
            }
        })?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn find_by_short(&self, short: &str) -> Result<Option<ShortUrl>, AppError> {
        let row = sqlx::query_as::<_, UrlRow>(&format!(
            "SELECT {URL_COLUMNS} FROM urls WHERE short = $1 AND {LIVE}"
        ))
        .bind(short)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_original(&self, original: &str) -> Result<Option<ShortUrl>, AppError> {
        let row = sqlx::query_as::<_, UrlRow>(&format!(
            r#"
            SELECT {URL_COLUMNS} FROM urls
            WHERE original = $1 AND {LIVE}
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(original)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_creator(&self, creator_reference: &str) -> Result<Vec<ShortUrl>, AppError> {
        let rows = sqlx::query_as::<_, UrlRow>(&format!(
            r#"
            SELECT {URL_COLUMNS} FROM urls
            WHERE COALESCE(creator_reference, '') = $1 AND {LIVE}
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(creator_reference)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn increment_clicks(&self, short: &str) -> Result<bool, AppError> {
        let result = sqlx::query(&format!(
            "UPDATE urls SET clicks = clicks + 1 WHERE short = $1 AND {LIVE}"
        ))
        .bind(short)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, short: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE urls SET deleted_at = NOW() WHERE short = $1 AND deleted_at IS NULL")
                .bind(short)
                .execute(self.pool.as_ref())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_with_creator(
        &self,
        short: &str,
        creator_reference: &str,
    ) -> Result<(), AppError> {
        self.ensure_owner(short, creator_reference).await?;

        let result = sqlx::query(
            r#"
            UPDATE urls SET deleted_at = NOW()
            WHERE short = $1 AND COALESCE(creator_reference, '') = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(short)
        .bind(creator_reference)
        .execute(self.pool.as_ref())
        .await?;

        // Ownership or liveness changed between the check and the write.
        if result.rows_affected() == 0 {
            return Err(self.scoped_write_miss(short).await);
        }
        Ok(())
    }

    async fn hard_delete(&self, short: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM urls WHERE short = $1")
            .bind(short)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update(&self, short: &str, patch: UrlPatch) -> Result<(), AppError> {
        let result = sqlx::query(&format!(
            r#"
            UPDATE urls SET original = $1, title = $2, expires_at = $3
            WHERE short = $4 AND {LIVE}
            "#
        ))
        .bind(&patch.original)
        .bind(&patch.title)
        .bind(patch.expires_at)
        .bind(short)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(short.to_string()));
        }
        Ok(())
    }

    async fn update_with_creator(
        &self,
        short: &str,
        patch: UrlPatch,
        creator_reference: &str,
    ) -> Result<(), AppError> {
        self.ensure_owner(short, creator_reference).await?;

        let result = sqlx::query(&format!(
            r#"
            UPDATE urls SET original = $1, title = $2, expires_at = $3
            WHERE short = $4 AND COALESCE(creator_reference, '') = $5 AND {LIVE}
            "#
        ))
        .bind(&patch.original)
        .bind(&patch.title)
        .bind(patch.expires_at)
        .bind(short)
        .bind(creator_reference)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.scoped_write_miss(short).await);
        }
        Ok(())
    }

    async fn log_history(&self, entry: NewHistoryEntry) -> Result<(), AppError> {
        let old_value = entry
            .old_value
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let new_value = entry
            .new_value
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO url_history (url_id, url_short, action, old_value, new_value, modified_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.url_id)
        .bind(&entry.url_short)
        .bind(entry.action.as_str())
        .bind(old_value)
        .bind(new_value)
        .bind(&entry.modified_by)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
