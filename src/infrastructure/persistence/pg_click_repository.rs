//! PostgreSQL implementation of click repository.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::entities::{Click, ClickAnalytics, NewClick};
use crate::domain::repositories::{ClickRepository, RECENT_CLICK_WINDOW_SECS};
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct ClickRow {
    id: i64,
    url_id: i64,
    url_short: String,
    ip: String,
    location: String,
    browser: String,
    device: String,
    timestamp: DateTime<Utc>,
}

impl From<ClickRow> for Click {
    fn from(r: ClickRow) -> Self {
        Self {
            id: r.id,
            url_id: r.url_id,
            url_short: r.url_short,
            ip: r.ip,
            location: r.location,
            browser: r.browser,
            device: r.device,
            timestamp: r.timestamp,
        }
    }
}

/// PostgreSQL repository for click tracking and analytics.
pub struct PgClickRepository {
    pool: Arc<PgPool>,
}

impl PgClickRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Counts clicks for `short` grouped by one column.
    ///
    /// `column` is always one of a fixed set of identifiers, never user input.
    async fn group_by(&self, short: &str, column: &str) -> Result<BTreeMap<String, i64>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(&format!(
            "SELECT {column}, COUNT(*) FROM clicks WHERE url_short = $1 GROUP BY {column}"
        ))
        .bind(short)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl ClickRepository for PgClickRepository {
    async fn store_click(&self, new_click: NewClick) -> Result<Click, AppError> {
        let row = sqlx::query_as::<_, ClickRow>(
            r#"
            INSERT INTO clicks (url_id, url_short, ip, location, browser, device, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, url_id, url_short, ip, location, browser, device, timestamp
            "#,
        )
        .bind(new_click.url_id)
        .bind(&new_click.url_short)
        .bind(&new_click.ip)
        .bind(&new_click.location)
        .bind(&new_click.browser)
        .bind(&new_click.device)
        .bind(new_click.timestamp)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find_by_short(&self, short: &str) -> Result<Vec<Click>, AppError> {
        let rows = sqlx::query_as::<_, ClickRow>(
            r#"
            SELECT id, url_id, url_short, ip, location, browser, device, timestamp
            FROM clicks
            WHERE url_short = $1
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(short)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn has_recent_click(
        &self,
        short: &str,
        ip: &str,
        browser: &str,
        device: &str,
    ) -> Result<bool, AppError> {
        let since = Utc::now() - Duration::seconds(RECENT_CLICK_WINDOW_SECS);

        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM clicks
                WHERE url_short = $1 AND ip = $2 AND browser = $3 AND device = $4
                  AND timestamp > $5
            )
            "#,
        )
        .bind(short)
        .bind(ip)
        .bind(browser)
        .bind(device)
        .bind(since)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn analytics(&self, short: &str) -> Result<ClickAnalytics, AppError> {
        let total_clicks =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clicks WHERE url_short = $1")
                .bind(short)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(ClickAnalytics {
            total_clicks,
            browsers: self.group_by(short, "browser").await?,
            devices: self.group_by(short, "device").await?,
            locations: self.group_by(short, "location").await?,
        })
    }
}
