//! Shared application state assembled at startup.

use sqlx::PgPool;
use std::sync::Arc;

use crate::application::services::UrlService;
use crate::domain::click_worker::ClickRecorder;
use crate::infrastructure::persistence::{PgClickRepository, PgUrlRepository};

/// URL service wired to the PostgreSQL repositories.
pub type PgUrlService = UrlService<PgUrlRepository, PgClickRepository>;

/// Everything an outer layer needs to serve requests.
pub struct AppState {
    pub pool: Arc<PgPool>,
    pub url_service: Arc<PgUrlService>,
    pub clicks: ClickRecorder,
}

impl AppState {
    pub fn new(pool: Arc<PgPool>, url_service: Arc<PgUrlService>, clicks: ClickRecorder) -> Self {
        Self {
            pool,
            url_service,
            clicks,
        }
    }

    /// Drains queued clicks, then releases the cache and the pool.
    pub async fn shutdown(self) {
        self.clicks.shutdown().await;

        if let Err(e) = self.url_service.close().await {
            tracing::warn!(error = %e, "Failed to close cache");
        }

        self.pool.close().await;
        tracing::info!("Shutdown complete");
    }
}
