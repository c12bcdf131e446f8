//! Repository trait for click records and analytics.

use crate::domain::entities::{Click, ClickAnalytics, NewClick};
use crate::error::AppError;
use async_trait::async_trait;

/// Sliding interval, in seconds, during which repeat clicks from one visitor are ignored.
pub const RECENT_CLICK_WINDOW_SECS: i64 = 60 * 60;

/// Repository interface for click tracking and aggregated statistics.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgClickRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_click.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Appends a click record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors, including a dangling `url_id`.
    async fn store_click(&self, new_click: NewClick) -> Result<Click, AppError>;

    /// Lists every click for a code, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn find_by_short(&self, short: &str) -> Result<Vec<Click>, AppError>;

    /// Returns true if a click with the same code, IP, browser and device was
    /// stored within [`RECENT_CLICK_WINDOW_SECS`] of the current time.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn has_recent_click(
        &self,
        short: &str,
        ip: &str,
        browser: &str,
        device: &str,
    ) -> Result<bool, AppError>;

    /// Counts all clicks for a code, in total and grouped by browser, device and location.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn analytics(&self, short: &str) -> Result<ClickAnalytics, AppError>;
}
