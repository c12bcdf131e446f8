//! Repository trait for durable URL records and their history.

use crate::domain::entities::{NewHistoryEntry, NewShortUrl, ShortUrl, UrlPatch};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for the authoritative URL store.
///
/// Lookups only ever return live records: soft-deleted rows and rows whose
/// expiry has passed are reported as absent even if they are still stored.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
///
/// # Examples
///
/// See integration tests: `tests/repository_url.rs`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Stores a new URL record and returns it with its store-assigned fields.
    ///
    /// Uniqueness of `short` among live records is enforced by the store itself,
    /// so two concurrent creations of the same code cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AlreadyExists`] if a live record already uses the code.
    /// Returns [`AppError::Database`] on database errors.
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError>;

    /// Finds a live record by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn find_by_short(&self, short: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Finds a live record by its original URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn find_by_original(&self, original: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Lists every live record owned by `creator_reference`, in no particular order.
    ///
    /// The empty reference lists unowned records.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn find_by_creator(&self, creator_reference: &str) -> Result<Vec<ShortUrl>, AppError>;

    /// Atomically increments the click counter of a live record.
    ///
    /// Returns `Ok(false)` when no live record matched; callers treat that as non-fatal.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn increment_clicks(&self, short: &str) -> Result<bool, AppError>;

    /// Soft-deletes a record by setting `deleted_at = now()`.
    ///
    /// Returns `Ok(false)` if the record was not found or already deleted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn soft_delete(&self, short: &str) -> Result<bool, AppError>;

    /// Soft-deletes a record owned by `creator_reference`.
    ///
    /// The delete statement is scoped by the creator as well, so an ownership
    /// change between the check and the write deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record matches `short`.
    /// Returns [`AppError::Unauthorized`] if the stored creator differs.
    /// Returns [`AppError::Database`] on database errors.
    async fn soft_delete_with_creator(
        &self,
        short: &str,
        creator_reference: &str,
    ) -> Result<(), AppError>;

    /// Physically removes a record and, by cascade, its clicks and history.
    ///
    /// Returns `Ok(false)` if nothing was removed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Database`] on database errors.
    async fn hard_delete(&self, short: &str) -> Result<bool, AppError>;

    /// Overwrites `original`, `title` and `expires_at` of a live record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record matches `short`.
    /// Returns [`AppError::Database`] on database errors.
    async fn update(&self, short: &str, patch: UrlPatch) -> Result<(), AppError>;

    /// Like [`UrlRepository::update`], restricted to records owned by `creator_reference`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live record matches `short`.
    /// Returns [`AppError::Unauthorized`] if the stored creator differs.
    /// Returns [`AppError::Database`] on database errors.
    async fn update_with_creator(
        &self,
        short: &str,
        patch: UrlPatch,
        creator_reference: &str,
    ) -> Result<(), AppError>;

    /// Appends an audit record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Serialization`] if a snapshot cannot be encoded.
    /// Returns [`AppError::Database`] on database errors.
    async fn log_history(&self, entry: NewHistoryEntry) -> Result<(), AppError>;
}
