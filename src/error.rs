//! Error taxonomy shared by the repository, cache and service layers.
//!
//! Callers (an HTTP layer, the admin CLI) map these kinds onto their own
//! transport: `InvalidUrl`/`InvalidCode` are client errors, `AlreadyExists` a
//! conflict, `NotFound` a not-found, `Unauthorized` an authorization failure and
//! every store failure a generic server error. [`AppError::RecentClick`] is a
//! control-flow signal, not a fault.

use crate::infrastructure::cache::CacheError;

/// Errors produced by the URL shortening core.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// No live record matches the lookup key (short code or original URL).
    #[error("URL not found: {0}")]
    NotFound(String),

    /// A live record already uses the short code, or code generation ran out of attempts.
    #[error("Short code already in use: {0}")]
    AlreadyExists(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A custom short code contains characters that cannot appear in a path segment.
    #[error("Invalid short code: {0}")]
    InvalidCode(String),

    /// The stored creator reference does not match the caller's.
    #[error("Creator reference does not match for {0}")]
    Unauthorized(String),

    /// The same visitor clicked this code within the dedup window.
    #[error("Recent click from the same visitor on {0}")]
    RecentClick(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Returns true for `NotFound`, the only kind both the cache and the
    /// repository are expected to produce.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for underlying I/O failures of either collaborator.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Cache(_) | Self::Serialization(_)
        )
    }
}
