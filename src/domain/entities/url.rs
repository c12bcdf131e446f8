//! URL record entity: the mapping from a short code to its destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A shortened URL record.
///
/// `id`, `short` and `created_at` are immutable once the record is stored.
/// `clicks` is authoritative only in the durable store; cached copies may lag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortUrl {
    pub id: i64,
    pub short: String,
    pub original: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    /// `None` means the record never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub clicks: i64,
    /// Opaque owner identity; `None` marks an unowned record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShortUrl {
    /// Returns true if the record has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if the record has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|e| e <= Utc::now())
    }

    /// A record is live when it is neither deleted nor expired.
    ///
    /// Every read path, cached or durable, must reject records that are not live.
    pub fn is_live(&self) -> bool {
        !self.is_deleted() && !self.is_expired()
    }

    /// Compares the stored creator reference with `creator_reference`.
    ///
    /// An unowned record matches only the empty reference.
    pub fn is_owned_by(&self, creator_reference: &str) -> bool {
        self.creator_reference.as_deref().unwrap_or_default() == creator_reference
    }
}

/// Input data for storing a new URL record.
///
/// `id`, `created_at` and `clicks` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShortUrl {
    pub short: String,
    pub original: String,
    pub title: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub creator_reference: Option<String>,
}

/// The mutable fields of a URL record, written as a whole by an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPatch {
    pub original: String,
    pub title: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&ShortUrl> for UrlPatch {
    fn from(url: &ShortUrl) -> Self {
        Self {
            original: url.original.clone(),
            title: url.title.clone(),
            expires_at: url.expires_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_url(id: i64, short: &str, original: &str) -> ShortUrl {
    ShortUrl {
        id,
        short: short.to_string(),
        original: original.to_string(),
        title: None,
        created_at: Utc::now(),
        expires_at: None,
        clicks: 0,
        creator_reference: None,
        deleted_at: None,
    }
}
