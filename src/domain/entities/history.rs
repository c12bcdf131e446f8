//! Audit trail entries for URL modifications.

use super::ShortUrl;
use std::fmt;

/// The kind of modification being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Update,
    Delete,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A history record to append.
///
/// History is advisory: a failed write never aborts the modification it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub url_id: i64,
    pub url_short: String,
    pub action: HistoryAction,
    pub old_value: Option<ShortUrl>,
    pub new_value: Option<ShortUrl>,
    /// Creator reference of the caller, `None` for unscoped operations.
    pub modified_by: Option<String>,
}

impl NewHistoryEntry {
    /// Snapshot of a record about to be deleted.
    pub fn deletion(url: &ShortUrl, modified_by: Option<&str>) -> Self {
        Self {
            url_id: url.id,
            url_short: url.short.clone(),
            action: HistoryAction::Delete,
            old_value: Some(url.clone()),
            new_value: None,
            modified_by: modified_by.map(str::to_string),
        }
    }

    /// Before and after snapshots of an update.
    pub fn update(old: &ShortUrl, new: &ShortUrl, modified_by: Option<&str>) -> Self {
        Self {
            url_id: old.id,
            url_short: old.short.clone(),
            action: HistoryAction::Update,
            old_value: Some(old.clone()),
            new_value: Some(new.clone()),
            modified_by: modified_by.map(str::to_string),
        }
    }
}
