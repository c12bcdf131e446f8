//! Click entity representing a single accepted visit, plus its aggregates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A recorded visit to a short code.
///
/// Client fields are best-effort and may hold `"Unknown"` or `"Other"`.
/// Clicks are never mutated and only disappear when their URL is hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Click {
    pub id: i64,
    pub url_id: i64,
    pub url_short: String,
    pub ip: String,
    pub location: String,
    pub browser: String,
    pub device: String,
    pub timestamp: DateTime<Utc>,
}

/// Input data for recording a new click.
///
/// `url_id` must reference an existing URL record; `url_short` is denormalized
/// so analytics can be queried by code alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClick {
    pub url_id: i64,
    pub url_short: String,
    pub ip: String,
    pub location: String,
    pub browser: String,
    pub device: String,
    pub timestamp: DateTime<Utc>,
}

impl NewClick {
    /// Creates a click stamped with the current time.
    pub fn new(
        url_id: i64,
        url_short: impl Into<String>,
        ip: impl Into<String>,
        location: impl Into<String>,
        browser: impl Into<String>,
        device: impl Into<String>,
    ) -> Self {
        Self {
            url_id,
            url_short: url_short.into(),
            ip: ip.into(),
            location: location.into(),
            browser: browser.into(),
            device: device.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Aggregated click counts for one short code.
///
/// The groupings are independent and cover every stored click for the code,
/// regardless of whether the URL record is still live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClickAnalytics {
    pub total_clicks: i64,
    pub browsers: BTreeMap<String, i64>,
    pub devices: BTreeMap<String, i64>,
    pub locations: BTreeMap<String, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_click_is_stamped_now() {
        let before = Utc::now();
        let click = NewClick::new(42, "abc123", "1.2.3.4", "Unknown", "Chrome", "Desktop");

        assert_eq!(click.url_id, 42);
        assert_eq!(click.url_short, "abc123");
        assert_eq!(click.ip, "1.2.3.4");
        assert_eq!(click.browser, "Chrome");
        assert!(click.timestamp >= before);
    }

    #[test]
    fn test_empty_analytics() {
        let analytics = ClickAnalytics::default();
        assert_eq!(analytics.total_clicks, 0);
        assert!(analytics.browsers.is_empty());

        let json = serde_json::to_value(&analytics).unwrap();
        assert_eq!(json["total_clicks"], 0);
        assert!(json["locations"].as_object().unwrap().is_empty());
    }
}
