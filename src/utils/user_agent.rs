//! Coarse browser and device classification from a `User-Agent` header.

/// Browser label for agents that match no known family.
pub const OTHER_BROWSER: &str = "Other";

/// Location label used when no geolocation is available.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Browser and device family derived from a user agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInfo {
    pub browser: &'static str,
    pub device: &'static str,
}

/// Classifies a user agent into a browser family and a device class.
///
/// Most agents carry several product tokens (Chrome sends `Safari`, Edge sends
/// `Chrome`, everything sends `Mozilla`), so the most specific token is tested first.
///
/// # Examples
///
/// ```ignore
/// let info = classify(Some("Mozilla/5.0 (iPhone; ...) Version/17.0 Mobile/15E148 Safari/604.1"));
/// assert_eq!(info.browser, "Safari");
/// assert_eq!(info.device, "Mobile");
/// ```
pub fn classify(user_agent: Option<&str>) -> ClientInfo {
    let ua = user_agent.unwrap_or_default();

    let browser = if ua.contains("Edg") {
        "Edge"
    } else if ua.contains("Chrome") || ua.contains("CriOS") {
        "Chrome"
    } else if ua.contains("Firefox") || ua.contains("FxiOS") {
        "Firefox"
    } else if ua.contains("Safari") {
        "Safari"
    } else if ua.contains("Mozilla") {
        "Mozilla"
    } else {
        OTHER_BROWSER
    };

    let device = if ua.contains("Tablet") || ua.contains("iPad") {
        "Tablet"
    } else if ua.contains("Mobile") {
        "Mobile"
    } else {
        "Desktop"
    };

    ClientInfo { browser, device }
}
