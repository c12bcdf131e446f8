//! Core domain entities representing the business data model.
//!
//! Entities are plain data structures; the liveness rule
//! ([`ShortUrl::is_live`]) is the only behaviour they carry.
//!
//! # Entity Types
//!
//! - [`ShortUrl`] - A shortened URL record
//! - [`Click`] - An accepted visit to a short code
//! - [`NewHistoryEntry`] - An audit record of an update or deletion
//!
//! Creation inputs use separate structs (`NewShortUrl`, `NewClick`) and
//! updates go through [`UrlPatch`].

pub mod click;
pub mod history;
pub mod url;

pub use click::{Click, ClickAnalytics, NewClick};
pub use history::{HistoryAction, NewHistoryEntry};
pub use url::{NewShortUrl, ShortUrl, UrlPatch};
