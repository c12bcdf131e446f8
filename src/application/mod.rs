//! Application layer services implementing business logic.
//!
//! Services consume repository and cache traits and expose the operations an
//! outer layer (HTTP handlers, the admin CLI, the click worker) calls.
//!
//! # Available Services
//!
//! - [`services::url_service::UrlService`] - Short URL lifecycle, lookups and click analytics

pub mod services;
