//! Repository trait definitions for the domain layer.
//!
//! Together [`UrlRepository`] and [`ClickRepository`] form the durable store:
//! the single source of truth for URL records, clicks and history.
//!
//! # Architecture
//!
//! - Traits define the contract for data operations
//! - Implementations live in `crate::infrastructure::persistence`
//! - Mock implementations are auto-generated via `mockall` for testing
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod click_repository;
pub mod url_repository;

pub use click_repository::{ClickRepository, RECENT_CLICK_WINDOW_SECS};
pub use url_repository::UrlRepository;

#[cfg(test)]
pub use click_repository::MockClickRepository;
#[cfg(test)]
pub use url_repository::MockUrlRepository;
