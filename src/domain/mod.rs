//! Domain layer containing business entities and logic.
//!
//! Entities and repository contracts here have no knowledge of PostgreSQL or
//! of any cache backend.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`click_event`] - Click tracking event model
//! - [`click_worker`] - Asynchronous click processing worker
//!
//! # Click Processing Flow
//!
//! 1. A visit is resolved and a [`click_event::ClickEvent`] is queued via
//!    [`click_worker::ClickRecorder::record`]
//! 2. [`click_worker::run_click_worker`] processes events with retry logic
//! 3. The visit is deduplicated and stored through
//!    [`UrlService::record_click`](crate::application::services::UrlService::record_click)
//! 4. Accepted visits bump the click counter in the store and the cache

pub mod click_event;
pub mod click_worker;
pub mod entities;
pub mod repositories;
