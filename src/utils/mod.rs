//! Utility functions for code generation, validation and click classification.
//!
//! - [`code_generator`] - Short code generation and custom code validation
//! - [`url_validator`] - Destination URL validation
//! - [`user_agent`] - Browser and device classification
//! - [`db_error`] - Database error classification

pub mod code_generator;
pub mod db_error;
pub mod url_validator;
pub mod user_agent;
