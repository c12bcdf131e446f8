//! Short code generation and validation utilities.
//!
//! Provides cryptographically secure random code generation and validation
//! for custom user-provided codes.

use crate::error::AppError;
use base64::Engine as _;

/// Length of generated short codes.
pub const CODE_LENGTH: usize = 6;

/// Random bytes drawn per code; 6 bytes encode to 8 base64 characters.
const CODE_LENGTH_BYTES: usize = 6;

/// Longest custom code accepted.
const MAX_CUSTOM_CODE_LENGTH: usize = 64;

/// Generates a cryptographically secure random short code.
///
/// Uses `getrandom` for entropy, encodes the bytes as URL-safe base64 with
/// padding stripped, and truncates the result to [`CODE_LENGTH`] characters.
///
/// # Errors
///
/// Returns an error if the system random number generator fails.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code()?;
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
/// ```
pub fn generate_code() -> Result<String, getrandom::Error> {
    let mut buffer = [0u8; CODE_LENGTH_BYTES];

    getrandom::fill(&mut buffer)?;

    let mut code = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer);
    code.truncate(CODE_LENGTH);
    Ok(code)
}

/// Validates a user-provided custom short code.
///
/// # Rules
///
/// - Length: 1-64 characters
/// - Allowed characters: ASCII letters, digits, hyphens, underscores
///
/// The same alphabet as generated codes, so every code is a single safe path segment.
///
/// # Errors
///
/// Returns [`AppError::InvalidCode`] if any validation rule is violated.
///
/// # Examples
///
/// ```ignore
/// assert!(validate_custom_code("promo-2025").is_ok());
/// assert!(validate_custom_code("My_Link").is_ok());
///
/// assert!(validate_custom_code("").is_err());
/// assert!(validate_custom_code("a/b").is_err());
/// ```
pub fn validate_custom_code(code: &str) -> Result<(), AppError> {
    if code.is_empty() || code.len() > MAX_CUSTOM_CODE_LENGTH {
        return Err(AppError::InvalidCode(format!(
            "custom code must be 1-{} characters, got {}",
            MAX_CUSTOM_CODE_LENGTH,
            code.len()
        )));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::InvalidCode(format!(
            "'{}' may only contain letters, digits, hyphens and underscores",
            code
        )));
    }

    Ok(())
}
