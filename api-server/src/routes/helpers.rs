//! Shared helper functions for Rocket route handlers.

use crate::error::ApiError;

/// Parse a path segment into a positive numeric identifier.
///
/// Returns [`ApiError::Validation`] with `"Invalid ID"` otherwise.
pub fn parse_id(raw: &str) -> Result<i32, ApiError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::Validation("Invalid ID".into())),
    }
}
