//! Field-level checks shared by the request payloads.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use thiserror::Error;

use crate::error::ApiError;

pub const BODY_EMPTY: &str = "Body cannot be empty";

/// A rejected field value; the message is shown to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn empty_body() -> Self {
        Self::new(BODY_EMPTY)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.0)
    }
}

pub type Validated<T> = Result<T, ValidationError>;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"))
}

/// Trim and lower-case an email, rejecting anything that is not `local@domain.tld`.
pub fn normalize_email(raw: &str) -> Validated<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::new("Email is required"));
    }
    if !email_regex().is_match(&email) {
        return Err(ValidationError::new("Email must be a valid email address"));
    }
    Ok(email)
}

pub fn require_non_empty(field: &str, value: &str) -> Validated<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Character-count bounds, inclusive on both ends.
pub fn check_length(field: &str, value: &str, min: usize, max: usize) -> Validated<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::new(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

pub fn check_password(password: &str) -> Validated<()> {
    if password.is_empty() {
        return Err(ValidationError::new("Password is required"));
    }
    if password.chars().count() < 6 {
        return Err(ValidationError::new(
            "Password must be at least 6 characters long",
        ));
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping only the date.
pub fn parse_release_date(raw: &str) -> Validated<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| ValidationError::new("releaseDate must be a valid ISO 8601 date"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_validates_emails() {
        assert_eq!(normalize_email("  Jane@X.com ").unwrap(), "jane@x.com");
        assert!(normalize_email("").is_err());
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a b@x.com").is_err());
    }

    #[test]
    fn converts_into_a_bad_request() {
        let api: ApiError = ValidationError::empty_body().into();
        assert_eq!(api.status(), rocket::http::Status::BadRequest);
        assert_eq!(api.message(), "Body cannot be empty");
    }

    #[test]
    fn enforces_minimum_password_length() {
        assert!(check_password("secret").is_ok());
        match check_password("short") {
            Err(err) => assert_eq!(err.0, "Password must be at least 6 characters long"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(check_password("").is_err());
    }

    #[test]
    fn length_bounds_are_inclusive() {
        assert!(check_length("genre", "ab", 2, 50).is_ok());
        assert!(check_length("genre", "a", 2, 50).is_err());
        assert!(check_length("title", &"x".repeat(255), 1, 255).is_ok());
        assert!(check_length("title", &"x".repeat(256), 1, 255).is_err());
    }

    #[test]
    fn parses_dates_and_timestamps() {
        let expected = NaiveDate::from_ymd_opt(1977, 5, 25).unwrap();
        assert_eq!(parse_release_date("1977-05-25").unwrap(), expected);
        assert_eq!(
            parse_release_date("1977-05-25T10:00:00Z").unwrap(),
            expected
        );
        assert!(parse_release_date("25/05/1977").is_err());
    }
}
