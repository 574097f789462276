//! Data models representing database entities and API payloads.
//!
//! Each submodule holds the `sqlx::FromRow` record for a table together with
//! the request and response bodies built on top of it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AppError;

/// Company applications (client -> company promotion requests)
pub mod application;
/// Token requests and responses
pub mod auth;
pub mod booking;
pub mod company;
pub mod pagination;
pub mod review;
pub mod tour;
pub mod user;

/// Check that `value` has between `min` and `max` characters (inclusive).
pub(crate) fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AppError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}

// Dot-separated domain labels that neither start nor end with `-`, ending in an alphabetic TLD.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
    )
    .expect("valid email regex")
});
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("valid phone regex"));

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// E.164-style phone number: optional `+`, a non-zero digit, then 1 to 14 digits.
pub(crate) fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}
