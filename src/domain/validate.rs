//! Input checks shared by handlers. Failures surface as 422.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_MESSAGE_LEN: usize = 2000;
pub const DISCOVERY_RADIUS: std::ops::RangeInclusive<i32> = 5..=100;

/// Lower-cased, trimmed email if it looks deliverable.
pub fn email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(ApiError::unprocessable("value is not a valid email address"))
    }
}

pub fn password(raw: &str) -> Result<(), ApiError> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::unprocessable(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn discovery_radius(radius: i32) -> Result<i32, ApiError> {
    if DISCOVERY_RADIUS.contains(&radius) {
        Ok(radius)
    } else {
        Err(ApiError::unprocessable(format!(
            "discovery_radius must be between {} and {}",
            DISCOVERY_RADIUS.start(),
            DISCOVERY_RADIUS.end()
        )))
    }
}

/// Trimmed chat message body.
pub fn message_content(raw: &str) -> Result<String, ApiError> {
    let content = raw.trim();
    if content.is_empty() || content.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::unprocessable(format!(
            "content length 1-{MAX_MESSAGE_LEN} required"
        )));
    }
    Ok(content.to_string())
}

pub fn non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::unprocessable(format!("{field} must not be empty")))
    } else {
        Ok(trimmed)
    }
}

pub fn non_negative(field: &str, value: Option<i32>) -> Result<(), ApiError> {
    match value {
        Some(v) if v < 0 => Err(ApiError::unprocessable(format!("{field} must be >= 0"))),
        _ => Ok(()),
    }
}

pub fn at_least(field: &str, value: Option<i32>, min: i32) -> Result<(), ApiError> {
    match value {
        Some(v) if v < min => Err(ApiError::unprocessable(format!("{field} must be >= {min}"))),
        _ => Ok(()),
    }
}

/// `lo <= hi` whenever both bounds are present.
pub fn ordered<T: PartialOrd>(
    lo_name: &str,
    lo: Option<T>,
    hi_name: &str,
    hi: Option<T>,
) -> Result<(), ApiError> {
    match (lo, hi) {
        (Some(lo), Some(hi)) if lo > hi => Err(ApiError::unprocessable(format!(
            "{lo_name} must not be after {hi_name}"
        ))),
        _ => Ok(()),
    }
}

pub fn date(field: &str, raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::unprocessable(format!("{field} must be YYYY-MM-DD")))
}

//////////////////////////////////////////////////
// Pagination
//////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

impl Default for Page {
    fn default() -> Self {
        Page {
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl Page {
    pub const MAX_LIMIT: i64 = 200;

    pub fn checked(self) -> Result<Self, ApiError> {
        if self.skip < 0 {
            return Err(ApiError::unprocessable("skip must be >= 0"));
        }
        if !(1..=Self::MAX_LIMIT).contains(&self.limit) {
            return Err(ApiError::unprocessable(format!(
                "limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalised() {
        assert_eq!(email("  Rahul.Sharma@Test.com ").unwrap(), "rahul.sharma@test.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "no-at-sign", "@test.com", "a@b", "a@.com", "a@b.", "a b@c.com", "a@b@c.com"] {
            assert!(email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(password("1234567").is_err());
        assert!(password("12345678").is_ok());
    }

    #[test]
    fn radius_bounds_are_inclusive() {
        assert!(discovery_radius(4).is_err());
        assert_eq!(discovery_radius(5).unwrap(), 5);
        assert_eq!(discovery_radius(100).unwrap(), 100);
        assert!(discovery_radius(101).is_err());
    }

    #[test]
    fn message_content_is_trimmed_and_bounded() {
        assert_eq!(message_content("  hi  ").unwrap(), "hi");
        assert!(message_content("   ").is_err());
        assert!(message_content(&"x".repeat(MAX_MESSAGE_LEN + 1)).is_err());
    }

    #[test]
    fn page_limits() {
        assert!(Page { skip: 0, limit: 0 }.checked().is_err());
        assert!(Page { skip: -1, limit: 10 }.checked().is_err());
        assert!(Page { skip: 0, limit: 201 }.checked().is_err());
        assert!(Page::default().checked().is_ok());
    }

    #[test]
    fn ordered_ranges() {
        assert!(ordered("min_age", Some(30), "max_age", Some(20)).is_err());
        assert!(ordered("min_age", Some(20), "max_age", None).is_ok());
    }
}
