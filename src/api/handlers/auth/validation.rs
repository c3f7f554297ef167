//! Request checks run before the orchestrator sees any input.

use regex::Regex;

use crate::error::{Error, Result};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub(crate) fn require_email(email_normalized: &str) -> Result<()> {
    if valid_email(email_normalized) {
        Ok(())
    } else {
        Err(Error::bad_request("Request didn't pass validation"))
    }
}

/// Trimmed value, or `BadRequest` naming the missing field.
pub(crate) fn require_present<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        Err(Error::bad_request(format!("Missing {field}")))
    } else {
        Ok(value)
    }
}

/// New passwords: at least 8 characters with an uppercase letter, a lowercase
/// letter, a digit and a punctuation or symbol character.
pub(crate) fn require_strong_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);
    let has_digit = password.chars().any(|ch| ch.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|ch| !ch.is_alphanumeric() && !ch.is_whitespace() && !ch.is_control());

    if has_upper && has_lower && has_digit && has_special {
        Ok(())
    } else {
        Err(Error::bad_request(
            "Password must include at least one uppercase letter, one lowercase letter, one digit, and one special character",
        ))
    }
}
