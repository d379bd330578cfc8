use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AppError, Result};

/// Accepted logins: letters, digits and underscores, 3 to 32 characters.
pub const LOGIN_PATTERN: &str = r"^[A-Za-z0-9_]{3,32}$";

static LOGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LOGIN_PATTERN).expect("LOGIN_PATTERN is a valid regex"));

/// Validates a login.
///
/// # Arguments
///
/// * `login` - The login to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the login is valid.
pub fn validate_login(login: &str) -> Result<()> {
    if !LOGIN_RE.is_match(login) {
        return Err(AppError::Validation(
            "Login must be 3-32 letters, digits or underscores".to_string(),
        ));
    }

    Ok(())
}

/// Accepted password lengths, counted in characters.
pub const PASSWORD_LENGTH: RangeInclusive<usize> = 8..=128;

/// Checks a new password against [`PASSWORD_LENGTH`].
pub fn validate_password(password: &str) -> Result<()> {
    let length = password.chars().count();
    if PASSWORD_LENGTH.contains(&length) {
        return Ok(());
    }

    Err(AppError::Validation(format!(
        "Password must be {} to {} characters",
        PASSWORD_LENGTH.start(),
        PASSWORD_LENGTH.end()
    )))
}
