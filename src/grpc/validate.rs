use super::pb::{IsAdminRequest, LoginRequest, RegisterRequest};
use regex::Regex;
use thiserror::Error;

pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("email is required")]
    EmailRequired,
    #[error("email is not a valid email address")]
    EmailInvalid,
    #[error("password is required")]
    PasswordRequired,
    #[error("password must be between {PASSWORD_MIN_LENGTH} and {PASSWORD_MAX_LENGTH} characters")]
    PasswordLength,
    #[error("app_id is required")]
    AppIdRequired,
    #[error("user_id is required")]
    UserIdRequired,
}

/// Trim and lowercase an email so lookups and uniqueness ignore case.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic format check on an already normalized email.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    if !valid_email(email) {
        return Err(ValidationError::EmailInvalid);
    }
    Ok(())
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    // length counts characters, not bytes
    let length = password.chars().count();
    if !(PASSWORD_MIN_LENGTH..=PASSWORD_MAX_LENGTH).contains(&length) {
        return Err(ValidationError::PasswordLength);
    }
    Ok(())
}

/// # Errors
/// Returns the first field that fails validation.
pub fn login(request: &LoginRequest) -> Result<(), ValidationError> {
    check_email(&request.email)?;
    check_password(&request.password)?;
    if request.app_id == 0 {
        return Err(ValidationError::AppIdRequired);
    }
    Ok(())
}

/// # Errors
/// Returns the first field that fails validation.
pub fn register(request: &RegisterRequest) -> Result<(), ValidationError> {
    check_email(&request.email)?;
    check_password(&request.password)
}

/// # Errors
/// Returns an error if `user_id` is zero.
pub fn is_admin(request: &IsAdminRequest) -> Result<(), ValidationError> {
    if request.user_id == 0 {
        return Err(ValidationError::UserIdRequired);
    }
    Ok(())
}
