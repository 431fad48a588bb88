//! Researcher account model.
//!
//! Only the Argon2id PHC hash is kept; plaintext passwords never leave
//! `service::auth_service`.

use crate::model::validation::ValidationError;
use uuid::Uuid;

pub type UserId = Uuid;

pub const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
}

/// Checks username shape: non-blank, no whitespace.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidUsername);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ValidationError::PasswordTooShort {
            min_chars: PASSWORD_MIN_CHARS,
        });
    }
    Ok(())
}
