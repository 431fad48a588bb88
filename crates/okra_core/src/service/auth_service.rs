//! Researcher accounts and login sessions.
//!
//! # Responsibility
//! - Hash and verify passwords with Argon2id.
//! - Issue, resolve and revoke session tokens.
//!
//! # Invariants
//! - Only PHC hash strings are persisted.
//! - A session resolves only until its expiry.

use crate::keys::{random_key, KEY_LENGTH};
use crate::model::user::{validate_password, validate_username, User};
use crate::model::validation::ValidationError;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::service::now_epoch_ms;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use uuid::Uuid;

/// Service error for account and session use-cases.
#[derive(Debug)]
pub enum AuthServiceError {
    /// Unknown username or wrong password.
    InvalidCredentials,
    Validation(ValidationError),
    UsernameTaken(String),
    /// Argon2 rejected the input or the stored hash.
    PasswordHash(String),
    Repo(RepoError),
}

impl Display for AuthServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UsernameTaken(username) => write!(f, "username `{username}` is taken"),
            Self::PasswordHash(message) => write!(f, "password hash error: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AuthServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ValidationError> for AuthServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type AuthServiceResult<T> = Result<T, AuthServiceError>;

/// Freshly issued login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: i64,
}

/// Account service facade over repository implementations.
pub struct AuthService<R: UserRepository> {
    repo: R,
    session_ttl: Duration,
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(repo: R, session_ttl: Duration) -> Self {
        Self { repo, session_ttl }
    }

    /// Creates a researcher account.
    pub fn create_user(&self, username: &str, password: &str) -> AuthServiceResult<User> {
        validate_username(username)?;
        validate_password(password)?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
        };
        match self.repo.create_user(&user) {
            Ok(_) => {}
            Err(RepoError::Conflict(_)) => {
                return Err(AuthServiceError::UsernameTaken(username.to_string()))
            }
            Err(err) => return Err(err.into()),
        }

        info!("event=user_create module=service status=ok user_id={}", user.id);
        Ok(user)
    }

    /// Verifies credentials and opens a session.
    pub fn login(&self, username: &str, password: &str) -> AuthServiceResult<Session> {
        let Some(user) = self.repo.find_by_username(username)? else {
            warn!("event=login module=service status=error error_code=invalid_credentials");
            return Err(AuthServiceError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(
                "event=login module=service status=error user_id={} error_code=invalid_credentials",
                user.id
            );
            return Err(AuthServiceError::InvalidCredentials);
        }

        let now = now_epoch_ms();
        self.repo.purge_expired_sessions(now)?;

        let ttl_ms = i64::try_from(self.session_ttl.as_millis()).unwrap_or(i64::MAX);
        let session = Session {
            token: random_key(KEY_LENGTH * 2),
            expires_at: now.saturating_add(ttl_ms),
        };
        self.repo
            .create_session(&session.token, user.id, session.expires_at)?;

        info!("event=login module=service status=ok user_id={}", user.id);
        Ok(session)
    }

    /// Resolves a session token to its user, if still valid.
    pub fn authenticate_session(&self, token: &str) -> AuthServiceResult<Option<User>> {
        Ok(self.repo.find_session_user(token, now_epoch_ms())?)
    }

    pub fn logout(&self, token: &str) -> AuthServiceResult<()> {
        self.repo.delete_session(token)?;
        info!("event=logout module=service status=ok");
        Ok(())
    }
}

/// Hashes a password into a PHC string with a random salt.
pub fn hash_password(password: &str) -> AuthServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthServiceError::PasswordHash(err.to_string()))
}

/// Verifies a password against a stored PHC string.
pub fn verify_password(password: &str, hash: &str) -> AuthServiceResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| AuthServiceError::PasswordHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
