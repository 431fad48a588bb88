//! Researcher account and login session persistence.
//!
//! # Invariants
//! - Usernames are unique case-insensitively (`COLLATE NOCASE`).
//! - Expired sessions never resolve to a user, even before they are purged.

use crate::model::user::{User, UserId};
use crate::repo::{ensure_connection_ready, is_unique_violation, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for researcher accounts and sessions.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn create_session(&self, token: &str, user_id: UserId, expires_at: i64) -> RepoResult<()>;
    /// Resolves a session token that has not expired at `now_ms`.
    fn find_session_user(&self, token: &str, now_ms: i64) -> RepoResult<Option<User>>;
    fn delete_session(&self, token: &str) -> RepoResult<()>;
    /// Deletes sessions expired at `now_ms`; returns how many were removed.
    fn purge_expired_sessions(&self, now_ms: i64) -> RepoResult<usize>;
}

/// SQLite-backed account repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        let inserted = self.conn.execute(
            "INSERT INTO users (id, username, password_hash) VALUES (?1, ?2, ?3);",
            params![
                user.id.to_string(),
                user.username.as_str(),
                user.password_hash.as_str()
            ],
        );
        match inserted {
            Ok(_) => Ok(user.id),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Conflict(format!(
                "username `{}` is taken",
                user.username
            ))),
            Err(err) => Err(err.into()),
        }
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, password_hash FROM users WHERE username = ?1;")?;
        let mut rows = stmt.query([username])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn create_session(&self, token: &str, user_id: UserId, expires_at: i64) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES (?1, ?2, ?3);",
            params![token, user_id.to_string(), expires_at],
        )?;
        Ok(())
    }

    fn find_session_user(&self, token: &str, now_ms: i64) -> RepoResult<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id, u.username, u.password_hash
             FROM sessions s
             INNER JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1
               AND s.expires_at > ?2;",
        )?;
        let mut rows = stmt.query(params![token, now_ms])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn delete_session(&self, token: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1;", [token])?;
        Ok(())
    }

    fn purge_expired_sessions(&self, now_ms: i64) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at <= ?1;", [now_ms])?;
        Ok(removed)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    Ok(User {
        id: parse_uuid(&id_text, "users.id")?,
        username: row.get("username")?,
        password_hash: row.get("password_hash")?,
    })
}
