//! Shared server state.
//!
//! # Invariants
//! - One SQLite connection serves every request; `with_db` holds its lock for
//!   one synchronous use case and is never called across an `.await`.

use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Duration;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    db: Mutex<Connection>,
    session_ttl: Duration,
}

impl AppState {
    pub fn new(conn: Connection, session_ttl: Duration) -> SharedState {
        Arc::new(Self {
            db: Mutex::new(conn),
            session_ttl,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_db<T>(&self, f: impl FnOnce(&mut Connection) -> T) -> T {
        let mut conn = self.db.lock();
        f(&mut conn)
    }
}
