//! Shared router state.
//!
//! # Invariants
//! - Exactly one SQLite connection is shared by all requests.
//! - Storage work runs on the blocking pool, never on async workers.

use crate::error::ApiError;
use noteit_core::{NoteService, SqliteNoteRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Router state owning the database connection.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Wraps a migrated connection (see `noteit_core::db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `op` against a note service on the blocking pool.
    pub(crate) async fn with_service<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: for<'c> FnOnce(&mut NoteService<SqliteNoteRepository<'c>>) -> Result<T, ApiError>
            + Send
            + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|_| ApiError::Internal("database mutex poisoned".to_string()))?;
            let repo = SqliteNoteRepository::try_new(&mut conn)?;
            let mut service = NoteService::new(repo);
            op(&mut service)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("storage task failed: {err}")))?
    }
}
