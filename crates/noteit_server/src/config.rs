//! Process configuration from command-line flags and environment.
//!
//! # Invariants
//! - Every flag has an `NOTEIT_*` environment fallback.
//! - `--database :memory:` opens a private in-memory store.

use clap::Parser;
use noteit_core::db::{open_db, open_db_in_memory, DbResult};
use noteit_core::default_log_level;
use rusqlite::Connection;
use std::net::SocketAddr;

const IN_MEMORY_DATABASE: &str = ":memory:";

/// Server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "noteit_server", version, about = "HTTP backend for NoteIt notes and todos")]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[arg(long, env = "NOTEIT_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// SQLite database file, or `:memory:`.
    #[arg(long, env = "NOTEIT_DATABASE", default_value = "noteit.sqlite3")]
    pub database: String,

    /// trace|debug|info|warn|error. Defaults by build mode.
    #[arg(long, env = "NOTEIT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files. Logs go to stderr when unset.
    #[arg(long, env = "NOTEIT_LOG_DIR")]
    pub log_dir: Option<String>,

    /// Path prefix for the note routes, e.g. `/api`.
    #[arg(long, env = "NOTEIT_API_PREFIX", default_value = "")]
    pub api_prefix: String,

    /// Allowed CORS origins. Any origin is allowed when none is given.
    #[arg(
        long = "cors-origin",
        env = "NOTEIT_CORS_ORIGINS",
        value_delimiter = ','
    )]
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Effective log level.
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    /// Opens and migrates the configured database.
    pub fn open_database(&self) -> DbResult<Connection> {
        if self.database == IN_MEMORY_DATABASE {
            open_db_in_memory()
        } else {
            open_db(&self.database)
        }
    }

    /// Router-level options derived from this config.
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            api_prefix: self.api_prefix.clone(),
            cors_origins: self.cors_origins.clone(),
        }
    }
}

/// Options consumed when assembling the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpOptions {
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
}

impl HttpOptions {
    /// Returns the nesting prefix, or `None` for root mounting.
    ///
    /// Surrounding slashes are tolerated: `api`, `/api` and `/api/` all
    /// yield `/api`.
    pub fn normalized_prefix(&self) -> Result<Option<String>, String> {
        let trimmed = self.api_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.contains(['?', '#', ':', '*']) || trimmed.chars().any(char::is_whitespace) {
            return Err(format!("invalid api prefix `{}`", self.api_prefix));
        }
        Ok(Some(format!("/{trimmed}")))
    }
}
