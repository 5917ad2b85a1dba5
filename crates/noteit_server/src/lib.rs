//! HTTP surface for the NoteIt backend.
//!
//! # Responsibility
//! - Route the six note operations plus a health probe.
//! - Own process bootstrap: logging, database, listener, shutdown.
//!
//! # Invariants
//! - Handlers receive storage only through `AppState`; there is no global
//!   connection.
//! - Route paths keep their trailing slashes.

pub mod config;
pub mod error;
pub mod request;
mod routes;
pub mod state;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use log::info;
use noteit_core::db::DbError;
use noteit_core::init_logging;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use config::{HttpOptions, ServerConfig};
pub use error::ApiError;
pub use state::AppState;

/// Startup/runtime failure of the server process.
#[derive(Debug)]
pub enum ServerError {
    Config(String),
    Logging(String),
    Db(DbError),
    Io(std::io::Error),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(message) => write!(f, "invalid configuration: {message}"),
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Db(err) => write!(f, "database setup failed: {err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ServerError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Note routes mounted at the root, bound to `state`.
pub fn notes_router(state: AppState) -> Router {
    Router::new()
        .route("/notes/", get(routes::list_notes))
        .route("/notes/create/", post(routes::create_note))
        .route("/notes/:note_id/", get(routes::view_note))
        .route("/notes/:note_id/update/", put(routes::update_note))
        .route("/notes/:note_id/delete/", delete(routes::delete_note))
        .route("/notes/:note_id/favorite/", patch(routes::update_favorite))
        .with_state(state)
}

/// Full application: note routes under the configured prefix, health probe
/// and CORS.
pub fn build_app(state: AppState, options: &HttpOptions) -> Result<Router, ServerError> {
    let notes = notes_router(state);
    let app = match options.normalized_prefix().map_err(ServerError::Config)? {
        Some(prefix) => Router::new().nest(&prefix, notes),
        None => notes,
    };

    Ok(app
        .route("/health", get(routes::health))
        .layer(cors_layer(&options.cors_origins)?))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer, ServerError> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim())
                    .map_err(|_| ServerError::Config(format!("invalid CORS origin `{origin}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE]))
}

/// Boots logging and storage, then serves until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    init_logging(config.log_level(), config.log_dir.as_deref()).map_err(ServerError::Logging)?;

    let conn = config.open_database()?;
    let app = build_app(AppState::new(conn), &config.http_options())?;

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        "event=server_listen module=http status=ok addr={} database={}",
        listener.local_addr()?,
        config.database
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=http status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
}
