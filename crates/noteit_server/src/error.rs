//! HTTP error mapping.
//!
//! # Responsibility
//! - Translate core/service errors and extractor rejections into JSON
//!   responses with stable status codes.
//!
//! # Invariants
//! - 400 bodies are either a per-field map or `{"error": ...}`.
//! - 404 bodies are always `{"error": "Note not found"}`.
//! - Internal error details are logged, never returned to clients.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, info};
use noteit_core::model::note::field;
use noteit_core::{NoteServiceError, NoteValidationError, RepoError};
use serde_json::json;
use std::fmt::{Display, Formatter};

pub const NOTE_NOT_FOUND: &str = "Note not found";
pub const DEVICE_ID_REQUIRED: &str = "deviceId is required";
pub const IS_FAVORITE_REQUIRED: &str = "isFavorite field is required";

/// Error returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// One or more body fields failed validation.
    Validation(NoteValidationError),
    /// A required input is missing; rendered as `{"error": message}`.
    MissingInput(&'static str),
    /// The addressed note does not exist.
    NotFound,
    /// Storage or runtime failure.
    Internal(String),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::MissingInput(message) => write!(f, "{message}"),
            Self::NotFound => write!(f, "{NOTE_NOT_FOUND}"),
            Self::Internal(details) => write!(f, "internal error: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => {
                info!(
                    "event=request_rejected module=http status=error kind=validation fields={}",
                    errors.fields().collect::<Vec<_>>().join(",")
                );
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            Self::MissingInput(message) => {
                info!("event=request_rejected module=http status=error kind=missing_input");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": NOTE_NOT_FOUND })),
            )
                .into_response(),
            Self::Internal(details) => {
                error!("event=request_failed module=http status=error error={details}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<NoteValidationError> for ApiError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<NoteServiceError> for ApiError {
    fn from(value: NoteServiceError) -> Self {
        match value {
            NoteServiceError::MissingDeviceId => Self::MissingInput(DEVICE_ID_REQUIRED),
            NoteServiceError::Validation(errors) => Self::Validation(errors),
            NoteServiceError::NoteNotFound(_) => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        NoteServiceError::from(value).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::Validation(NoteValidationError::single(
            field::NON_FIELD,
            format!("Invalid request body: {}", value.body_text()),
        ))
    }
}

// Non-integer ids can never name a note.
impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        Self::NotFound
    }
}

impl From<QueryRejection> for ApiError {
    fn from(_: QueryRejection) -> Self {
        Self::MissingInput(DEVICE_ID_REQUIRED)
    }
}
