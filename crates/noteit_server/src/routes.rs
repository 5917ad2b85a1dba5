//! Note HTTP handlers.
//!
//! Each handler validates its input at the boundary, then performs all
//! storage work in a single `AppState::with_service` call.

use crate::error::ApiError;
use crate::request::{
    ApiJson, ApiPath, ApiQuery, CreateNoteRequest, FavoriteRequest, ListNotesQuery,
    UpdateNoteRequest,
};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use log::debug;
use noteit_core::{core_version, Note, NoteId, NoteWithTodos};
use serde_json::{json, Value};

pub(crate) async fn list_notes(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListNotesQuery>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let device_id = query.device_id.unwrap_or_default();
    let notes = state
        .with_service(move |service| Ok(service.list_notes(&device_id)?))
        .await?;
    debug!("event=notes_list module=http status=ok count={}", notes.len());
    Ok(Json(notes))
}

pub(crate) async fn view_note(
    State(state): State<AppState>,
    ApiPath(note_id): ApiPath<NoteId>,
) -> Result<Json<NoteWithTodos>, ApiError> {
    let note = state
        .with_service(move |service| Ok(service.get_note(note_id)?))
        .await?;
    Ok(Json(note))
}

pub(crate) async fn create_note(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteWithTodos>), ApiError> {
    let (note, todos) = body.into_parts()?;
    let created = state
        .with_service(move |service| Ok(service.create_note(note, todos)?))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn update_note(
    State(state): State<AppState>,
    ApiPath(note_id): ApiPath<NoteId>,
    ApiJson(body): ApiJson<UpdateNoteRequest>,
) -> Result<Json<NoteWithTodos>, ApiError> {
    let parsed = body.into_parts();
    let updated = state
        .with_service(move |service| {
            // Unknown notes answer 404 even when the body is also invalid.
            service.ensure_note_exists(note_id)?;
            let (patch, todos) = parsed?;
            Ok(service.update_note(note_id, patch, todos)?)
        })
        .await?;
    Ok(Json(updated))
}

pub(crate) async fn delete_note(
    State(state): State<AppState>,
    ApiPath(note_id): ApiPath<NoteId>,
) -> Result<StatusCode, ApiError> {
    state
        .with_service(move |service| Ok(service.delete_note(note_id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn update_favorite(
    State(state): State<AppState>,
    ApiPath(note_id): ApiPath<NoteId>,
    ApiJson(body): ApiJson<FavoriteRequest>,
) -> Result<Json<Note>, ApiError> {
    let note = state
        .with_service(move |service| {
            service.ensure_note_exists(note_id)?;
            let is_favorite = body.into_flag()?;
            Ok(service.set_favorite(note_id, is_favorite)?)
        })
        .await?;
    Ok(Json(note))
}

pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": core_version() }))
}
