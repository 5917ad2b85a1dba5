//! Typed request payloads and boundary validation.
//!
//! # Responsibility
//! - Deserialize each operation's body/query into its own struct.
//! - Check field types and text rules, collecting every field error before
//!   producing core inputs (`NewNote`, `NotePatch`, `NewTodo`).
//!
//! # Invariants
//! - Text fields are trimmed before rule checks and persistence.
//! - A missing `todos` key (or `null`) means "leave todos alone"; an array,
//!   even empty, means "replace".
//! - Read-only fields (`id`, `updatedAt`) and unknown keys are ignored.

use crate::error::{ApiError, IS_FAVORITE_REQUIRED};
use axum::extract::{FromRequest, FromRequestParts};
use noteit_core::model::note::{
    field, text_field_error, DEVICE_ID_MAX_CHARS, MSG_INVALID_BOOLEAN, MSG_INVALID_STRING,
    MSG_NULL, MSG_REQUIRED, TITLE_MAX_CHARS,
};
use noteit_core::{NewNote, NewTodo, NotePatch, NoteValidationError};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// JSON body extractor whose rejections render as `ApiError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as 404.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejections render as `ApiError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `GET /notes/?deviceId=`
#[derive(Debug, Default, Deserialize)]
pub struct ListNotesQuery {
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
}

/// One checklist entry inside a create/update body.
///
/// Both fields are loosely typed: `completed` accepts the same spellings as
/// `isFavorite`, and a numeric `title` is stringified.
#[derive(Debug, Default, Deserialize)]
pub struct TodoInput {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub completed: Option<Value>,
}

impl TodoInput {
    fn into_todo(self, errors: &mut NoteValidationError) -> Option<NewTodo> {
        let title = match self.title {
            None | Some(Value::Null) => Some(String::new()),
            Some(Value::String(title)) => Some(title),
            Some(Value::Number(number)) => Some(number.to_string()),
            Some(_) => {
                errors.add(field::TODOS, MSG_INVALID_TODO_TITLE);
                None
            }
        };
        let completed = match self.completed {
            None | Some(Value::Null) => Some(false),
            Some(value) => {
                let parsed = parse_boolean(&value);
                if parsed.is_none() {
                    errors.add(field::TODOS, MSG_INVALID_TODO_COMPLETED);
                }
                parsed
            }
        };
        Some(NewTodo::new(title?, completed?))
    }
}

const MSG_INVALID_TODO_TITLE: &str = "Todo title must be a string.";
const MSG_INVALID_TODO_COMPLETED: &str = "Todo completed must be a valid boolean.";

/// `POST /notes/create/`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    #[serde(default, deserialize_with = "present")]
    pub device_id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub is_favorite: Option<Value>,
    #[serde(default)]
    pub todos: Option<Vec<TodoInput>>,
}

impl CreateNoteRequest {
    /// Validates the body into a note and its todos.
    pub fn into_parts(self) -> Result<(NewNote, Vec<NewTodo>), NoteValidationError> {
        let mut errors = NoteValidationError::default();
        let device_id = required_text(
            &mut errors,
            field::DEVICE_ID,
            self.device_id,
            Some(DEVICE_ID_MAX_CHARS),
        );
        let title = required_text(&mut errors, field::TITLE, self.title, Some(TITLE_MAX_CHARS));
        let content = required_text(&mut errors, field::CONTENT, self.content, None);
        let is_favorite = required_boolean(&mut errors, field::IS_FAVORITE, self.is_favorite);

        let todos = into_todos(&mut errors, self.todos.unwrap_or_default());

        match (device_id, title, content, is_favorite, todos) {
            (Some(device_id), Some(title), Some(content), Some(is_favorite), Some(todos))
                if errors.is_empty() =>
            {
                let note = NewNote {
                    device_id,
                    title,
                    content,
                    is_favorite,
                };
                Ok((note, todos))
            }
            _ => Err(errors),
        }
    }
}

/// `PUT /notes/{id}/update/`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    #[serde(default, deserialize_with = "present")]
    pub device_id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub is_favorite: Option<Value>,
    #[serde(default)]
    pub todos: Option<Vec<TodoInput>>,
}

impl UpdateNoteRequest {
    /// Validates the supplied fields into a patch and optional todo set.
    pub fn into_parts(self) -> Result<(NotePatch, Option<Vec<NewTodo>>), NoteValidationError> {
        let mut errors = NoteValidationError::default();
        let patch = NotePatch {
            device_id: self.device_id.and_then(|value| {
                text(&mut errors, field::DEVICE_ID, value, Some(DEVICE_ID_MAX_CHARS))
            }),
            title: self
                .title
                .and_then(|value| text(&mut errors, field::TITLE, value, Some(TITLE_MAX_CHARS))),
            content: self
                .content
                .and_then(|value| text(&mut errors, field::CONTENT, value, None)),
            is_favorite: self
                .is_favorite
                .and_then(|value| boolean(&mut errors, field::IS_FAVORITE, value)),
        };
        let todos = match self.todos {
            Some(todos) => into_todos(&mut errors, todos),
            None => None,
        };
        errors.into_result()?;
        Ok((patch, todos))
    }
}

/// `PATCH /notes/{id}/favorite/`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    #[serde(default, deserialize_with = "present")]
    pub is_favorite: Option<Value>,
}

impl FavoriteRequest {
    /// Returns the requested flag.
    pub fn into_flag(self) -> Result<bool, ApiError> {
        let value = match self.is_favorite {
            None | Some(Value::Null) => return Err(ApiError::MissingInput(IS_FAVORITE_REQUIRED)),
            Some(value) => value,
        };
        let mut errors = NoteValidationError::default();
        match boolean(&mut errors, field::IS_FAVORITE, value) {
            Some(flag) => Ok(flag),
            None => Err(ApiError::Validation(errors)),
        }
    }
}

// Distinguishes an explicit `null` (Some(Value::Null)) from an absent key (None).
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// Converts every entry so all todo errors are reported together.
fn into_todos(errors: &mut NoteValidationError, todos: Vec<TodoInput>) -> Option<Vec<NewTodo>> {
    let converted: Vec<Option<NewTodo>> = todos
        .into_iter()
        .map(|todo| todo.into_todo(errors))
        .collect();
    converted.into_iter().collect()
}

fn required_boolean(
    errors: &mut NoteValidationError,
    name: &'static str,
    value: Option<Value>,
) -> Option<bool> {
    match value {
        Some(value) => boolean(errors, name, value),
        None => {
            errors.add(name, MSG_REQUIRED);
            None
        }
    }
}

fn required_text(
    errors: &mut NoteValidationError,
    name: &'static str,
    value: Option<Value>,
    max_chars: Option<usize>,
) -> Option<String> {
    match value {
        Some(value) => text(errors, name, value, max_chars),
        None => {
            errors.add(name, MSG_REQUIRED);
            None
        }
    }
}

fn text(
    errors: &mut NoteValidationError,
    name: &'static str,
    value: Value,
    max_chars: Option<usize>,
) -> Option<String> {
    let raw = match value {
        Value::String(value) => value,
        Value::Number(number) => number.to_string(),
        Value::Null => {
            errors.add(name, MSG_NULL);
            return None;
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            errors.add(name, MSG_INVALID_STRING);
            return None;
        }
    };

    let trimmed = raw.trim();
    match text_field_error(trimmed, max_chars) {
        Some(message) => {
            errors.add(name, message);
            None
        }
        None => Some(trimmed.to_string()),
    }
}

fn boolean(errors: &mut NoteValidationError, name: &'static str, value: Value) -> Option<bool> {
    if value.is_null() {
        errors.add(name, MSG_NULL);
        return None;
    }
    let parsed = parse_boolean(&value);
    if parsed.is_none() {
        errors.add(name, MSG_INVALID_BOOLEAN);
    }
    parsed
}

fn parse_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
