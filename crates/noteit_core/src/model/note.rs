//! Note/todo domain model.
//!
//! # Responsibility
//! - Define the persisted `Note` and `Todo` records and their wire shape.
//! - Define write-side inputs (`NewNote`, `NotePatch`, `NewTodo`).
//! - Own the text-field rules shared by the HTTP boundary and repositories.
//!
//! # Invariants
//! - `id` values are assigned by storage and never reused.
//! - Every `Todo` references exactly one existing `Note`.
//! - `device_id`, `title` and `content` are never blank once persisted.
//! - `device_id` and `title` hold at most 255 characters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-assigned note identifier.
pub type NoteId = i64;
/// Storage-assigned todo identifier.
pub type TodoId = i64;

pub const DEVICE_ID_MAX_CHARS: usize = 255;
pub const TITLE_MAX_CHARS: usize = 255;

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_NULL: &str = "This field may not be null.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_INVALID_STRING: &str = "Not a valid string.";
pub const MSG_INVALID_BOOLEAN: &str = "Must be a valid boolean.";

/// Wire/field names, shared by validation errors and JSON payloads.
pub mod field {
    pub const DEVICE_ID: &str = "deviceId";
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const IS_FAVORITE: &str = "isFavorite";
    pub const TODOS: &str = "todos";
    pub const NON_FIELD: &str = "non_field_errors";
}

/// Persisted note, serialized without its todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    /// Opaque client identifier partitioning notes by device.
    pub device_id: String,
    /// Refreshed on every write.
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub content: String,
    pub is_favorite: bool,
}

/// Persisted checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub note_id: NoteId,
    pub title: String,
    pub completed: bool,
}

/// Detail projection: a note plus its todos in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteWithTodos {
    #[serde(flatten)]
    pub note: Note,
    pub todos: Vec<Todo>,
}

/// Validated input for creating a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub device_id: String,
    pub title: String,
    pub content: String,
    pub is_favorite: bool,
}

impl NewNote {
    /// Creates a non-favorite note input.
    pub fn new(
        device_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            title: title.into(),
            content: content.into(),
            is_favorite: false,
        }
    }

    /// Checks text-field rules for every field.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        let mut errors = NoteValidationError::default();
        errors.check_text(
            field::DEVICE_ID,
            &self.device_id,
            Some(DEVICE_ID_MAX_CHARS),
        );
        errors.check_text(field::TITLE, &self.title, Some(TITLE_MAX_CHARS));
        errors.check_text(field::CONTENT, &self.content, None);
        errors.into_result()
    }
}

/// Partial note update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub device_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_favorite: Option<bool>,
}

impl NotePatch {
    /// Checks text-field rules for the fields present in the patch.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        let mut errors = NoteValidationError::default();
        if let Some(value) = self.device_id.as_deref() {
            errors.check_text(field::DEVICE_ID, value, Some(DEVICE_ID_MAX_CHARS));
        }
        if let Some(value) = self.title.as_deref() {
            errors.check_text(field::TITLE, value, Some(TITLE_MAX_CHARS));
        }
        if let Some(value) = self.content.as_deref() {
            errors.check_text(field::CONTENT, value, None);
        }
        errors.into_result()
    }
}

/// Input for one todo created alongside a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
}

impl NewTodo {
    pub fn new(title: impl Into<String>, completed: bool) -> Self {
        Self {
            title: title.into(),
            completed,
        }
    }
}

/// Returns the rule violation for one note text field, if any.
///
/// Callers are expected to pass already-trimmed values.
pub fn text_field_error(value: &str, max_chars: Option<usize>) -> Option<String> {
    if value.trim().is_empty() {
        return Some(MSG_BLANK.to_string());
    }
    match max_chars {
        Some(max) if value.chars().count() > max => Some(format!(
            "Ensure this field has no more than {max} characters."
        )),
        _ => None,
    }
}

/// Per-field validation failures, keyed by wire field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NoteValidationError {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl NoteValidationError {
    /// Builds an error carrying a single message for `field`.
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    /// Records one message for `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    /// Records the text rule violation for `field`, if any.
    pub fn check_text(&mut self, field: &'static str, value: &str, max_chars: Option<usize>) {
        if let Some(message) = text_field_error(value, max_chars) {
            self.add(field, message);
        }
    }

    /// Absorbs all messages from `other`.
    pub fn merge(&mut self, other: NoteValidationError) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for `field`.
    pub fn messages(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Field names carrying at least one message, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid note fields:")?;
        for (field, messages) in &self.fields {
            write!(f, " {field}=[{}]", messages.join(" "))?;
        }
        Ok(())
    }
}

impl Error for NoteValidationError {}
