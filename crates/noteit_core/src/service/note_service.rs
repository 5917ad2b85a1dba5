//! Note use-case service.
//!
//! # Responsibility
//! - Provide the six note use-cases: list by device, view, create, update,
//!   delete and favorite toggle.
//! - Read back persisted state after every write so callers see storage
//!   truth (ids, timestamps, todo ids).
//!
//! # Invariants
//! - Listing requires a non-blank device id.
//! - Todo replacement happens only when the caller supplies a todo list.
//! - The favorite toggle never touches title, content, device or todos.

use crate::model::note::{
    NewNote, NewTodo, Note, NoteId, NotePatch, NoteValidationError, NoteWithTodos,
};
use crate::repo::note_repo::{NoteRepository, RepoError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// List query without a usable device id.
    MissingDeviceId,
    /// Supplied note fields violate text rules.
    Validation(NoteValidationError),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDeviceId => write!(f, "deviceId is required"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent note state: {details}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NoteNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<NoteValidationError> for NoteServiceError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type ServiceResult<T> = Result<T, NoteServiceError>;

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists notes for one device, most recently updated first.
    pub fn list_notes(&self, device_id: &str) -> ServiceResult<Vec<Note>> {
        if device_id.is_empty() {
            return Err(NoteServiceError::MissingDeviceId);
        }
        Ok(self.repo.list_notes_by_device(device_id)?)
    }

    /// Gets one note together with its todos.
    pub fn get_note(&self, id: NoteId) -> ServiceResult<NoteWithTodos> {
        let note = self
            .repo
            .get_note(id)?
            .ok_or(NoteServiceError::NoteNotFound(id))?;
        let todos = self.repo.list_todos(id)?;
        Ok(NoteWithTodos { note, todos })
    }

    /// Fails with `NoteNotFound` unless the note exists.
    pub fn ensure_note_exists(&self, id: NoteId) -> ServiceResult<()> {
        if self.repo.note_exists(id)? {
            Ok(())
        } else {
            Err(NoteServiceError::NoteNotFound(id))
        }
    }

    /// Creates a note and its todos atomically.
    pub fn create_note(
        &mut self,
        note: NewNote,
        todos: Vec<NewTodo>,
    ) -> ServiceResult<NoteWithTodos> {
        let id = self.repo.create_note(&note, &todos)?;
        info!(
            "event=note_create module=service status=ok note_id={} todo_count={}",
            id,
            todos.len()
        );
        self.read_back(id, "created note not found in read-back")
    }

    /// Applies a partial update; `Some(todos)` replaces the whole todo set.
    pub fn update_note(
        &mut self,
        id: NoteId,
        patch: NotePatch,
        todos: Option<Vec<NewTodo>>,
    ) -> ServiceResult<NoteWithTodos> {
        self.repo.update_note(id, &patch, todos.as_deref())?;
        info!(
            "event=note_update module=service status=ok note_id={} todos_replaced={}",
            id,
            todos.is_some()
        );
        self.read_back(id, "updated note not found in read-back")
    }

    /// Sets the favorite flag and returns the note without todos.
    pub fn set_favorite(&self, id: NoteId, is_favorite: bool) -> ServiceResult<Note> {
        self.repo.set_favorite(id, is_favorite)?;
        info!(
            "event=note_favorite module=service status=ok note_id={} is_favorite={}",
            id, is_favorite
        );
        self.repo
            .get_note(id)?
            .ok_or(NoteServiceError::InconsistentState(
                "note missing after favorite update",
            ))
    }

    /// Deletes one note and, by cascade, its todos.
    pub fn delete_note(&self, id: NoteId) -> ServiceResult<()> {
        self.repo.delete_note(id)?;
        info!("event=note_delete module=service status=ok note_id={id}");
        Ok(())
    }

    fn read_back(&self, id: NoteId, missing: &'static str) -> ServiceResult<NoteWithTodos> {
        match self.get_note(id) {
            Err(NoteServiceError::NoteNotFound(_)) => {
                Err(NoteServiceError::InconsistentState(missing))
            }
            other => other,
        }
    }
}
