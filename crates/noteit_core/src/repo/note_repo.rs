//! Note/todo repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide note and todo persistence APIs over the `notes`/`todos` tables.
//! - Own the atomic note-plus-todos write paths (create, update with todo
//!   replacement).
//!
//! # Invariants
//! - Every write refreshes `notes.updated_at`.
//! - Note lists are ordered by `updated_at DESC, id DESC`.
//! - Todos are read in insertion order (`id ASC`).
//! - A note write and its todo replacement commit together or not at all.

use crate::db::DbError;
use crate::model::note::{
    NewNote, NewTodo, Note, NoteId, NotePatch, NoteValidationError, Todo,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    device_id,
    title,
    content,
    is_favorite,
    updated_at
FROM notes";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(NoteValidationError),
    Db(DbError),
    NotFound(NoteId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for note/todo operations.
pub trait NoteRepository {
    /// Lists all notes owned by `device_id`, most recently updated first.
    fn list_notes_by_device(&self, device_id: &str) -> RepoResult<Vec<Note>>;
    /// Gets one note by id.
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    /// Lists todos of one note in insertion order.
    fn list_todos(&self, note_id: NoteId) -> RepoResult<Vec<Todo>>;
    /// Returns whether a note with `id` exists.
    fn note_exists(&self, id: NoteId) -> RepoResult<bool>;
    /// Inserts one note and its todos (in slice order) in one transaction.
    fn create_note(&mut self, note: &NewNote, todos: &[NewTodo]) -> RepoResult<NoteId>;
    /// Applies a partial update. When `todos` is `Some`, the existing todo
    /// set is replaced in the same transaction.
    fn update_note(
        &mut self,
        id: NoteId,
        patch: &NotePatch,
        todos: Option<&[NewTodo]>,
    ) -> RepoResult<()>;
    /// Sets the favorite flag only.
    fn set_favorite(&self, id: NoteId, is_favorite: bool) -> RepoResult<()>;
    /// Hard-deletes one note; its todos cascade.
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_note_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn list_notes_by_device(&self, device_id: &str) -> RepoResult<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTE_SELECT_SQL}
             WHERE device_id = ?1
             ORDER BY updated_at DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([device_id])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_note_row(row)?));
        }
        Ok(None)
    }

    fn list_todos(&self, note_id: NoteId) -> RepoResult<Vec<Todo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, note_id, title, completed
             FROM todos
             WHERE note_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([note_id])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn note_exists(&self, id: NoteId) -> RepoResult<bool> {
        note_exists_on(self.conn, id)
    }

    fn create_note(&mut self, note: &NewNote, todos: &[NewTodo]) -> RepoResult<NoteId> {
        note.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO notes (device_id, title, content, is_favorite, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                note.device_id.as_str(),
                note.title.as_str(),
                note.content.as_str(),
                bool_to_int(note.is_favorite),
                now_micros(),
            ],
        )?;
        let note_id = tx.last_insert_rowid();
        insert_todos(&tx, note_id, todos)?;
        tx.commit()?;

        Ok(note_id)
    }

    fn update_note(
        &mut self,
        id: NoteId,
        patch: &NotePatch,
        todos: Option<&[NewTodo]>,
    ) -> RepoResult<()> {
        patch.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE notes
             SET
                device_id = COALESCE(?2, device_id),
                title = COALESCE(?3, title),
                content = COALESCE(?4, content),
                is_favorite = COALESCE(?5, is_favorite),
                updated_at = ?6
             WHERE id = ?1;",
            params![
                id,
                patch.device_id.as_deref(),
                patch.title.as_deref(),
                patch.content.as_deref(),
                patch.is_favorite.map(bool_to_int),
                now_micros(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        if let Some(todos) = todos {
            tx.execute("DELETE FROM todos WHERE note_id = ?1;", [id])?;
            insert_todos(&tx, id, todos)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn set_favorite(&self, id: NoteId, is_favorite: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                is_favorite = ?2,
                updated_at = ?3
             WHERE id = ?1;",
            params![id, bool_to_int(is_favorite), now_micros()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn insert_todos(tx: &Transaction<'_>, note_id: NoteId, todos: &[NewTodo]) -> RepoResult<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO todos (note_id, title, completed)
         VALUES (?1, ?2, ?3);",
    )?;
    for todo in todos {
        stmt.execute(params![
            note_id,
            todo.title.as_str(),
            bool_to_int(todo.completed)
        ])?;
    }
    Ok(())
}

fn note_exists_on(conn: &Connection, id: NoteId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let id: NoteId = row.get("id")?;
    let updated_micros: i64 = row.get("updated_at")?;
    let updated_at = DateTime::<Utc>::from_timestamp_micros(updated_micros).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{updated_micros}` in notes.updated_at for note {id}"
        ))
    })?;

    Ok(Note {
        id,
        device_id: row.get("device_id")?,
        updated_at,
        title: row.get("title")?,
        content: row.get("content")?,
        is_favorite: int_to_bool(row.get("is_favorite")?, "notes.is_favorite")?,
    })
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    Ok(Todo {
        id: row.get("id")?,
        note_id: row.get("note_id")?,
        title: row.get("title")?,
        completed: int_to_bool(row.get("completed")?, "todos.completed")?,
    })
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn ensure_note_connection_ready(conn: &Connection) -> RepoResult<()> {
    const REQUIRED: &[(&str, &[&str])] = &[
        (
            "notes",
            &[
                "id",
                "device_id",
                "title",
                "content",
                "is_favorite",
                "updated_at",
            ],
        ),
        ("todos", &["id", "note_id", "title", "completed"]),
    ];

    for &(table, columns) in REQUIRED {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
