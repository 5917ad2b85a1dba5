//! Domain model for the note/todo aggregate.
//!
//! # Responsibility
//! - Define canonical records used by repositories, services and the HTTP
//!   boundary.
//!
//! # Invariants
//! - A note owns its todos; deleting a note hard-deletes them.
//! - No soft-delete or versioning state is modeled.

pub mod note;
