//! Book inventory domain model.
//!
//! # Responsibility
//! - Define the canonical book record and its edit/input shapes.
//! - Define raw form input and its submission-time parsing.
//!
//! # Invariants
//! - Every book is identified by a stable `BookId`.
//! - Record invariants are checked by `Book::validate()` at every write and
//!   at the persistence boundary.

pub mod book;
pub mod form;
