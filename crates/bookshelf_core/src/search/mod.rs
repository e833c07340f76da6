//! Title search.
//!
//! # Responsibility
//! - Filter book lists by a free-text query, as typed into the search box.
//! - Stay pure: filtering never mutates the catalog or the visible ids.

pub mod title;
