//! Persistence layer between the store and durable storage.
//!
//! # Responsibility
//! - Encode/decode the two durable inventory records.
//! - Keep JSON and storage details out of service orchestration.
//!
//! # Invariants
//! - Repository reads validate every record before it reaches the store.
//! - Repository APIs return semantic errors (`CorruptState`) in addition to
//!   storage transport errors.

pub mod book_repo;
pub mod seed;
