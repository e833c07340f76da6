//! Core logic for the Bookshelf inventory manager.
//! This crate is the single source of truth for inventory invariants.

pub mod catalog;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod state;
pub mod storage;

pub use catalog::{Catalog, InventoryCells};
pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::book::{
    Book, BookId, BookInput, BookPatch, BookValidationError, DEFAULT_BOOK_IMAGE,
};
pub use model::form::{BookForm, FormError};
pub use repo::book_repo::{
    BookRepository, LoadReport, LoadSource, RepoError, RepoResult, Snapshot, BOOK_LIST_KEY,
    BOOK_POOL_KEY,
};
pub use repo::seed::seed_books;
pub use search::title::filter_by_title;
pub use service::inventory_service::{InventoryError, InventoryResult, InventoryService};
pub use state::{Atom, CellId, Derived, Getter, Mount, Readable, Store, Subscription};
pub use storage::{LocalStorage, MemoryLocalStorage, SqliteLocalStorage, StorageError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
