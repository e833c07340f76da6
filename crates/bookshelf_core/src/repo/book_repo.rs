//! Book persistence adapter over durable local storage.
//!
//! # Responsibility
//! - Flush the visible-id sequence and catalog from the store into two
//!   durable records.
//! - Materialize stored records back into store cells on startup.
//! - Seed demo records on first run.
//!
//! # Invariants
//! - The adapter holds no copy of inventory state; it only reads and writes
//!   store cells on demand.
//! - Load is decode-and-validate: malformed entries, unlisted entries and
//!   dangling ids never reach the store, and unreadable records fall back to
//!   the empty state.
//! - Seeding happens only when neither record exists.

use crate::catalog::{Catalog, InventoryCells};
use crate::model::book::{Book, BookId};
use crate::repo::seed::seed_books;
use crate::state::Store;
use crate::storage::{LocalStorage, StorageError};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key of the ordered id list record.
pub const BOOK_LIST_KEY: &str = "booksList";
/// Key of the id → book mapping record.
pub const BOOK_POOL_KEY: &str = "booksPools";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence-layer error.
#[derive(Debug)]
pub enum RepoError {
    Storage(StorageError),
    /// A durable record is not valid JSON of the expected shape.
    CorruptState {
        key: &'static str,
        message: String,
    },
    Encode(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::CorruptState { key, message } => {
                write!(f, "corrupt durable record `{key}`: {message}")
            }
            Self::Encode(err) => write!(f, "failed to encode books: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::CorruptState { .. } => None,
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<StorageError> for RepoError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Where the loaded state came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Both records were present and decoded.
    Stored,
    /// Demo records were written, then loaded.
    Seeded,
    /// At least one record was absent.
    Empty,
    /// Records were unreadable; state fell back to empty.
    Recovered(String),
}

/// Outcome summary of [`BookRepository::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub source: LoadSource,
    pub books: usize,
    pub ids: usize,
    /// Catalog entries rejected by decode/validation or absent from the id
    /// list.
    pub dropped_books: usize,
    /// Duplicate ids and ids without a catalog entry.
    pub dropped_ids: usize,
}

impl LoadReport {
    fn empty(source: LoadSource) -> Self {
        Self {
            source,
            books: 0,
            ids: 0,
            dropped_books: 0,
            dropped_ids: 0,
        }
    }
}

/// Validated contents of the two durable records.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub ids: Vec<BookId>,
    pub books: BTreeMap<BookId, Book>,
    pub dropped_books: usize,
    pub dropped_ids: usize,
}

/// Persistence adapter for the book inventory.
pub struct BookRepository<S: LocalStorage> {
    storage: S,
}

impl<S: LocalStorage> BookRepository<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Writes the demo records when neither durable record exists.
    ///
    /// Returns whether seeding happened.
    pub fn seed_if_empty(&self) -> RepoResult<bool> {
        let has_list = self.storage.get_item(BOOK_LIST_KEY)?.is_some();
        let has_pool = self.storage.get_item(BOOK_POOL_KEY)?.is_some();
        if has_list || has_pool {
            return Ok(false);
        }

        let books = seed_books();
        let ids = books.iter().map(|book| book.id.clone()).collect::<Vec<_>>();
        let pool = books
            .iter()
            .map(|book| (book.id.as_str(), book))
            .collect::<BTreeMap<_, _>>();
        self.write_records(&ids, &pool)?;

        info!(
            "event=books_seed module=repo status=ok books={}",
            books.len()
        );
        Ok(true)
    }

    /// Flushes the visible-id sequence and its books to durable storage.
    ///
    /// Ids without a catalog entry are written to the list but have no pool
    /// record. Returns the number of books written.
    pub fn save(&self, store: &Store, cells: &InventoryCells) -> RepoResult<usize> {
        let ids = store.get(&cells.book_ids);
        let catalog = store.get(&cells.catalog);

        let mut books = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(book) = catalog.get(id).and_then(|cell| store.try_get(cell)) {
                books.push(book);
            }
        }
        let pool = books
            .iter()
            .map(|book| (book.id.as_str(), book))
            .collect::<BTreeMap<_, _>>();

        self.write_records(&ids, &pool)?;
        debug!(
            "event=books_save module=repo status=ok ids={} books={}",
            ids.len(),
            pool.len()
        );
        Ok(pool.len())
    }

    /// Reads and validates both durable records.
    ///
    /// Returns `Ok(None)` when either record is absent.
    ///
    /// # Errors
    /// - `CorruptState` when a record is not JSON of the expected shape.
    /// - `Storage` when the medium fails.
    pub fn read_snapshot(&self) -> RepoResult<Option<Snapshot>> {
        let list = self.storage.get_item(BOOK_LIST_KEY)?;
        let pool = self.storage.get_item(BOOK_POOL_KEY)?;
        match (list, pool) {
            (Some(list), Some(pool)) => decode_snapshot(&list, &pool).map(Some),
            _ => Ok(None),
        }
    }

    /// Replaces the store's inventory with the durable records.
    ///
    /// Corrupt records are logged and replaced by the empty state; only
    /// storage failures are returned as errors.
    pub fn load(&self, store: &Store, cells: &InventoryCells) -> RepoResult<LoadReport> {
        let snapshot = match self.read_snapshot() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                apply(store, cells, Vec::new(), BTreeMap::new());
                info!("event=books_load module=repo status=ok source=empty books=0");
                return Ok(LoadReport::empty(LoadSource::Empty));
            }
            Err(err @ RepoError::CorruptState { .. }) => {
                warn!(
                    "event=books_load module=repo status=error error_code=corrupt_state fallback=empty error={err}"
                );
                apply(store, cells, Vec::new(), BTreeMap::new());
                return Ok(LoadReport::empty(LoadSource::Recovered(err.to_string())));
            }
            Err(err) => return Err(err),
        };

        let report = LoadReport {
            source: LoadSource::Stored,
            books: snapshot.books.len(),
            ids: snapshot.ids.len(),
            dropped_books: snapshot.dropped_books,
            dropped_ids: snapshot.dropped_ids,
        };
        if report.dropped_books > 0 || report.dropped_ids > 0 {
            warn!(
                "event=books_load module=repo status=repaired dropped_books={} dropped_ids={}",
                report.dropped_books, report.dropped_ids
            );
        }
        apply(store, cells, snapshot.ids, snapshot.books);
        info!(
            "event=books_load module=repo status=ok source=stored books={} ids={}",
            report.books, report.ids
        );
        Ok(report)
    }

    /// Seeds on first run, then loads.
    pub fn bootstrap(&self, store: &Store, cells: &InventoryCells) -> RepoResult<LoadReport> {
        let seeded = self.seed_if_empty()?;
        let mut report = self.load(store, cells)?;
        if seeded && report.source == LoadSource::Stored {
            report.source = LoadSource::Seeded;
        }
        Ok(report)
    }

    fn write_records(&self, ids: &[BookId], pool: &BTreeMap<&str, &Book>) -> RepoResult<()> {
        let list_json = serde_json::to_string(ids).map_err(RepoError::Encode)?;
        let pool_json = serde_json::to_string(pool).map_err(RepoError::Encode)?;
        self.storage.set_item(BOOK_LIST_KEY, &list_json)?;
        self.storage.set_item(BOOK_POOL_KEY, &pool_json)?;
        Ok(())
    }
}

/// Installs decoded state into the store's inventory cells.
///
/// The id list is cleared first so no view ever observes ids that the
/// catalog being installed does not contain. Replaced book cells are removed
/// last.
fn apply(
    store: &Store,
    cells: &InventoryCells,
    ids: Vec<BookId>,
    books: BTreeMap<BookId, Book>,
) {
    let previous = store.get(&cells.catalog);

    let mut catalog = Catalog::new();
    for (id, book) in books {
        catalog.insert(id, store.atom(book));
    }

    store.set(&cells.book_ids, Vec::new());
    store.set(&cells.catalog, catalog);
    store.set(&cells.book_ids, ids);

    for cell in previous.values() {
        store.remove(cell);
    }
}

fn decode_snapshot(list_json: &str, pool_json: &str) -> RepoResult<Snapshot> {
    let raw_ids: Vec<String> =
        serde_json::from_str(list_json).map_err(|err| RepoError::CorruptState {
            key: BOOK_LIST_KEY,
            message: err.to_string(),
        })?;
    let raw_pool: BTreeMap<String, Value> =
        serde_json::from_str(pool_json).map_err(|err| RepoError::CorruptState {
            key: BOOK_POOL_KEY,
            message: err.to_string(),
        })?;

    let mut books = BTreeMap::new();
    let mut dropped_books = 0;
    for (key, value) in raw_pool {
        match decode_book(&key, value) {
            Ok(book) => {
                books.insert(book.id.clone(), book);
            }
            Err(reason) => {
                dropped_books += 1;
                debug!(
                    "event=book_decode module=repo status=dropped book_id={key} reason={reason}"
                );
            }
        }
    }

    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(raw_ids.len());
    let mut dropped_ids = 0;
    for raw in raw_ids {
        let id = BookId::from(raw);
        if books.contains_key(&id) && seen.insert(id.clone()) {
            ids.push(id);
        } else {
            dropped_ids += 1;
        }
    }

    // Save only writes listed books, so an unlisted entry could never persist.
    books.retain(|id, _| {
        let listed = seen.contains(id);
        if !listed {
            dropped_books += 1;
            debug!("event=book_decode module=repo status=dropped book_id={id} reason=unlisted");
        }
        listed
    });

    Ok(Snapshot {
        ids,
        books,
        dropped_books,
        dropped_ids,
    })
}

fn decode_book(key: &str, value: Value) -> Result<Book, String> {
    let book: Book = serde_json::from_value(value).map_err(|err| err.to_string())?;
    if book.id.as_str() != key {
        return Err(format!("embedded id `{}` differs from key", book.id));
    }
    book.validate().map_err(|err| err.to_string())?;
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::decode_snapshot;
    use crate::model::book::BookId;

    #[test]
    fn decode_drops_entries_with_mismatched_key() {
        let pool = r#"{
            "1": {"id": "1", "title": "A", "author": "B", "stock": 1, "price": 2},
            "2": {"id": "9", "title": "C", "author": "D", "stock": 1, "price": 2}
        }"#;
        let snapshot = decode_snapshot(r#"["1","2"]"#, pool).unwrap();
        assert_eq!(snapshot.ids, vec![BookId::from("1")]);
        assert_eq!(snapshot.dropped_books, 1);
        assert_eq!(snapshot.dropped_ids, 1);
    }

    #[test]
    fn decode_drops_entries_missing_from_the_id_list() {
        let pool = r#"{
            "1": {"id": "1", "title": "A", "author": "B", "stock": 1, "price": 2},
            "2": {"id": "2", "title": "C", "author": "D", "stock": 1, "price": 2}
        }"#;
        let snapshot = decode_snapshot(r#"["1"]"#, pool).unwrap();
        assert_eq!(snapshot.ids, vec![BookId::from("1")]);
        assert_eq!(snapshot.books.len(), 1);
        assert!(!snapshot.books.contains_key(&BookId::from("2")));
        assert_eq!(snapshot.dropped_books, 1);
        assert_eq!(snapshot.dropped_ids, 0);
    }

    #[test]
    fn decode_rejects_non_array_list() {
        let err = decode_snapshot(r#"{"1": true}"#, "{}").unwrap_err();
        assert!(err.to_string().contains("booksList"));
    }
}
