//! Inventory cells.
//!
//! # Responsibility
//! - Declare every cell the inventory needs in one store: the catalog, the
//!   visible-id sequence, ephemeral UI state and the derived book views.
//! - Resolve book ids to their cells.
//!
//! # Invariants
//! - Every id in `book_ids` has a `catalog` entry. Views skip (and log) an id
//!   that breaks this rather than failing the whole list.
//! - The catalog cell holds handles only; book values live in their own cells.

use crate::model::book::{Book, BookId};
use crate::search::title::filter_by_title;
use crate::state::{Atom, Derived, Readable, Store};
use log::warn;
use std::collections::BTreeMap;

/// Id → book cell mapping.
pub type Catalog = BTreeMap<BookId, Atom<Book>>;

/// Handles to every inventory cell in one store.
#[derive(Debug, Clone, Copy)]
pub struct InventoryCells {
    /// Ordered visible-id sequence.
    pub book_ids: Atom<Vec<BookId>>,
    pub catalog: Atom<Catalog>,
    pub search_query: Atom<String>,
    pub editing_id: Atom<Option<BookId>>,
    pub is_adding: Atom<bool>,
    /// Books in visible-id order, unfiltered.
    pub books: Derived<Vec<Book>>,
    /// `books` filtered by `search_query`.
    pub visible_books: Derived<Vec<Book>>,
}

impl InventoryCells {
    /// Registers an empty inventory in `store`.
    pub fn new(store: &Store) -> Self {
        let book_ids = store.atom(Vec::<BookId>::new());
        let catalog = store.atom(Catalog::new());
        let search_query = store.atom(String::new());
        let editing_id = store.atom(None::<BookId>);
        let is_adding = store.atom(false);

        let books = store.derived(move |get| {
            let ids = get.get(&book_ids);
            let catalog = get.get(&catalog);
            let mut books = Vec::with_capacity(ids.len());
            for id in &ids {
                match catalog.get(id).and_then(|cell| get.try_get(cell)) {
                    Some(book) => books.push(book),
                    None => warn!(
                        "event=book_lookup module=catalog status=error error_code=book_not_found book_id={id}"
                    ),
                }
            }
            books
        });

        let visible_books = store.derived(move |get| {
            let query = get.get(&search_query);
            filter_by_title(get.get(&books), &query)
        });

        Self {
            book_ids,
            catalog,
            search_query,
            editing_id,
            is_adding,
            books,
            visible_books,
        }
    }

    /// Returns the cell of `id`, if the catalog has one.
    pub fn lookup(&self, store: &Store, id: &BookId) -> Option<Atom<Book>> {
        store.get(&self.catalog).get(id).copied()
    }

    /// Returns the current value of book `id`.
    pub fn book(&self, store: &Store, id: &BookId) -> Option<Book> {
        self.lookup(store, id).and_then(|cell| store.try_get(&cell))
    }

    /// Cell ids a full-list view depends on.
    pub fn list_dependencies(&self) -> Vec<crate::state::CellId> {
        vec![self.visible_books.cell_id(), self.search_query.cell_id()]
    }
}
