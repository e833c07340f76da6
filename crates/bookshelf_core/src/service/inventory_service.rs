//! Inventory use-case service.
//!
//! # Responsibility
//! - Provide add/edit/delete/search entry points over the inventory cells.
//! - Own ephemeral UI state transitions (search text, dialogs).
//! - Persist synchronously after every mutating domain operation.
//!
//! # Invariants
//! - Ids are unique within the catalog at mint time.
//! - Delete removes the id from the sequence and the catalog; no orphaned
//!   book cells are left behind.
//! - Every id in the visible sequence has a catalog entry after each call.

use crate::catalog::InventoryCells;
use crate::model::book::{Book, BookId, BookInput, BookPatch, BookValidationError};
use crate::model::form::{BookForm, FormError};
use crate::repo::book_repo::{BookRepository, LoadReport, RepoError};
use crate::state::Store;
use crate::storage::LocalStorage;
use log::{debug, error, info};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_ID_ATTEMPTS: u32 = 16;

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Service error for inventory use-cases.
#[derive(Debug)]
pub enum InventoryError {
    /// The id is not in the catalog.
    BookNotFound(BookId),
    Validation(BookValidationError),
    Form(FormError),
    Repo(RepoError),
    /// The id source kept producing ids already in use.
    IdExhausted { attempts: u32 },
}

impl Display for InventoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BookNotFound(id) => write!(f, "book not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Form(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::IdExhausted { attempts } => {
                write!(f, "could not mint a unique book id after {attempts} attempts")
            }
        }
    }
}

impl Error for InventoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Form(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::BookNotFound(_) | Self::IdExhausted { .. } => None,
        }
    }
}

impl From<BookValidationError> for InventoryError {
    fn from(value: BookValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<FormError> for InventoryError {
    fn from(value: FormError) -> Self {
        Self::Form(value)
    }
}

impl From<RepoError> for InventoryError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Use-case service over one store and one durable medium.
pub struct InventoryService<S: LocalStorage> {
    store: Store,
    cells: InventoryCells,
    repo: BookRepository<S>,
    id_source: RefCell<Box<dyn FnMut() -> BookId>>,
}

impl<S: LocalStorage> InventoryService<S> {
    /// Registers the inventory cells in `store`. State starts empty; call
    /// [`InventoryService::bootstrap`] to load or seed it.
    pub fn new(store: Store, repo: BookRepository<S>) -> Self {
        let cells = InventoryCells::new(&store);
        Self {
            store,
            cells,
            repo,
            id_source: RefCell::new(Box::new(BookId::generate)),
        }
    }

    /// Replaces the id generator used by add.
    pub fn with_id_source(self, source: impl FnMut() -> BookId + 'static) -> Self {
        *self.id_source.borrow_mut() = Box::new(source);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn cells(&self) -> &InventoryCells {
        &self.cells
    }

    /// Seeds durable storage on first run, then loads it into the store.
    pub fn bootstrap(&self) -> InventoryResult<LoadReport> {
        Ok(self.repo.bootstrap(&self.store, &self.cells)?)
    }

    /// Reloads the store from durable storage without seeding.
    pub fn load(&self) -> InventoryResult<LoadReport> {
        Ok(self.repo.load(&self.store, &self.cells)?)
    }

    /// Flushes current state to durable storage.
    pub fn save(&self) -> InventoryResult<()> {
        self.persist("save")
    }

    /// Adds a book built from validated input and returns its new id.
    ///
    /// # Contract
    /// - Blank image falls back to the default cover.
    /// - The id is appended to the visible sequence exactly once.
    /// - Closes the add dialog.
    pub fn add_book(&self, input: BookInput) -> InventoryResult<BookId> {
        let id = self.mint_id()?;
        let book = Book::from_input(id.clone(), input);
        book.validate()?;

        let cell = self.store.atom(book);
        self.store.update(&self.cells.catalog, |catalog| {
            let mut next = catalog.clone();
            next.insert(id.clone(), cell);
            next
        });
        self.store.update(&self.cells.book_ids, |ids| {
            let mut next = ids.clone();
            next.push(id.clone());
            next
        });
        self.store.set(&self.cells.is_adding, false);

        self.persist("add")?;
        info!("event=book_add module=service status=ok book_id={id}");
        Ok(id)
    }

    /// Parses an add-form submission and adds the book.
    pub fn submit_add(&self, form: &BookForm) -> InventoryResult<BookId> {
        let input = form.parse()?;
        self.add_book(input)
    }

    /// Merges submitted fields into an existing book and returns the result.
    ///
    /// # Contract
    /// - `id` never changes; unsubmitted fields are untouched.
    /// - Closes the edit dialog when it targets this book.
    pub fn edit_book(&self, id: &BookId, patch: &BookPatch) -> InventoryResult<Book> {
        let cell = self
            .cells
            .lookup(&self.store, id)
            .ok_or_else(|| InventoryError::BookNotFound(id.clone()))?;

        let next = self.store.get(&cell).merged(patch);
        next.validate()?;
        self.store.set(&cell, next.clone());
        self.clear_editing_if(id);

        self.persist("edit")?;
        info!("event=book_edit module=service status=ok book_id={id}");
        Ok(next)
    }

    /// Parses an edit-form submission and applies it.
    pub fn submit_edit(&self, id: &BookId, form: &BookForm) -> InventoryResult<Book> {
        let patch = form.parse_patch()?;
        self.edit_book(id, &patch)
    }

    /// Deletes a book from the visible sequence and the catalog.
    ///
    /// Returns whether anything was removed; deleting an unknown id is a
    /// no-op apart from the save.
    pub fn delete_book(&self, id: &BookId) -> InventoryResult<bool> {
        let removed_id = self.store.update(&self.cells.book_ids, |ids| {
            ids.iter().filter(|existing| *existing != id).cloned().collect()
        });

        let mut catalog = self.store.get(&self.cells.catalog);
        let removed_cell = catalog.remove(id);
        if let Some(cell) = removed_cell {
            self.store.set(&self.cells.catalog, catalog);
            self.store.remove(&cell);
        }
        self.clear_editing_if(id);

        self.persist("delete")?;
        let removed = removed_id || removed_cell.is_some();
        info!("event=book_delete module=service status=ok book_id={id} removed={removed}");
        Ok(removed)
    }

    /// Returns one book or `BookNotFound`.
    pub fn book(&self, id: &BookId) -> InventoryResult<Book> {
        self.cells
            .book(&self.store, id)
            .ok_or_else(|| InventoryError::BookNotFound(id.clone()))
    }

    /// All books in visible order, ignoring the search query.
    pub fn books(&self) -> Vec<Book> {
        self.store.get(&self.cells.books)
    }

    /// Books in visible order filtered by the current search query.
    pub fn visible_books(&self) -> Vec<Book> {
        self.store.get(&self.cells.visible_books)
    }

    pub fn book_ids(&self) -> Vec<BookId> {
        self.store.get(&self.cells.book_ids)
    }

    /// Number of books in the catalog.
    pub fn len(&self) -> usize {
        self.store.get(&self.cells.catalog).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        self.store.set(&self.cells.search_query, query.into());
    }

    pub fn search_query(&self) -> String {
        self.store.get(&self.cells.search_query)
    }

    pub fn open_add_dialog(&self) {
        self.store.set(&self.cells.is_adding, true);
    }

    pub fn close_add_dialog(&self) {
        self.store.set(&self.cells.is_adding, false);
    }

    pub fn is_adding(&self) -> bool {
        self.store.get(&self.cells.is_adding)
    }

    /// Opens the edit dialog for `id` and returns the book to pre-populate.
    pub fn begin_edit(&self, id: &BookId) -> InventoryResult<Book> {
        let book = self.book(id)?;
        self.store.set(&self.cells.editing_id, Some(id.clone()));
        Ok(book)
    }

    pub fn cancel_edit(&self) {
        self.store.set(&self.cells.editing_id, None);
    }

    pub fn editing_id(&self) -> Option<BookId> {
        self.store.get(&self.cells.editing_id)
    }

    fn clear_editing_if(&self, id: &BookId) {
        if self.editing_id().as_ref() == Some(id) {
            self.store.set(&self.cells.editing_id, None);
        }
    }

    fn mint_id(&self) -> InventoryResult<BookId> {
        let catalog = self.store.get(&self.cells.catalog);
        let mut source = self.id_source.borrow_mut();
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = (*source)();
            if !id.is_blank() && !catalog.contains_key(&id) {
                return Ok(id);
            }
            debug!("event=book_id_mint module=service status=retry attempt={attempt} book_id={id}");
        }
        Err(InventoryError::IdExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    fn persist(&self, operation: &'static str) -> InventoryResult<()> {
        self.repo.save(&self.store, &self.cells).map_err(|err| {
            error!(
                "event=books_save module=service status=error operation={operation} error={err}"
            );
            InventoryError::Repo(err)
        })?;
        Ok(())
    }
}
