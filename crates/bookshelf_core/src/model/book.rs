//! Book domain model.
//!
//! # Responsibility
//! - Define the canonical book record persisted in durable storage.
//! - Provide validation for record-level invariants.
//! - Provide field-by-field merge semantics for edits.
//!
//! # Invariants
//! - `id` is stable and never changes after creation.
//! - `title` and `author` are never blank.
//! - `price` is finite and non-negative; `stock` is non-negative by type.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Image shown for books added without an explicit cover URL.
pub const DEFAULT_BOOK_IMAGE: &str = "https://biotrop.org/images/default-book.png";

/// Stable identifier of a book record.
///
/// Seeded books use short numeric ids ("1".."5"); books added at runtime get
/// a UUID in simple form. Both are plain strings on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Mints a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for BookId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BookId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Record-level validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum BookValidationError {
    BlankId,
    BlankTitle,
    BlankAuthor,
    InvalidPrice(f64),
}

impl Display for BookValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "book id must not be blank"),
            Self::BlankTitle => write!(f, "book title must not be blank"),
            Self::BlankAuthor => write!(f, "book author must not be blank"),
            Self::InvalidPrice(price) => {
                write!(f, "book price must be a finite number >= 0, got {price}")
            }
        }
    }
}

impl Error for BookValidationError {}

/// Canonical book record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Copies remaining.
    pub stock: u32,
    pub price: f64,
    /// Cover image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
}

/// Field values for a new book, as accepted from the add form.
#[derive(Debug, Clone, PartialEq)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub stock: u32,
    pub price: f64,
    pub img: Option<String>,
}

/// Submitted fields of an edit. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub stock: Option<u32>,
    pub price: Option<f64>,
    /// A blank URL falls back to [`DEFAULT_BOOK_IMAGE`].
    pub img: Option<String>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.stock.is_none()
            && self.price.is_none()
            && self.img.is_none()
    }
}

impl Book {
    /// Builds a book from form input under the given id.
    ///
    /// A missing or blank image is replaced by [`DEFAULT_BOOK_IMAGE`].
    pub fn from_input(id: BookId, input: BookInput) -> Self {
        Self {
            id,
            title: input.title,
            author: input.author,
            stock: input.stock,
            price: input.price,
            img: Some(normalize_image(input.img)),
        }
    }

    /// Checks record-level invariants.
    ///
    /// # Errors
    /// - Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), BookValidationError> {
        if self.id.is_blank() {
            return Err(BookValidationError::BlankId);
        }
        if self.title.trim().is_empty() {
            return Err(BookValidationError::BlankTitle);
        }
        if self.author.trim().is_empty() {
            return Err(BookValidationError::BlankAuthor);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(BookValidationError::InvalidPrice(self.price));
        }
        Ok(())
    }

    /// Returns a copy with every submitted field overwritten. `id` is kept.
    pub fn merged(&self, patch: &BookPatch) -> Self {
        let mut next = self.clone();
        if let Some(title) = &patch.title {
            next.title = title.clone();
        }
        if let Some(author) = &patch.author {
            next.author = author.clone();
        }
        if let Some(stock) = patch.stock {
            next.stock = stock;
        }
        if let Some(price) = patch.price {
            next.price = price;
        }
        if let Some(img) = &patch.img {
            next.img = Some(normalize_image(Some(img.clone())));
        }
        next
    }
}

fn normalize_image(img: Option<String>) -> String {
    match img {
        Some(url) if !url.trim().is_empty() => url,
        _ => DEFAULT_BOOK_IMAGE.to_string(),
    }
}
