//! Raw form input and submission-time checks.
//!
//! # Responsibility
//! - Hold the strings a user typed into the add/edit form.
//! - Enforce required-field presence and numeric parsing on submit.
//!
//! # Invariants
//! - Add submissions require title, author, stock and price; image is optional.
//! - Edit submissions treat blank fields as "not submitted".

use crate::model::book::{Book, BookInput, BookPatch};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Form-level submission errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    MissingField(&'static str),
    NotANumber { field: &'static str, value: String },
    /// Stock that is not a whole number >= 0, such as `-1` or `2.5`.
    InvalidStock(String),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::NotANumber { field, value } => {
                write!(f, "{field} must be a number, got `{value}`")
            }
            Self::InvalidStock(value) => {
                write!(f, "stock must be a whole number >= 0, got `{value}`")
            }
        }
    }
}

impl Error for FormError {}

/// The raw fields of the book form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub stock: String,
    pub price: String,
    pub img: String,
}

impl BookForm {
    /// Pre-populates the form from an existing record (edit dialog).
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            stock: book.stock.to_string(),
            price: book.price.to_string(),
            img: book.img.clone().unwrap_or_default(),
        }
    }

    /// Parses an add submission.
    ///
    /// # Errors
    /// - `MissingField` for a blank required field.
    /// - `InvalidStock` when stock is not a whole number >= 0.
    /// - `NotANumber` when price is not a number.
    pub fn parse(&self) -> Result<BookInput, FormError> {
        let title = required("title", &self.title)?;
        let author = required("author", &self.author)?;
        let stock = parse_stock(required("stock", &self.stock)?)?;
        let price = parse_price(required("price", &self.price)?)?;
        let img = optional(&self.img);

        Ok(BookInput {
            title: title.to_string(),
            author: author.to_string(),
            stock,
            price,
            img: img.map(str::to_string),
        })
    }

    /// Parses an edit submission into a patch of the non-blank fields.
    pub fn parse_patch(&self) -> Result<BookPatch, FormError> {
        Ok(BookPatch {
            title: optional(&self.title).map(str::to_string),
            author: optional(&self.author).map(str::to_string),
            stock: optional(&self.stock).map(parse_stock).transpose()?,
            price: optional(&self.price).map(parse_price).transpose()?,
            img: optional(&self.img).map(str::to_string),
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, FormError> {
    optional(value).ok_or(FormError::MissingField(field))
}

fn optional(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_stock(value: &str) -> Result<u32, FormError> {
    value
        .parse::<u32>()
        .map_err(|_| FormError::InvalidStock(value.to_string()))
}

fn parse_price(value: &str) -> Result<f64, FormError> {
    match value.parse::<f64>() {
        Ok(price) if price.is_finite() => Ok(price),
        _ => Err(FormError::NotANumber {
            field: "price",
            value: value.to_string(),
        }),
    }
}
