//! Case-insensitive title substring filter.
//!
//! # Invariants
//! - The empty query matches every book.
//! - Relative order of the input is preserved.
//! - The query is used as typed; surrounding whitespace is significant.

use crate::model::book::Book;

/// Keeps the books whose title contains `query`, ignoring case.
pub fn filter_by_title(books: Vec<Book>, query: &str) -> Vec<Book> {
    if query.is_empty() {
        return books;
    }
    let needle = query.to_lowercase();
    books
        .into_iter()
        .filter(|book| book.title.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::filter_by_title;
    use crate::model::book::{Book, BookId};

    fn book(id: &str, title: &str) -> Book {
        Book {
            id: BookId::from(id),
            title: title.to_string(),
            author: "someone".to_string(),
            stock: 1,
            price: 1.0,
            img: None,
        }
    }

    #[test]
    fn unicode_titles_match_case_insensitively() {
        let books = vec![book("1", "Ärger im Paradies"), book("2", "Laut")];
        let hits = filter_by_title(books, "ärger");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "1");
    }

    #[test]
    fn whitespace_query_is_not_trimmed() {
        let books = vec![book("1", "Atomic Habits"), book("2", "Dune")];
        let hits = filter_by_title(books, " ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, BookId::from("1"));
    }
}
