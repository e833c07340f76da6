//! First-run demo records.

use crate::model::book::{Book, BookId};

const SEED_COVER: &str = "https://marketplace.canva.com/EAFaQMYuZbo/1/0/1003w/canva-brown-rusty-mystery-novel-book-cover-hG1QhA7BiBU.jpg";

/// The five books written on first run, in visible order.
pub fn seed_books() -> Vec<Book> {
    [
        ("1", "The Great Gatsby", "F. Scott Fitzgerald", 10, 50_000.0),
        ("2", "The Catcher in the Rye", "J.D. Salinger", 3, 100_000.0),
        (
            "3",
            "How to Win Friends and Influence People",
            "Dale Carnegie",
            10,
            100_000.0,
        ),
        ("4", "Psychology of the Unconscious", "Carl Jung", 10, 100_000.0),
        ("5", "Atomic Habits", "James Clear", 5, 50_000.0),
    ]
    .into_iter()
    .map(|(id, title, author, stock, price)| Book {
        id: BookId::from(id),
        title: title.to_string(),
        author: author.to_string(),
        stock,
        price,
        img: Some(SEED_COVER.to_string()),
    })
    .collect()
}
