//! Terminal views bound to inventory cells.
//!
//! # Responsibility
//! - Render the book grid and dialog headers from store state.
//! - Re-render through store subscriptions, skipping output that would not
//!   change.

use bookshelf_core::{Book, BookId, InventoryCells, Mount, Readable, Store};
use std::cell::RefCell;

/// Formats a price with Indonesian grouping: `.` thousands, `,` decimals.
///
/// At most three fraction digits are kept and trailing zeros are trimmed.
pub fn format_price(price: f64) -> String {
    let negative = price < 0.0;
    let fixed = format!("{:.3}", price.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !fraction.is_empty() {
        out.push(',');
        out.push_str(fraction);
    }
    out
}

/// One card line of the grid.
pub fn book_line(book: &Book) -> String {
    format!(
        "[{}] {} - {} | Rp {} | Sisa {}",
        book.id,
        book.title,
        book.author,
        format_price(book.price),
        book.stock
    )
}

pub fn print_books(books: &[Book], query: &str) {
    if books.is_empty() {
        if query.is_empty() {
            println!("(no books)");
        } else {
            println!("(no books match `{query}`)");
        }
        return;
    }
    for book in books {
        println!("{}", book_line(book));
    }
}

/// Mounts the list view and the dialog view.
pub fn mount_views(store: &Store, cells: &InventoryCells) -> Vec<Mount> {
    vec![mount_book_list(store, cells), mount_dialogs(store, cells)]
}

fn mount_book_list(store: &Store, cells: &InventoryCells) -> Mount {
    let cells = *cells;
    let last: RefCell<Option<Vec<Book>>> = RefCell::new(None);
    store.mount(&cells.list_dependencies(), move |store| {
        let books = store.get(&cells.visible_books);
        if last.borrow().as_ref() == Some(&books) {
            return;
        }
        let query = store.get(&cells.search_query);
        print_books(&books, &query);
        *last.borrow_mut() = Some(books);
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Dialog {
    Closed,
    Adding,
    Editing(BookId),
}

fn mount_dialogs(store: &Store, cells: &InventoryCells) -> Mount {
    let cells = *cells;
    let last = RefCell::new(Dialog::Closed);
    store.mount(
        &[cells.is_adding.cell_id(), cells.editing_id.cell_id()],
        move |store| {
            let dialog = match (store.get(&cells.is_adding), store.get(&cells.editing_id)) {
                (true, _) => Dialog::Adding,
                (false, Some(id)) => Dialog::Editing(id),
                (false, None) => Dialog::Closed,
            };
            if *last.borrow() == dialog {
                return;
            }
            match &dialog {
                Dialog::Adding => println!("== Add a new book =="),
                Dialog::Editing(id) => println!("== Edit book {id} (blank keeps the current value) =="),
                Dialog::Closed => {}
            }
            *last.borrow_mut() = dialog;
        },
    )
}

#[cfg(test)]
mod tests {
    use super::format_price;

    #[test]
    fn format_price_groups_thousands_with_dots() {
        assert_eq!(format_price(50_000.0), "50.000");
        assert_eq!(format_price(1_234_567.0), "1.234.567");
        assert_eq!(format_price(999.0), "999");
        assert_eq!(format_price(0.0), "0");
    }

    #[test]
    fn format_price_keeps_up_to_three_fraction_digits() {
        assert_eq!(format_price(1_500.5), "1.500,5");
        assert_eq!(format_price(12.3456), "12,346");
    }
}
