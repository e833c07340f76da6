//! Interactive session: composition root and command dispatch.
//!
//! # Responsibility
//! - Wire storage, store, service and views together.
//! - Translate typed commands into inventory use-cases.
//!
//! # Invariants
//! - Domain errors are reported and the session continues; only terminal
//!   I/O and bootstrap failures end it.

use crate::view::{mount_views, print_books};
use bookshelf_core::db::{open_db, DbError};
use bookshelf_core::{
    AppConfig, Book, BookForm, BookId, BookRepository, InventoryError, InventoryService,
    LoadSource, LocalStorage, MemoryLocalStorage, SqliteLocalStorage, Store,
};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, Write};

const HELP: &str = "\
commands:
  list              show books matching the current search
  search [text]     filter by title (no text clears the search)
  add               add a book
  edit <id>         edit a book
  delete <id>       delete a book
  help              show this help
  quit              exit";

/// Session-ending failures.
#[derive(Debug)]
pub enum AppError {
    Io(io::Error),
    Db(DbError),
    Inventory(InventoryError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "terminal I/O failed: {err}"),
            Self::Db(err) => write!(f, "failed to open book database: {err}"),
            Self::Inventory(err) => write!(f, "failed to load books: {err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Inventory(err) => Some(err),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<InventoryError> for AppError {
    fn from(value: InventoryError) -> Self {
        Self::Inventory(value)
    }
}

/// Runs one interactive session on stdin/stdout.
pub fn run(config: &AppConfig) -> Result<(), AppError> {
    if config.in_memory {
        return run_session(MemoryLocalStorage::new());
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let conn = open_db(config.db_path())?;
    run_session(SqliteLocalStorage::new(&conn))
}

fn run_session<S: LocalStorage>(storage: S) -> Result<(), AppError> {
    let service = InventoryService::new(Store::new(), BookRepository::new(storage));
    let report = service.bootstrap()?;
    if let LoadSource::Recovered(reason) = &report.source {
        eprintln!("warning: stored books were unreadable and have been reset ({reason})");
    }
    info!(
        "event=session_start module=cli status=ok books={} dropped_books={}",
        report.books, report.dropped_books
    );

    let _views = mount_views(service.store(), service.cells());

    let stdin = io::stdin();
    let mut session = Session {
        service: &service,
        input: stdin.lock(),
    };
    session.run()?;

    info!("event=session_end module=cli status=ok books={}", service.len());
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    List,
    Search(String),
    Add,
    Edit(BookId),
    Delete(BookId),
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match verb {
            "list" | "ls" => Ok(Self::List),
            "search" | "find" => Ok(Self::Search(rest.to_string())),
            "add" => Ok(Self::Add),
            "edit" => required_id(rest).map(Self::Edit),
            "delete" | "rm" => required_id(rest).map(Self::Delete),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command `{other}`; type `help`")),
        }
    }
}

fn required_id(value: &str) -> Result<BookId, String> {
    if value.is_empty() {
        Err("a book id is required".to_string())
    } else {
        Ok(BookId::from(value))
    }
}

struct Session<'a, S: LocalStorage, R: BufRead> {
    service: &'a InventoryService<S>,
    input: R,
}

impl<S: LocalStorage, R: BufRead> Session<'_, S, R> {
    fn run(&mut self) -> io::Result<()> {
        println!("{HELP}");
        while let Some(line) = self.prompt("> ")? {
            if line.trim().is_empty() {
                continue;
            }
            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => self.dispatch(command)?,
                Err(message) => println!("{message}"),
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, command: Command) -> io::Result<()> {
        let service = self.service;
        match command {
            Command::List => print_books(&service.visible_books(), &service.search_query()),
            Command::Search(query) => service.set_search_query(query),
            Command::Add => {
                service.open_add_dialog();
                let form = self.read_form(None)?;
                match service.submit_add(&form) {
                    Ok(id) => println!("added book {id}"),
                    Err(err) => {
                        service.close_add_dialog();
                        println!("error: {err}");
                    }
                }
            }
            Command::Edit(id) => {
                let book = match service.begin_edit(&id) {
                    Ok(book) => book,
                    Err(err) => {
                        println!("error: {err}");
                        return Ok(());
                    }
                };
                let form = self.read_form(Some(&book))?;
                match service.submit_edit(&id, &form) {
                    Ok(_) => println!("updated book {id}"),
                    Err(err) => {
                        service.cancel_edit();
                        println!("error: {err}");
                    }
                }
            }
            Command::Delete(id) => match service.delete_book(&id) {
                Ok(true) => println!("deleted book {id}"),
                Ok(false) => println!("no book with id {id}"),
                Err(err) => println!("error: {err}"),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
        Ok(())
    }

    /// Prompts for every form field. With `current`, prompts show the
    /// existing value and blank answers keep it.
    fn read_form(&mut self, current: Option<&Book>) -> io::Result<BookForm> {
        let defaults = current.map(BookForm::from_book).unwrap_or_default();
        let required = current.is_none();
        Ok(BookForm {
            title: self.field("Title", &defaults.title, required)?,
            author: self.field("Author", &defaults.author, required)?,
            stock: self.field("Stock", &defaults.stock, required)?,
            price: self.field("Price", &defaults.price, required)?,
            img: self.field("Image URL", &defaults.img, false)?,
        })
    }

    fn field(&mut self, label: &str, current: &str, required: bool) -> io::Result<String> {
        let prompt = match (current.is_empty(), required) {
            (false, _) => format!("{label} [{current}]: "),
            (true, true) => format!("{label}*: "),
            (true, false) => format!("{label}: "),
        };
        Ok(self.prompt(&prompt)?.unwrap_or_default())
    }

    /// Returns `None` at end of input.
    fn prompt(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
