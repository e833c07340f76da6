use bookshelf_core::db::open_db;
use bookshelf_core::{
    seed_books, BookId, BookInput, BookPatch, BookRepository, InventoryCells, InventoryError,
    InventoryService, LoadSource, LocalStorage, MemoryLocalStorage, SqliteLocalStorage, Store,
    BOOK_LIST_KEY, BOOK_POOL_KEY,
};
use serde_json::{json, Value};

fn input(title: &str, stock: u32, price: f64) -> BookInput {
    BookInput {
        title: title.to_string(),
        author: "Someone".to_string(),
        stock,
        price,
        img: None,
    }
}

fn stored_json(storage: &impl LocalStorage, key: &str) -> Value {
    let raw = storage.get_item(key).unwrap().unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn first_bootstrap_seeds_five_books_in_order() {
    let storage = MemoryLocalStorage::new();
    let service = InventoryService::new(Store::new(), BookRepository::new(&storage));

    let report = service.bootstrap().unwrap();

    assert_eq!(report.source, LoadSource::Seeded);
    assert_eq!(report.books, 5);
    let ids = service
        .book_ids()
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(service.books(), seed_books());
    assert_eq!(stored_json(&storage, BOOK_LIST_KEY), json!(["1", "2", "3", "4", "5"]));
}

#[test]
fn second_bootstrap_loads_stored_state_without_reseeding() {
    let storage = MemoryLocalStorage::new();
    {
        let service = InventoryService::new(Store::new(), BookRepository::new(&storage));
        service.bootstrap().unwrap();
        service.delete_book(&BookId::from("1")).unwrap();
    }

    let service = InventoryService::new(Store::new(), BookRepository::new(&storage));
    let report = service.bootstrap().unwrap();

    assert_eq!(report.source, LoadSource::Stored);
    assert_eq!(report.books, 4);
    assert!(service.book(&BookId::from("1")).is_err());
}

#[test]
fn emptied_inventory_is_not_reseeded() {
    let storage = MemoryLocalStorage::new();
    {
        let service = InventoryService::new(Store::new(), BookRepository::new(&storage));
        service.bootstrap().unwrap();
        for id in service.book_ids() {
            service.delete_book(&id).unwrap();
        }
    }

    let service = InventoryService::new(Store::new(), BookRepository::new(&storage));
    let report = service.bootstrap().unwrap();

    assert_eq!(report.source, LoadSource::Stored);
    assert!(service.is_empty());
    assert_eq!(stored_json(&storage, BOOK_LIST_KEY), json!([]));
    assert_eq!(stored_json(&storage, BOOK_POOL_KEY), json!({}));
}

#[test]
fn only_one_record_present_loads_empty_state_without_seeding() {
    let storage = MemoryLocalStorage::new();
    storage.set_item(BOOK_LIST_KEY, r#"["1"]"#).unwrap();
    let service = InventoryService::new(Store::new(), BookRepository::new(&storage));

    let report = service.bootstrap().unwrap();

    assert_eq!(report.source, LoadSource::Empty);
    assert!(service.is_empty());
    assert!(service.book_ids().is_empty());
    assert!(storage.get_item(BOOK_POOL_KEY).unwrap().is_none());
}

#[test]
fn corrupt_record_falls_back_to_empty_state() {
    let storage = MemoryLocalStorage::new();
    storage.set_item(BOOK_LIST_KEY, "not json").unwrap();
    storage.set_item(BOOK_POOL_KEY, "{}").unwrap();
    let service = InventoryService::new(Store::new(), BookRepository::new(&storage));

    let report = service.bootstrap().unwrap();

    match report.source {
        LoadSource::Recovered(reason) => assert!(reason.contains(BOOK_LIST_KEY)),
        other => panic!("unexpected load source: {other:?}"),
    }
    assert!(service.is_empty());
}

#[test]
fn malformed_entries_and_dangling_ids_are_dropped_on_load() {
    let storage = MemoryLocalStorage::new();
    storage
        .set_item(BOOK_LIST_KEY, r#"["a", "missing", "b", "a", "c"]"#)
        .unwrap();
    storage
        .set_item(
            BOOK_POOL_KEY,
            &json!({
                "a": {"id": "a", "title": "Alpha", "author": "X", "stock": 1, "price": 10},
                "b": {"id": "b", "title": "", "author": "X", "stock": 1, "price": 10},
                "c": {"id": "c", "title": "Gamma", "author": "Y", "stock": -3, "price": 10}
            })
            .to_string(),
        )
        .unwrap();
    let service = InventoryService::new(Store::new(), BookRepository::new(&storage));

    let report = service.load().unwrap();

    assert_eq!(report.source, LoadSource::Stored);
    assert_eq!(report.books, 1);
    assert_eq!(report.dropped_books, 2);
    assert_eq!(report.dropped_ids, 4);
    assert_eq!(service.book_ids(), vec![BookId::from("a")]);
    assert_eq!(service.books().len(), 1);
}

#[test]
fn pool_entries_missing_from_the_id_list_are_dropped_on_load() {
    let storage = MemoryLocalStorage::new();
    storage.set_item(BOOK_LIST_KEY, r#"["1"]"#).unwrap();
    storage
        .set_item(
            BOOK_POOL_KEY,
            &json!({
                "1": {"id": "1", "title": "Listed", "author": "X", "stock": 1, "price": 10},
                "2": {"id": "2", "title": "Unlisted", "author": "Y", "stock": 1, "price": 10}
            })
            .to_string(),
        )
        .unwrap();
    let service = InventoryService::new(Store::new(), BookRepository::new(&storage));

    let report = service.bootstrap().unwrap();

    assert_eq!(report.books, 1);
    assert_eq!(report.dropped_books, 1);
    assert_eq!(service.len(), service.books().len());
    let unlisted = BookId::from("2");
    assert!(matches!(
        service.book(&unlisted),
        Err(InventoryError::BookNotFound(_))
    ));
    assert!(service.begin_edit(&unlisted).is_err());
    let patch = BookPatch {
        stock: Some(5),
        ..BookPatch::default()
    };
    assert!(matches!(
        service.edit_book(&unlisted, &patch),
        Err(InventoryError::BookNotFound(_))
    ));
}

#[test]
fn save_writes_both_records_in_wire_shape() {
    let storage = MemoryLocalStorage::new();
    let service = InventoryService::new(Store::new(), BookRepository::new(&storage))
        .with_id_source(|| BookId::from("x1"));

    service.add_book(input("Dune", 2, 120_000.0)).unwrap();

    assert_eq!(stored_json(&storage, BOOK_LIST_KEY), json!(["x1"]));
    assert_eq!(
        stored_json(&storage, BOOK_POOL_KEY),
        json!({
            "x1": {
                "id": "x1",
                "title": "Dune",
                "author": "Someone",
                "stock": 2,
                "price": 120000.0,
                "img": "https://biotrop.org/images/default-book.png"
            }
        })
    );
}

#[test]
fn reload_replaces_store_state_and_removes_old_book_cells() {
    let storage = MemoryLocalStorage::new();
    let store = Store::new();
    let repo = BookRepository::new(&storage);
    let cells = InventoryCells::new(&store);

    repo.bootstrap(&store, &cells).unwrap();
    let old_cell = cells.lookup(&store, &BookId::from("1")).unwrap();

    let report = repo.load(&store, &cells).unwrap();

    assert_eq!(report.books, 5);
    assert!(!store.contains(&old_cell));
    let new_cell = cells.lookup(&store, &BookId::from("1")).unwrap();
    assert_eq!(store.get(&new_cell).title, "The Great Gatsby");
}

#[test]
fn read_snapshot_is_none_until_both_records_exist() {
    let storage = MemoryLocalStorage::new();
    let repo = BookRepository::new(&storage);
    assert!(repo.read_snapshot().unwrap().is_none());

    assert!(repo.seed_if_empty().unwrap());
    assert!(!repo.seed_if_empty().unwrap());

    let snapshot = repo.read_snapshot().unwrap().unwrap();
    assert_eq!(snapshot.ids.len(), 5);
    assert_eq!(snapshot.books.len(), 5);
}

#[test]
fn sqlite_storage_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookshelf.sqlite3");

    let added = {
        let conn = open_db(&path).unwrap();
        let service =
            InventoryService::new(Store::new(), BookRepository::new(SqliteLocalStorage::new(&conn)));
        service.bootstrap().unwrap();
        service.add_book(input("Dune", 1, 99_000.0)).unwrap()
    };

    let conn = open_db(&path).unwrap();
    let storage = SqliteLocalStorage::new(&conn);
    assert_eq!(
        storage.keys().unwrap(),
        vec![BOOK_LIST_KEY.to_string(), BOOK_POOL_KEY.to_string()]
    );

    let service = InventoryService::new(Store::new(), BookRepository::new(storage));
    let report = service.bootstrap().unwrap();

    assert_eq!(report.source, LoadSource::Stored);
    assert_eq!(service.len(), 6);
    assert_eq!(service.book(&added).unwrap().title, "Dune");
    assert_eq!(service.book_ids().last(), Some(&added));
}

#[test]
fn sqlite_storage_upserts_and_removes_items() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("kv.sqlite3")).unwrap();
    let storage = SqliteLocalStorage::new(&conn);

    assert_eq!(storage.get_item("k").unwrap(), None);
    storage.set_item("k", "one").unwrap();
    storage.set_item("k", "two").unwrap();
    assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("two"));

    storage.remove_item("k").unwrap();
    assert_eq!(storage.get_item("k").unwrap(), None);
    storage.remove_item("k").unwrap();
}
