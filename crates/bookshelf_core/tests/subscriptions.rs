use bookshelf_core::{Readable, Store};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn dropped_subscription_no_longer_fires() {
    let store = Store::new();
    let value = store.atom(0);
    let calls = Rc::new(RefCell::new(0));

    let counter = Rc::clone(&calls);
    let sub = store.subscribe(&value, move || *counter.borrow_mut() += 1);
    store.set(&value, 1);
    drop(sub);
    store.set(&value, 2);

    assert_eq!(*calls.borrow(), 1);
}

#[test]
fn explicit_unsubscribe_removes_only_that_listener() {
    let store = Store::new();
    let value = store.atom(0);
    let log = Rc::new(RefCell::new(Vec::new()));

    let first_log = Rc::clone(&log);
    let first = store.subscribe(&value, move || first_log.borrow_mut().push("first"));
    let second_log = Rc::clone(&log);
    let _second = store.subscribe(&value, move || second_log.borrow_mut().push("second"));

    assert_eq!(first.cell(), value.cell_id());
    first.unsubscribe();
    store.set(&value, 1);

    assert_eq!(*log.borrow(), vec!["second"]);
}

#[test]
fn mount_renders_immediately_and_on_every_dependency_change() {
    let store = Store::new();
    let query = store.atom(String::new());
    let items = store.atom(vec![1, 2, 3]);
    let renders = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&renders);
    let mount = store.mount(&[query.cell_id(), items.cell_id()], move |store| {
        sink.borrow_mut()
            .push((store.get(&query), store.get(&items).len()));
    });
    assert_eq!(mount.dependency_count(), 2);

    store.set(&query, "x".to_string());
    store.set(&items, vec![1]);

    assert_eq!(
        *renders.borrow(),
        vec![
            (String::new(), 3),
            ("x".to_string(), 3),
            ("x".to_string(), 1),
        ]
    );
}

#[test]
fn unmount_removes_all_view_subscriptions() {
    let store = Store::new();
    let a = store.atom(0);
    let b = store.atom(0);
    let renders = Rc::new(RefCell::new(0));

    let counter = Rc::clone(&renders);
    let mount = store.mount(&[a.cell_id(), b.cell_id()], move |_| {
        *counter.borrow_mut() += 1
    });
    mount.unmount();

    store.set(&a, 1);
    store.set(&b, 1);
    assert_eq!(*renders.borrow(), 1, "only the mount render should happen");
}

#[test]
fn mount_over_root_and_derived_renders_once_per_write() {
    let store = Store::new();
    let base = store.atom(1);
    let doubled = store.derived(move |get| get.get(&base) * 2);
    let renders = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&renders);
    let _mount = store.mount(&[base.cell_id(), doubled.cell_id()], move |store| {
        sink.borrow_mut().push(store.get(&doubled));
    });

    store.set(&base, 5);
    assert_eq!(*renders.borrow(), vec![2, 10]);
}

#[test]
fn duplicate_dependencies_are_subscribed_once() {
    let store = Store::new();
    let value = store.atom(0);
    let mount = store.mount(&[value.cell_id(), value.cell_id()], |_| {});
    assert_eq!(mount.dependency_count(), 1);
}

#[test]
fn subscription_outliving_store_drops_cleanly() {
    let store = Store::new();
    let value = store.atom(0);
    let sub = store.subscribe(&value, || {});
    drop(store);
    drop(sub);
}
