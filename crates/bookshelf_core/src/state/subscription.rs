//! View bindings over store cells.
//!
//! # Responsibility
//! - Keep listener registrations alive exactly as long as their guard.
//! - Bind one render callback to every cell a view reads.
//!
//! # Invariants
//! - Dropping a [`Subscription`] removes its listener before the next write.
//! - A [`Mount`] renders once on creation and at most once per store write.
//! - Guards never keep the store alive.

use super::store::{CellId, Listener, Store, StoreInner};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// RAII guard for one listener on one cell.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<RefCell<StoreInner>>,
    cell: CellId,
    listener: u64,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(store: Weak<RefCell<StoreInner>>, cell: CellId, listener: u64) -> Self {
        Self {
            store,
            cell,
            listener,
            active: true,
        }
    }

    /// Cell this subscription listens to.
    pub fn cell(&self) -> CellId {
        self.cell
    }

    /// Removes the listener now instead of at drop time.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.store.upgrade() {
            inner.borrow_mut().remove_listener(self.cell, self.listener);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cell", &self.cell)
            .field("active", &self.active)
            .finish()
    }
}

/// A mounted view: one render callback subscribed to all of its dependencies.
///
/// The same listener is shared across dependencies, so a write that touches
/// several of them (a root cell and a derived cell over it) re-renders once.
#[must_use = "dropping a mount unmounts the view"]
pub struct Mount {
    subscriptions: Vec<Subscription>,
}

impl Mount {
    pub(crate) fn new(store: &Store, deps: &[CellId], render: Rc<dyn Fn(&Store)>) -> Self {
        render(store);

        let weak = store.downgrade();
        let listener: Listener = Rc::new(move || {
            if let Some(store) = Store::upgrade(&weak) {
                render(&store);
            }
        });

        let mut subscriptions = Vec::with_capacity(deps.len());
        for id in deps {
            if subscriptions
                .iter()
                .any(|existing: &Subscription| existing.cell() == *id)
            {
                continue;
            }
            subscriptions.push(store.subscribe_shared(*id, Rc::clone(&listener)));
        }

        Self { subscriptions }
    }

    /// Number of distinct cells this view listens to.
    pub fn dependency_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Removes every subscription held by this view.
    pub fn unmount(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mount")
            .field("dependencies", &self.subscriptions.len())
            .finish()
    }
}
