//! Observable cell store.
//!
//! # Responsibility
//! - Own every reactive cell (root atoms and derived values) behind stable ids.
//! - Mediate reads/writes for both view code and non-rendering callers.
//! - Propagate change notifications through the explicit dependency graph.
//!
//! # Invariants
//! - Listeners of one cell fire in registration order.
//! - Writing a value equal to the current one is a no-op (no notification,
//!   no version bump).
//! - A derived value is recomputed only when dirty, and is dirty after any of
//!   the sources recorded during its last evaluation notified.
//! - A derived value with listeners is re-evaluated right after it is
//!   invalidated, before any listener runs. Sources it starts reading are
//!   linked even when no listener reads it.
//! - Listeners run after the internal borrow is released, so they may read or
//!   write the store again.

use super::subscription::{Mount, Subscription};
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) type Listener = Rc<dyn Fn()>;
type ComputeFn = Rc<dyn Fn(&Getter<'_>) -> Box<dyn Any>>;

/// Identity of one cell inside one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    store: u64,
    index: u64,
}

impl Display for CellId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell#{}.{}", self.store, self.index)
    }
}

/// Anything the store can read a `T` out of.
pub trait Readable<T> {
    fn cell_id(&self) -> CellId;
}

/// Typed handle to a writable root cell.
pub struct Atom<T> {
    id: CellId,
    _marker: PhantomData<fn() -> T>,
}

/// Typed handle to a read-only derived cell.
pub struct Derived<T> {
    id: CellId,
    _marker: PhantomData<fn() -> T>,
}

macro_rules! impl_handle {
    ($name:ident) => {
        impl<T> $name<T> {
            fn from_id(id: CellId) -> Self {
                Self {
                    id,
                    _marker: PhantomData,
                }
            }

            pub fn id(&self) -> CellId {
                self.id
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> Hash for $name<T> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        impl<T> Debug for $name<T> {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.id)
            }
        }

        impl<T> Readable<T> for $name<T> {
            fn cell_id(&self) -> CellId {
                self.id
            }
        }
    };
}

impl_handle!(Atom);
impl_handle!(Derived);

/// Read access handed to derived compute functions.
///
/// Every cell read through a getter becomes a source of the derived cell
/// being evaluated.
pub struct Getter<'a> {
    store: &'a Store,
    reads: RefCell<Vec<CellId>>,
}

impl Getter<'_> {
    pub fn get<T: Clone + 'static>(&self, cell: &impl Readable<T>) -> T {
        self.reads.borrow_mut().push(cell.cell_id());
        self.store.get(cell)
    }

    /// Like [`Getter::get`], but returns `None` for a removed cell.
    pub fn try_get<T: Clone + 'static>(&self, cell: &impl Readable<T>) -> Option<T> {
        let value = self.store.try_get(cell)?;
        self.reads.borrow_mut().push(cell.cell_id());
        Some(value)
    }
}

enum Slot {
    Root {
        value: Box<dyn Any>,
        version: u64,
    },
    Derived {
        compute: ComputeFn,
        cached: Option<Box<dyn Any>>,
        dirty: bool,
        sources: Vec<CellId>,
    },
}

struct Node {
    slot: Slot,
    listeners: Vec<(u64, Listener)>,
    /// Derived cells that read this cell during their last evaluation.
    dependents: BTreeSet<CellId>,
}

impl Node {
    fn new(slot: Slot) -> Self {
        Self {
            slot,
            listeners: Vec::new(),
            dependents: BTreeSet::new(),
        }
    }

    fn value(&self) -> Option<&dyn Any> {
        match &self.slot {
            Slot::Root { value, .. } => Some(value.as_ref()),
            Slot::Derived { cached, .. } => cached.as_deref(),
        }
    }
}

/// Work produced by one changing write.
struct Notifications {
    /// Derived cells with listeners; re-evaluated before any listener runs
    /// so their sources stay linked even when no listener reads them.
    observed: Vec<CellId>,
    listeners: Vec<Listener>,
}

pub(crate) struct StoreInner {
    id: u64,
    next_index: u64,
    next_listener: u64,
    nodes: HashMap<CellId, Node>,
}

impl StoreInner {
    fn allocate(&mut self, slot: Slot) -> CellId {
        let id = CellId {
            store: self.id,
            index: self.next_index,
        };
        self.next_index += 1;
        self.nodes.insert(id, Node::new(slot));
        id
    }

    fn node(&self, id: CellId) -> &Node {
        match self.nodes.get(&id) {
            Some(node) => node,
            None => self.missing(id),
        }
    }

    fn node_mut(&mut self, id: CellId) -> &mut Node {
        if !self.nodes.contains_key(&id) {
            self.missing(id);
        }
        self.nodes.get_mut(&id).unwrap_or_else(|| unreachable!())
    }

    fn missing(&self, id: CellId) -> ! {
        if id.store != self.id {
            panic!("{id} belongs to a different store (this store is #{})", self.id);
        }
        panic!("{id} was removed from the store");
    }

    pub(crate) fn add_listener(&mut self, id: CellId, listener: Listener) -> u64 {
        let listener_id = self.next_listener;
        self.next_listener += 1;
        self.node_mut(id).listeners.push((listener_id, listener));
        listener_id
    }

    pub(crate) fn remove_listener(&mut self, id: CellId, listener_id: u64) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.listeners.retain(|(existing, _)| *existing != listener_id);
        }
    }

    /// Replaces the recorded sources of a derived cell.
    fn rewire(&mut self, id: CellId, reads: Vec<CellId>) {
        let mut sources = Vec::with_capacity(reads.len());
        for read in reads {
            if read != id && !sources.contains(&read) {
                sources.push(read);
            }
        }

        let previous = match self.nodes.get_mut(&id).map(|node| &mut node.slot) {
            Some(Slot::Derived { sources: current, .. }) => std::mem::take(current),
            _ => return,
        };
        for source in previous {
            if let Some(node) = self.nodes.get_mut(&source) {
                node.dependents.remove(&id);
            }
        }
        for source in &sources {
            if let Some(node) = self.nodes.get_mut(source) {
                node.dependents.insert(id);
            }
        }
        if let Some(Node {
            slot: Slot::Derived { sources: current, .. },
            ..
        }) = self.nodes.get_mut(&id)
        {
            *current = sources;
        }
    }

    /// Marks transitive dependents dirty and gathers listeners to run.
    ///
    /// The same listener registered on several affected cells runs once.
    /// Also returns the invalidated derived cells that have listeners, in
    /// discovery order.
    fn collect_notifications(&mut self, changed: CellId) -> Notifications {
        let mut listeners: Vec<Listener> = Vec::new();
        let mut observed: Vec<CellId> = Vec::new();
        let mut seen_listeners: HashSet<*const ()> = HashSet::new();
        let mut visited: HashSet<CellId> = HashSet::new();
        let mut queue = vec![changed];

        while let Some(id) = queue.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            if let Slot::Derived { dirty, .. } = &mut node.slot {
                *dirty = true;
                if !node.listeners.is_empty() {
                    observed.push(id);
                }
            }
            for (_, listener) in &node.listeners {
                if seen_listeners.insert(Rc::as_ptr(listener) as *const ()) {
                    listeners.push(Rc::clone(listener));
                }
            }
            // Reverse push keeps dependents in creation order when popped.
            queue.extend(node.dependents.iter().rev().copied());
        }

        Notifications {
            observed,
            listeners,
        }
    }
}

/// Explicitly constructed reactive store.
///
/// Cloning a `Store` yields another handle to the same cells. The store is
/// single-threaded (`!Send`), matching the cooperative event loop it serves.
#[derive(Clone)]
pub struct Store {
    inner: Rc<RefCell<StoreInner>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("id", &inner.id)
            .field("cells", &inner.nodes.len())
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
                next_index: 0,
                next_listener: 0,
                nodes: HashMap::new(),
            })),
        }
    }

    /// Creates a root cell holding `initial`.
    pub fn atom<T: Clone + PartialEq + 'static>(&self, initial: T) -> Atom<T> {
        let id = self.inner.borrow_mut().allocate(Slot::Root {
            value: Box::new(initial),
            version: 0,
        });
        Atom::from_id(id)
    }

    /// Creates a derived cell. Evaluation is deferred until first read.
    pub fn derived<T, F>(&self, compute: F) -> Derived<T>
    where
        T: Clone + 'static,
        F: Fn(&Getter<'_>) -> T + 'static,
    {
        let compute: ComputeFn = Rc::new(move |getter| Box::new(compute(getter)));
        let id = self.inner.borrow_mut().allocate(Slot::Derived {
            compute,
            cached: None,
            dirty: true,
            sources: Vec::new(),
        });
        Derived::from_id(id)
    }

    /// Returns the current value of a cell.
    ///
    /// # Panics
    /// - When the cell was removed or belongs to a different store.
    pub fn get<T: Clone + 'static>(&self, cell: &impl Readable<T>) -> T {
        let id = cell.cell_id();
        self.refresh(id);
        let inner = self.inner.borrow();
        match inner.node(id).value().and_then(|value| value.downcast_ref::<T>()) {
            Some(value) => value.clone(),
            None => panic!("{id} does not hold a value of the requested type"),
        }
    }

    /// Returns the current value, or `None` when the cell no longer exists.
    pub fn try_get<T: Clone + 'static>(&self, cell: &impl Readable<T>) -> Option<T> {
        if !self.contains(cell) {
            return None;
        }
        Some(self.get(cell))
    }

    /// Replaces the value of a root cell.
    ///
    /// Returns `false` without notifying anyone when `value` equals the
    /// current value.
    pub fn set<T: Clone + PartialEq + 'static>(&self, atom: &Atom<T>, value: T) -> bool {
        let id = atom.cell_id();
        let notifications = {
            let mut inner = self.inner.borrow_mut();
            let node = inner.node_mut(id);
            let Slot::Root {
                value: current,
                version,
            } = &mut node.slot
            else {
                panic!("{id} is not a root cell");
            };
            let Some(current) = current.downcast_mut::<T>() else {
                panic!("{id} does not hold a value of the written type");
            };
            if *current == value {
                return false;
            }
            *current = value;
            *version += 1;
            inner.collect_notifications(id)
        };

        for derived in notifications.observed {
            self.refresh(derived);
        }
        for listener in notifications.listeners {
            listener();
        }
        true
    }

    /// Applies a pure updater to the current value of a root cell.
    pub fn update<T, F>(&self, atom: &Atom<T>, updater: F) -> bool
    where
        T: Clone + PartialEq + 'static,
        F: FnOnce(&T) -> T,
    {
        let current = self.get(atom);
        self.set(atom, updater(&current))
    }

    /// Number of changing writes applied to a root cell.
    ///
    /// # Panics
    /// - When the cell was removed or belongs to a different store.
    pub fn version<T>(&self, atom: &Atom<T>) -> u64 {
        let id = atom.cell_id();
        let inner = self.inner.borrow();
        match &inner.node(id).slot {
            Slot::Root { version, .. } => *version,
            Slot::Derived { .. } => unreachable!("atom handle {id} points at a derived cell"),
        }
    }

    /// Drops a root cell together with its listeners.
    ///
    /// Returns `false` when the cell was already gone.
    pub fn remove<T>(&self, atom: &Atom<T>) -> bool {
        let removed = self.inner.borrow_mut().nodes.remove(&atom.cell_id());
        // Dropped here, after the borrow, since listeners may own subscriptions.
        removed.is_some()
    }

    pub fn contains<T>(&self, cell: &impl Readable<T>) -> bool {
        self.inner.borrow().nodes.contains_key(&cell.cell_id())
    }

    /// Number of live cells (root and derived).
    pub fn len(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().nodes.is_empty()
    }

    /// Registers `listener` on one cell.
    ///
    /// Subscribing to a derived cell evaluates it once so that its sources
    /// are known before the first notification.
    pub fn subscribe<T>(
        &self,
        cell: &impl Readable<T>,
        listener: impl Fn() + 'static,
    ) -> Subscription {
        self.subscribe_shared(cell.cell_id(), Rc::new(listener))
    }

    /// Binds a view to `deps`: renders now and after every notification.
    pub fn mount(&self, deps: &[CellId], render: impl Fn(&Store) + 'static) -> Mount {
        Mount::new(self, deps, Rc::new(render))
    }

    pub(crate) fn subscribe_shared(&self, id: CellId, listener: Listener) -> Subscription {
        self.refresh(id);
        let listener_id = self.inner.borrow_mut().add_listener(id, listener);
        Subscription::new(Rc::downgrade(&self.inner), id, listener_id)
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<StoreInner>> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<RefCell<StoreInner>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Re-evaluates a derived cell when it is dirty. No-op for root cells.
    fn refresh(&self, id: CellId) {
        let compute = {
            let inner = self.inner.borrow();
            match &inner.node(id).slot {
                Slot::Derived {
                    compute,
                    cached,
                    dirty,
                    ..
                } if *dirty || cached.is_none() => Rc::clone(compute),
                _ => return,
            }
        };

        let getter = Getter {
            store: self,
            reads: RefCell::new(Vec::new()),
        };
        let value = compute(&getter);
        let reads = getter.reads.into_inner();

        let mut inner = self.inner.borrow_mut();
        inner.rewire(id, reads);
        if let Some(Node {
            slot: Slot::Derived { cached, dirty, .. },
            ..
        }) = inner.nodes.get_mut(&id)
        {
            *cached = Some(value);
            *dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn derived_sources_follow_the_last_evaluation() {
        let store = Store::new();
        let use_left = store.atom(true);
        let left = store.atom(1);
        let right = store.atom(10);
        let evaluations = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&evaluations);
        let picked = store.derived(move |get| {
            *counter.borrow_mut() += 1;
            if get.get(&use_left) {
                get.get(&left)
            } else {
                get.get(&right)
            }
        });

        assert_eq!(store.get(&picked), 1);
        store.set(&right, 11);
        assert_eq!(store.get(&picked), 1);
        assert_eq!(*evaluations.borrow(), 1, "unrelated source must not dirty");

        store.set(&use_left, false);
        assert_eq!(store.get(&picked), 11);
        store.set(&left, 2);
        assert_eq!(store.get(&picked), 11);
        assert_eq!(*evaluations.borrow(), 2);
    }

    #[test]
    fn observed_derived_links_new_sources_without_being_read() {
        let store = Store::new();
        let use_left = store.atom(true);
        let left = store.atom(1);
        let right = store.atom(10);
        let picked = store.derived(move |get| {
            if get.get(&use_left) {
                get.get(&left)
            } else {
                get.get(&right)
            }
        });
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        let _sub = store.subscribe(&picked, move || *counter.borrow_mut() += 1);

        store.set(&use_left, false);
        store.set(&right, 11);

        assert_eq!(*calls.borrow(), 2);
        assert_eq!(store.get(&picked), 11);
    }

    #[test]
    fn version_counts_changing_writes_only() {
        let store = Store::new();
        let count = store.atom(0);
        store.set(&count, 1);
        store.set(&count, 1);
        store.update(&count, |prev| prev + 1);
        assert_eq!(store.version(&count), 2);
    }

    #[test]
    fn cell_ids_are_unique_across_stores() {
        let first = Store::new();
        let second = Store::new();
        let a = first.atom(0_u8);
        let b = second.atom(0_u8);
        assert_ne!(a.id(), b.id());
        assert!(!second.contains(&a));
    }

    #[test]
    #[should_panic(expected = "belongs to a different store")]
    fn reading_a_foreign_handle_panics() {
        let first = Store::new();
        let second = Store::new();
        let a = first.atom(0_u8);
        let _ = second.get(&a);
    }
}
