//! Reactive state primitives.
//!
//! # Responsibility
//! - Provide root atoms, derived cells and the store that owns them.
//! - Provide subscription guards that bind views to cells.
//!
//! # Invariants
//! - All mutation is synchronous and single-threaded.
//! - Stores are constructed explicitly; there is no process-wide instance.

pub mod store;
pub mod subscription;

pub use store::{Atom, CellId, Derived, Getter, Readable, Store};
pub use subscription::{Mount, Subscription};
