//! chain-collections: chained hash tables and persistent-tree backed
//! ordered containers.
//!
//! Internal Design:
//!
//! Summary
//! - Two engines, each with thin adapters on top:
//!   - `ChainedTable<H, V>`: bucket array of singly-linked collision
//!     chains. Hashing, equality and what a cell keeps for its key come
//!     from an injected `Helper`. `HashMap`, `HashSet`, `IdentityHashMap`
//!     and `WeakHashMap` are the same table with different helpers.
//!   - `PersistentTree<T, C>`: immutable AVL tree with path copying,
//!     driven through `Path` cursors (find / add / remove / replace /
//!     successor), each mutation yielding a new root.
//!   - `OrderedSet<E, C>` / `OrderedMap<K, V, C>`: hold one root at a time
//!     and store a chain of cells at each tree position so equal-comparing
//!     elements can share a position without touching the tree's key.
//!
//! Hash layer
//! - Cells live in a slotmap arena; buckets and `next` links are arena
//!   handles. A cell's hash is computed once by the helper and cached.
//! - Grow to `max(16, 2 * capacity)` once `len >= 2 * capacity`; halve once
//!   `len <= capacity / 3` while the half is still >= 16. Resizing relinks
//!   handles; no cell is moved, so a `CellHandle` is a stable identity.
//! - Overwriting an existing key replaces the value in place.
//! - Debug builds guard every entry point that runs user code (`Hash`,
//!   `Eq`) against reentrancy into the same table.
//!
//! Ordered layer
//! - The tree compares only chain heads. Chains are persistent cons lists,
//!   so an old root (a snapshot) never observes later mutations.
//! - `CursorMut` removes the element it last returned in one of three ways:
//!   rebuild the chain prefix (interior cell), replace the position's head
//!   (head with a tail), or remove the tree position (sole cell). After any
//!   mutation the cursor re-derives its path from the new root.
//!
//! Concurrency
//! - Containers are not synchronized. `Synchronized<C>` (feature `sync`)
//!   puts one lock around a container; views are taken through its guard.
//! - With feature `arc`, shared nodes use `Arc` and ordered containers are
//!   `Send + Sync`; otherwise they use `Rc`.
//!
//! Notes and non-goals
//! - Iteration order of the hash layer is unspecified; the ordered layer
//!   iterates in comparator order.
//! - A cursor borrows its container mutably, so inserting during iteration
//!   (and the resize it could trigger) is rejected at compile time.
//! - Weak keys are reclaimed by polling: every public call of a
//!   `WeakHashMap` first evicts keys whose last strong reference is gone.

pub mod chained_table;
#[cfg(test)]
mod chained_table_proptest;
pub mod comparator;
mod error;
pub mod hash_map;
pub mod hash_set;
pub mod helper;
pub mod identity_map;
pub mod ordered_map;
pub mod ordered_set;
pub mod persistent_tree;
mod reentrancy;
#[cfg(feature = "sync")]
pub mod synchronized;
pub mod weak_map;

/// Shared pointer used for tree nodes, chain cells and pointer-identity keys.
#[cfg(feature = "arc")]
pub type Shared<T> = std::sync::Arc<T>;
/// Weak counterpart of [`Shared`].
#[cfg(feature = "arc")]
pub type WeakShared<T> = std::sync::Weak<T>;

/// Shared pointer used for tree nodes, chain cells and pointer-identity keys.
#[cfg(not(feature = "arc"))]
pub type Shared<T> = std::rc::Rc<T>;
/// Weak counterpart of [`Shared`].
#[cfg(not(feature = "arc"))]
pub type WeakShared<T> = std::rc::Weak<T>;

// Public surface
pub use chained_table::{CellHandle, ChainedTable, MINIMUM_CAPACITY};
pub use comparator::{Comparator, FnComparator, Natural, Reversed};
pub use error::{Error, Result};
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use helper::{DefaultHelper, Helper, IdentityHelper, WeakHelper};
pub use identity_map::IdentityHashMap;
pub use ordered_map::OrderedMap;
pub use ordered_set::OrderedSet;
pub use persistent_tree::{Lookup, PersistentTree};
pub use reentrancy::DebugReentrancy;
#[cfg(feature = "sync")]
pub use synchronized::{Container, Synchronized};
pub use weak_map::WeakHashMap;
