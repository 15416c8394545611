//! OrderedSet: a mutable sorted container over one persistent tree root.
//!
//! Each tree position holds a chain of cells. The tree orders positions by
//! the chain head only; further cells at a position compare equal to the
//! head and are reached by walking the chain. Chains are persistent cons
//! lists, so replacing a position's chain never disturbs a snapshot.
//!
//! Every mutation swaps `self.tree` for the root returned by a path
//! operation. The previous root stays valid for any [`OrderedSet::snapshot`]
//! that still holds it.

use crate::comparator::{Comparator, Natural};
use crate::error::{Error, Result};
use crate::persistent_tree::{self, Lookup, Path, PersistentTree};
use crate::Shared;
use core::cmp::Ordering;
use core::fmt::Debug;
use log::trace;

/// One link of the chain stored at a tree position.
pub(crate) struct Cell<E> {
    value: E,
    next: Chain<E>,
}

type Head<E> = Shared<Cell<E>>;
type Chain<E> = Option<Head<E>>;

/// Orders chain heads by their values.
pub(crate) struct ByHead<C>(C);

impl<E, C: Comparator<E>> Comparator<Head<E>> for ByHead<C> {
    #[inline]
    fn compare(&self, a: &Head<E>, b: &Head<E>) -> Ordering {
        self.0.compare(&a.value, &b.value)
    }
}

type Tree<E, C> = PersistentTree<Head<E>, ByHead<C>>;
type TreePath<E, C> = Path<Head<E>, ByHead<C>>;

fn cell_at<E>(head: &Head<E>, depth: usize) -> Option<&Head<E>> {
    let mut at = head;
    for _ in 0..depth {
        at = at.next.as_ref()?;
    }
    Some(at)
}

// The chain starting at `head` without its cell at `depth`. Cells before
// `depth` are copied; the tail after it is shared.
fn without_cell<E: Clone>(head: &Head<E>, depth: usize) -> Chain<E> {
    let mut prefix = Vec::with_capacity(depth);
    let mut at = head;
    for _ in 0..depth {
        match &at.next {
            Some(next) => {
                prefix.push(at.value.clone());
                at = next;
            }
            None => break,
        }
    }
    prefix
        .into_iter()
        .rev()
        .fold(at.next.clone(), |next, value| Some(Shared::new(Cell { value, next })))
}

// Move the value out of a cell no root refers to any more; clone it if a
// snapshot still does.
fn take_value<E: Clone>(cell: Head<E>) -> E {
    match Shared::try_unwrap(cell) {
        Ok(cell) => cell.value,
        Err(shared) => shared.value.clone(),
    }
}

pub struct OrderedSet<E, C = Natural> {
    tree: Tree<E, C>,
    len: usize,
}

impl<E: Ord> OrderedSet<E> {
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<E: Ord> Default for OrderedSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, C> Clone for OrderedSet<E, C> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            len: self.len,
        }
    }
}

impl<E, C> OrderedSet<E, C> {
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            tree: PersistentTree::new(ByHead(comparator)),
            len: 0,
        }
    }

    pub fn comparator(&self) -> &C {
        &self.tree.comparator().0
    }

    /// Number of elements, counting every cell of every chain.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// O(1) copy of the current contents. Later mutations of either set
    /// are invisible to the other.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    pub fn clear(&mut self) {
        self.tree = self.tree.emptied();
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            positions: self.tree.iter(),
            chain: None,
            remaining: self.len,
        }
    }

    /// Head of the first position.
    pub fn first(&self) -> Result<&E> {
        self.tree
            .first_value()
            .map(|head| &head.value)
            .ok_or(Error::NoSuchElement)
    }

    /// Last cell of the last position's chain.
    pub fn last(&self) -> Result<&E> {
        let mut at = self.tree.last_value().ok_or(Error::NoSuchElement)?;
        while let Some(next) = &at.next {
            at = next;
        }
        Ok(&at.value)
    }

    /// Head value at the position `cmp` selects. `cmp(e)` orders the sought
    /// element against `e`, consistently with the set's comparator.
    pub(crate) fn get_by<F>(&self, mut cmp: F) -> Option<&E>
    where
        F: FnMut(&E) -> Ordering,
    {
        self.tree.get_by(|head| cmp(&head.value)).map(|head| &head.value)
    }
}

impl<E, C: Comparator<E>> OrderedSet<E, C> {
    pub fn contains(&self, value: &E) -> bool {
        self.get(value).is_some()
    }

    /// The head element comparing equal to `value`.
    pub fn get(&self, value: &E) -> Option<&E> {
        let cmp = self.comparator();
        self.get_by(|e| cmp.compare(value, e))
    }

    fn find(&self, value: &E) -> Lookup<Head<E>, ByHead<C>> {
        let cmp = self.comparator();
        self.tree.find_by(|head| cmp.compare(value, &head.value))
    }
}

impl<E: Clone, C: Comparator<E>> OrderedSet<E, C> {
    /// Add `value` unless an equal element is present. Returns `true` if
    /// it was added.
    pub fn insert(&mut self, value: E) -> bool {
        match self.find(&value) {
            Lookup::Found(_) => false,
            Lookup::Fresh(path) => {
                self.tree = path.add(Shared::new(Cell { value, next: None }));
                self.len += 1;
                true
            }
        }
    }

    /// Add `value`, replacing the head of an equal position. Returns the
    /// replaced head; the position's remaining chain stays behind the new
    /// head.
    pub fn insert_or_replace(&mut self, value: E) -> Option<E> {
        match self.find(&value) {
            Lookup::Found(path) => {
                let old = path.value().clone();
                let next = old.next.clone();
                self.tree = path.replace_with(Shared::new(Cell { value, next }));
                Some(take_value(old))
            }
            Lookup::Fresh(path) => {
                self.tree = path.add(Shared::new(Cell { value, next: None }));
                self.len += 1;
                None
            }
        }
    }

    /// Add `value` even if equal elements exist; it becomes the head of
    /// their position, ahead of the older ones.
    pub fn push(&mut self, value: E) {
        self.tree = match self.find(&value) {
            Lookup::Found(path) => {
                let next = Some(path.value().clone());
                path.replace_with(Shared::new(Cell { value, next }))
            }
            Lookup::Fresh(path) => path.add(Shared::new(Cell { value, next: None })),
        };
        self.len += 1;
    }

    /// Remove and return the head element equal to `value`.
    pub fn remove(&mut self, value: &E) -> Option<E> {
        let path = self.find(value).found()?;
        self.remove_found(path)
    }

    /// `remove` with the position chosen by `cmp`, see [`Self::get_by`].
    /// `cmp` also receives the set's comparator.
    pub(crate) fn remove_by<F>(&mut self, mut cmp: F) -> Option<E>
    where
        F: FnMut(&C, &E) -> Ordering,
    {
        let comparator = self.comparator();
        let path = self
            .tree
            .find_by(|head| cmp(comparator, &head.value))
            .found()?;
        self.remove_found(path)
    }

    fn remove_found(&mut self, path: TreePath<E, C>) -> Option<E> {
        let (tree, removed) = self.unlink(path, 0)?;
        self.tree = tree;
        Some(take_value(removed))
    }

    // Drop the cell at `depth` of the chain at `path`. Returns the new root
    // and the removed cell.
    fn unlink(&mut self, path: TreePath<E, C>, depth: usize) -> Option<(Tree<E, C>, Head<E>)> {
        let head = path.value().clone();
        let removed = cell_at(&head, depth)?.clone();
        let tree = match without_cell(&head, depth) {
            // Interior cell, or a head with a tail: same tree shape.
            Some(chain) => path.replace_with(chain),
            // Sole cell: the position goes away.
            None => path.remove(),
        };
        self.len -= 1;
        Some((tree, removed))
    }

    pub fn pop_first(&mut self) -> Option<E> {
        let path = self.tree.first()?;
        self.remove_found(path)
    }

    /// Removes the last cell of the last position, the element `last`
    /// reports.
    pub fn pop_last(&mut self) -> Option<E> {
        let path = self.tree.last()?;
        let mut depth = 0;
        let mut at = path.value();
        while let Some(next) = &at.next {
            at = next;
            depth += 1;
        }
        let (tree, removed) = self.unlink(path, depth)?;
        self.tree = tree;
        Some(take_value(removed))
    }

    /// Iterator in sort order that can remove the element it last returned.
    pub fn cursor_mut(&mut self) -> CursorMut<'_, E, C> {
        CursorMut {
            set: self,
            state: CursorState::Unstarted,
        }
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&E) -> bool,
    {
        let mut cursor = self.cursor_mut();
        while let Some(value) = cursor.next() {
            if !keep(value) {
                let removed = cursor.remove();
                debug_assert!(removed.is_ok(), "cursor must hold the element `next` returned");
            }
        }
    }
}

/// Borrowing iterator in sort order; equal elements come out in chain
/// order.
pub struct Iter<'a, E> {
    positions: persistent_tree::Iter<'a, Head<E>>,
    chain: Option<&'a Cell<E>>,
    remaining: usize,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<Self::Item> {
        let cell = match self.chain.take() {
            Some(cell) => cell,
            None => &**self.positions.next()?,
        };
        self.chain = cell.next.as_deref();
        self.remaining -= 1;
        Some(&cell.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<E> ExactSizeIterator for Iter<'_, E> {}

impl<'a, E, C> IntoIterator for &'a OrderedSet<E, C> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Where a [`CursorMut`] stands.
///
/// Paths are always derived from the set's current root: every removal
/// re-finds the position it continues from.
enum CursorState<E, C> {
    Unstarted,
    /// Last returned the cell at `depth` of the chain at `path`.
    At {
        path: TreePath<E, C>,
        cell: Head<E>,
        depth: usize,
    },
    /// The last returned element was removed; `next` is what comes after
    /// it in the new root.
    Detached {
        next: Option<(TreePath<E, C>, usize)>,
    },
    Done,
}

/// Sort-order iterator over an [`OrderedSet`] with removal of the element
/// it last returned.
pub struct CursorMut<'a, E, C> {
    set: &'a mut OrderedSet<E, C>,
    state: CursorState<E, C>,
}

impl<E: Clone, C: Comparator<E>> CursorMut<'_, E, C> {
    // The element at `depth` of the chain at `path`, or the head of the
    // following position once that chain is exhausted.
    fn settle(path: TreePath<E, C>, depth: usize) -> CursorState<E, C> {
        let cell = cell_at(path.value(), depth).cloned();
        if let Some(cell) = cell {
            return CursorState::At { path, cell, depth };
        }
        match path.successor() {
            Some(next) => {
                let cell = next.value().clone();
                CursorState::At {
                    path: next,
                    cell,
                    depth: 0,
                }
            }
            None => CursorState::Done,
        }
    }

    /// Advance and return the next element.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&E> {
        let state = core::mem::replace(&mut self.state, CursorState::Done);
        self.state = match state {
            CursorState::Unstarted => match self.set.tree.first() {
                Some(path) => Self::settle(path, 0),
                None => CursorState::Done,
            },
            CursorState::At { path, cell, depth } => match &cell.next {
                Some(next) => CursorState::At {
                    cell: next.clone(),
                    path,
                    depth: depth + 1,
                },
                None => match path.successor() {
                    Some(next) => Self::settle(next, 0),
                    None => CursorState::Done,
                },
            },
            CursorState::Detached { next } => match next {
                Some((path, depth)) => Self::settle(path, depth),
                None => CursorState::Done,
            },
            CursorState::Done => CursorState::Done,
        };
        self.current()
    }

    /// The element last returned by `next`, unless it was removed.
    pub fn current(&self) -> Option<&E> {
        match &self.state {
            CursorState::At { cell, .. } => Some(&cell.value),
            _ => None,
        }
    }

    /// Remove the element last returned by `next`.
    ///
    /// Errors with [`Error::IllegalState`] before the first `next`, after
    /// the end, or when that element was already removed.
    pub fn remove(&mut self) -> Result<E> {
        let (path, cell, depth) = match core::mem::replace(&mut self.state, CursorState::Done) {
            CursorState::At { path, cell, depth } => (path, cell, depth),
            other => {
                let reason = match &other {
                    CursorState::Unstarted => "remove called before next",
                    CursorState::Detached { .. } => "element already removed",
                    _ => "cursor is exhausted",
                };
                self.state = other;
                return Err(Error::IllegalState(reason));
            }
        };
        let head = path.value().clone();
        let structural = depth == 0 && cell.next.is_none();
        let (tree, removed) = self
            .set
            .unlink(path, depth)
            .expect("`At` holds a cell at a valid depth of its path");
        self.set.tree = tree;
        drop(cell);

        // Continue from the same depth at the re-found position: the cell
        // after the removed one moved up into its slot. A removed position
        // leaves a gap whose successor comes next.
        let cmp = self.set.comparator();
        let next = match self.set.tree.find_by(|h| cmp.compare(&head.value, &h.value)) {
            Lookup::Found(path) => Some((path, depth)),
            Lookup::Fresh(gap) => gap.successor().map(|path| (path, 0)),
        };
        if structural {
            trace!(
                "ordered cursor removed a tree position ({} elements left)",
                self.set.len
            );
        }
        self.state = CursorState::Detached { next };
        drop(head);
        Ok(take_value(removed))
    }
}

impl<E: Debug, C> Debug for OrderedSet<E, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<E: Clone, C: Comparator<E>> Extend<E> for OrderedSet<E, C> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<E: Clone, C: Comparator<E> + Default> FromIterator<E> for OrderedSet<E, C> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut set = Self::with_comparator(C::default());
        set.extend(iter);
        set
    }
}

#[cfg(test)]
impl<E, C> OrderedSet<E, C> {
    pub(crate) fn assert_invariants(&self) {
        self.tree.assert_balanced();
        let cells: usize = self
            .tree
            .iter()
            .map(|head| {
                let mut n = 1;
                let mut at = head;
                while let Some(next) = &at.next {
                    at = next;
                    n += 1;
                }
                n
            })
            .sum();
        assert_eq!(cells, self.len);
    }
}
