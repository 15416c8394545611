//! Persistent ordered tree driven through path cursors.
//!
//! [`PersistentTree`] is an immutable AVL tree with path copying: a mutation
//! copies the nodes on the root-to-target path and shares everything else
//! with the previous root, which stays valid as a snapshot.
//!
//! Mutation goes through [`PersistentTree::find`], which yields a
//! [`Lookup`]:
//! - [`Path`] when an equal element exists: `value`, `replace_with`,
//!   `remove`, `successor`, `predecessor`.
//! - [`FreshPath`] when none does: `add`, `successor`, `predecessor`.
//!
//! Every mutating path operation consumes the path and returns the new
//! root. A path keeps its own root alive, so it never observes later
//! mutations; applying it after the container moved on silently forks from
//! the older root.
//!
//! # Complexity
//!
//! | Operation              | Complexity |
//! |------------------------|------------|
//! | `find`                 | O(log N)   |
//! | `add`/`remove`         | O(log N)   |
//! | `replace_with`         | O(log N)   |
//! | `successor`            | O(log N)   |
//! | `clone` (snapshot)     | O(1)       |

use crate::comparator::Comparator;
use crate::Shared;
use core::cmp::Ordering;

type Link<T> = Option<Shared<Node<T>>>;

struct Node<T> {
    value: T,
    left: Link<T>,
    right: Link<T>,
    height: u8,
}

#[inline]
fn height<T>(link: &Link<T>) -> u8 {
    link.as_ref().map_or(0, |n| n.height)
}

fn make<T>(value: T, left: Link<T>, right: Link<T>) -> Shared<Node<T>> {
    let height = 1 + height(&left).max(height(&right));
    Shared::new(Node {
        value,
        left,
        right,
        height,
    })
}

// Rebuild a node whose subtrees differ in height by at most two.
fn balance<T: Clone>(value: T, left: Link<T>, right: Link<T>) -> Shared<Node<T>> {
    let (hl, hr) = (height(&left), height(&right));
    if hl > hr + 1 {
        if let Some(l) = &left {
            if height(&l.left) >= height(&l.right) {
                return make(
                    l.value.clone(),
                    l.left.clone(),
                    Some(make(value, l.right.clone(), right)),
                );
            }
            if let Some(lr) = &l.right {
                return make(
                    lr.value.clone(),
                    Some(make(l.value.clone(), l.left.clone(), lr.left.clone())),
                    Some(make(value, lr.right.clone(), right)),
                );
            }
        }
    } else if hr > hl + 1 {
        if let Some(r) = &right {
            if height(&r.right) >= height(&r.left) {
                return make(
                    r.value.clone(),
                    Some(make(value, left, r.left.clone())),
                    r.right.clone(),
                );
            }
            if let Some(rl) = &r.left {
                return make(
                    rl.value.clone(),
                    Some(make(value, left, rl.left.clone())),
                    Some(make(r.value.clone(), rl.right.clone(), r.right.clone())),
                );
            }
        }
    }
    make(value, left, right)
}

fn remove_min<T: Clone>(node: &Shared<Node<T>>) -> (T, Link<T>) {
    match &node.left {
        None => (node.value.clone(), node.right.clone()),
        Some(l) => {
            let (min, rest) = remove_min(l);
            (min, Some(balance(node.value.clone(), rest, node.right.clone())))
        }
    }
}

// Subtree left after deleting `node` itself.
fn remove_node<T: Clone>(node: &Shared<Node<T>>) -> Link<T> {
    match (&node.left, &node.right) {
        (None, right) => right.clone(),
        (left, None) => left.clone(),
        (Some(_), Some(r)) => {
            let (min, rest) = remove_min(r);
            Some(balance(min, node.left.clone(), rest))
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// One ancestor on a path and the child the path continues into.
struct Step<T> {
    node: Shared<Node<T>>,
    side: Side,
}

impl<T> Clone for Step<T> {
    fn clone(&self) -> Self {
        Step {
            node: self.node.clone(),
            side: self.side,
        }
    }
}

// Copy the ancestors bottom-up around a replaced subtree.
fn rebuild<T: Clone>(ancestors: &[Step<T>], mut sub: Link<T>, rebalance: bool) -> Link<T> {
    for step in ancestors.iter().rev() {
        let n = &step.node;
        let (left, right) = match step.side {
            Side::Left => (sub, n.right.clone()),
            Side::Right => (n.left.clone(), sub),
        };
        sub = Some(if rebalance {
            balance(n.value.clone(), left, right)
        } else {
            make(n.value.clone(), left, right)
        });
    }
    sub
}

/// Immutable ordered tree. Cloning is O(1) and yields an independent
/// snapshot.
pub struct PersistentTree<T, C> {
    root: Link<T>,
    len: usize,
    comparator: Shared<C>,
}

impl<T, C> Clone for PersistentTree<T, C> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            len: self.len,
            comparator: self.comparator.clone(),
        }
    }
}

impl<T, C> PersistentTree<T, C> {
    pub fn new(comparator: C) -> Self {
        Self {
            root: None,
            len: 0,
            comparator: Shared::new(comparator),
        }
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Same comparator, no elements.
    pub fn emptied(&self) -> Self {
        Self {
            root: None,
            len: 0,
            comparator: self.comparator.clone(),
        }
    }

    /// Whether two trees share the same root node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => Shared::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        let mut it = Iter {
            stack: Vec::new(),
            remaining: self.len,
        };
        it.push_left(self.root.as_deref());
        it
    }

    /// Borrowing lookup; `cmp` is interpreted as in [`Self::find_by`].
    pub fn get_by<F>(&self, mut cmp: F) -> Option<&T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut at = self.root.as_deref();
        while let Some(n) = at {
            at = match cmp(&n.value) {
                Ordering::Equal => return Some(&n.value),
                Ordering::Less => n.left.as_deref(),
                Ordering::Greater => n.right.as_deref(),
            };
        }
        None
    }

    pub fn first_value(&self) -> Option<&T> {
        let mut n = self.root.as_deref()?;
        while let Some(l) = n.left.as_deref() {
            n = l;
        }
        Some(&n.value)
    }

    pub fn last_value(&self) -> Option<&T> {
        let mut n = self.root.as_deref()?;
        while let Some(r) = n.right.as_deref() {
            n = r;
        }
        Some(&n.value)
    }

    fn with_root(&self, root: Link<T>, len: usize) -> Self {
        Self {
            root,
            len,
            comparator: self.comparator.clone(),
        }
    }
}

impl<T: Clone, C> PersistentTree<T, C> {
    /// Locate the element `cmp` reports as `Equal`. `cmp(v)` gives the order
    /// of the sought element relative to `v` and must agree with the tree's
    /// comparator.
    pub fn find_by<F>(&self, mut cmp: F) -> Lookup<T, C>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut ancestors = Vec::new();
        let mut at = self.root.clone();
        while let Some(node) = at {
            let side = match cmp(&node.value) {
                Ordering::Equal => {
                    return Lookup::Found(Path {
                        tree: self.clone(),
                        ancestors,
                        node,
                    })
                }
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };
            at = match side {
                Side::Left => node.left.clone(),
                Side::Right => node.right.clone(),
            };
            ancestors.push(Step { node, side });
        }
        Lookup::Fresh(FreshPath {
            tree: self.clone(),
            ancestors,
        })
    }

    /// Path to the smallest element.
    pub fn first(&self) -> Option<Path<T, C>> {
        let root = self.root.clone()?;
        Some(descend(self.clone(), Vec::new(), root, Side::Left))
    }

    /// Path to the largest element.
    pub fn last(&self) -> Option<Path<T, C>> {
        let root = self.root.clone()?;
        Some(descend(self.clone(), Vec::new(), root, Side::Right))
    }
}

impl<T: Clone, C: Comparator<T>> PersistentTree<T, C> {
    /// Locate `probe` using the tree's comparator.
    pub fn find(&self, probe: &T) -> Lookup<T, C> {
        let comparator = self.comparator.clone();
        self.find_by(|v| comparator.compare(probe, v))
    }

    /// New root with `value` added, or replacing an equal element.
    pub fn insert(&self, value: T) -> Self {
        match self.find(&value) {
            Lookup::Found(path) => path.replace_with(value),
            Lookup::Fresh(path) => path.add(value),
        }
    }

    /// New root without the element equal to `probe` (a clone if absent).
    pub fn remove(&self, probe: &T) -> Self {
        match self.find(probe) {
            Lookup::Found(path) => path.remove(),
            Lookup::Fresh(_) => self.clone(),
        }
    }

    pub fn contains(&self, probe: &T) -> bool {
        !self.find(probe).is_fresh()
    }
}

// Walk from `node` down the `side` spine to the extreme element.
fn descend<T: Clone, C>(
    tree: PersistentTree<T, C>,
    mut ancestors: Vec<Step<T>>,
    mut node: Shared<Node<T>>,
    side: Side,
) -> Path<T, C> {
    loop {
        let child = match side {
            Side::Left => node.left.clone(),
            Side::Right => node.right.clone(),
        };
        match child {
            Some(c) => {
                ancestors.push(Step { node, side });
                node = c;
            }
            None => return Path {
                tree,
                ancestors,
                node,
            },
        }
    }
}

// Nearest ancestor the path left through `side`; that ancestor becomes the
// path's target.
fn ascend<T: Clone, C>(
    tree: &PersistentTree<T, C>,
    ancestors: &[Step<T>],
    side: Side,
) -> Option<Path<T, C>> {
    let at = ancestors.iter().rposition(|s| s.side == side)?;
    Some(Path {
        tree: tree.clone(),
        ancestors: ancestors[..at].to_vec(),
        node: ancestors[at].node.clone(),
    })
}

/// Result of [`PersistentTree::find`].
pub enum Lookup<T, C> {
    Found(Path<T, C>),
    Fresh(FreshPath<T, C>),
}

impl<T: Clone, C> Lookup<T, C> {
    /// No equal element exists.
    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }

    pub fn found(self) -> Option<Path<T, C>> {
        match self {
            Lookup::Found(p) => Some(p),
            Lookup::Fresh(_) => None,
        }
    }

    /// The smallest element strictly greater than the sought one.
    pub fn successor(&self) -> Option<Path<T, C>> {
        match self {
            Lookup::Found(p) => p.successor(),
            Lookup::Fresh(p) => p.successor(),
        }
    }

    /// The equal element, or else the smallest greater one.
    pub fn at_or_after(self) -> Option<Path<T, C>> {
        match self {
            Lookup::Found(p) => Some(p),
            Lookup::Fresh(p) => p.successor(),
        }
    }
}

/// Cursor at an existing element.
pub struct Path<T, C> {
    tree: PersistentTree<T, C>,
    ancestors: Vec<Step<T>>,
    node: Shared<Node<T>>,
}

impl<T: Clone, C> Path<T, C> {
    pub fn value(&self) -> &T {
        &self.node.value
    }

    /// The root this path was derived from.
    pub fn tree(&self) -> &PersistentTree<T, C> {
        &self.tree
    }

    /// New root with this position's element swapped for `value`. The tree
    /// shape is unchanged, so `value` must order equal to the old element.
    pub fn replace_with(self, value: T) -> PersistentTree<T, C> {
        let node = Shared::new(Node {
            value,
            left: self.node.left.clone(),
            right: self.node.right.clone(),
            height: self.node.height,
        });
        let root = rebuild(&self.ancestors, Some(node), false);
        self.tree.with_root(root, self.tree.len)
    }

    /// New root without this position.
    pub fn remove(self) -> PersistentTree<T, C> {
        let sub = remove_node(&self.node);
        let root = rebuild(&self.ancestors, sub, true);
        self.tree.with_root(root, self.tree.len - 1)
    }

    /// Next position in sort order, within the same root.
    pub fn successor(&self) -> Option<Path<T, C>> {
        match &self.node.right {
            Some(r) => {
                let mut ancestors = self.ancestors.clone();
                ancestors.push(Step {
                    node: self.node.clone(),
                    side: Side::Right,
                });
                Some(descend(self.tree.clone(), ancestors, r.clone(), Side::Left))
            }
            None => ascend(&self.tree, &self.ancestors, Side::Left),
        }
    }

    /// Previous position in sort order, within the same root.
    pub fn predecessor(&self) -> Option<Path<T, C>> {
        match &self.node.left {
            Some(l) => {
                let mut ancestors = self.ancestors.clone();
                ancestors.push(Step {
                    node: self.node.clone(),
                    side: Side::Left,
                });
                Some(descend(self.tree.clone(), ancestors, l.clone(), Side::Right))
            }
            None => ascend(&self.tree, &self.ancestors, Side::Right),
        }
    }
}

/// Cursor at the gap where a missing element would go.
pub struct FreshPath<T, C> {
    tree: PersistentTree<T, C>,
    ancestors: Vec<Step<T>>,
}

impl<T: Clone, C> FreshPath<T, C> {
    pub fn tree(&self) -> &PersistentTree<T, C> {
        &self.tree
    }

    /// New root with `value` placed in this gap. `value` must order equal
    /// to the element that was looked up.
    pub fn add(self, value: T) -> PersistentTree<T, C> {
        let leaf = make(value, None, None);
        let root = rebuild(&self.ancestors, Some(leaf), true);
        self.tree.with_root(root, self.tree.len + 1)
    }

    /// Smallest element greater than the gap.
    pub fn successor(&self) -> Option<Path<T, C>> {
        ascend(&self.tree, &self.ancestors, Side::Left)
    }

    /// Largest element smaller than the gap.
    pub fn predecessor(&self) -> Option<Path<T, C>> {
        ascend(&self.tree, &self.ancestors, Side::Right)
    }
}

/// In-order iterator over a tree snapshot.
pub struct Iter<'a, T> {
    stack: Vec<&'a Node<T>>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    fn push_left(&mut self, mut at: Option<&'a Node<T>>) {
        while let Some(n) = at {
            self.stack.push(n);
            at = n.left.as_deref();
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        self.push_left(n.right.as_deref());
        self.remaining -= 1;
        Some(&n.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T: core::fmt::Debug, C> core::fmt::Debug for PersistentTree<T, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
impl<T, C> PersistentTree<T, C> {
    /// Panics unless every node is AVL-balanced with a correct height and
    /// the element count matches.
    pub(crate) fn assert_balanced(&self) {
        fn check<T>(link: &Link<T>) -> (u8, usize) {
            match link {
                None => (0, 0),
                Some(n) => {
                    let (hl, cl) = check(&n.left);
                    let (hr, cr) = check(&n.right);
                    assert!(hl.abs_diff(hr) <= 1, "unbalanced node");
                    let h = 1 + hl.max(hr);
                    assert_eq!(h, n.height, "stale height");
                    (h, cl + cr + 1)
                }
            }
        }
        let (_, count) = check(&self.root);
        assert_eq!(count, self.len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::Natural;

    fn tree_of(values: &[i32]) -> PersistentTree<i32, Natural> {
        values
            .iter()
            .fold(PersistentTree::new(Natural), |t, v| t.insert(*v))
    }

    #[test]
    fn find_reports_fresh_and_found() {
        let t = tree_of(&[5, 2, 8]);
        assert!(t.find(&3).is_fresh());
        let p = t.find(&8).found().unwrap();
        assert_eq!(*p.value(), 8);
        assert!(t.contains(&2));
        assert_eq!(t.get_by(|v| 5.cmp(v)), Some(&5));
        assert_eq!(t.first_value(), Some(&2));
        assert_eq!(t.last_value(), Some(&8));
    }

    #[test]
    fn iteration_is_sorted_and_balanced() {
        let t = tree_of(&[5, 2, 1, 8, 3, 9, 0, 4, 7, 6]);
        t.assert_balanced();
        assert_eq!(t.iter().copied().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
        let big = (0..1000).fold(PersistentTree::new(Natural), |t, v| t.insert(v));
        big.assert_balanced();
    }

    #[test]
    fn successor_and_predecessor_walk_in_order() {
        let t = tree_of(&[40, 20, 60, 10, 30, 50, 70]);
        let mut p = t.first();
        let mut seen = Vec::new();
        while let Some(path) = p {
            seen.push(*path.value());
            p = path.successor();
        }
        assert_eq!(seen, vec![10, 20, 30, 40, 50, 60, 70]);

        let mut p = t.last();
        let mut back = Vec::new();
        while let Some(path) = p {
            back.push(*path.value());
            p = path.predecessor();
        }
        seen.reverse();
        assert_eq!(back, seen);
    }

    #[test]
    fn fresh_path_neighbours() {
        let t = tree_of(&[10, 20, 30]);
        let gap = t.find(&25);
        assert_eq!(gap.successor().map(|p| *p.value()), Some(30));
        match t.find(&25) {
            Lookup::Fresh(f) => assert_eq!(f.predecessor().map(|p| *p.value()), Some(20)),
            Lookup::Found(_) => panic!("25 is absent"),
        }
        assert!(t.find(&31).successor().is_none());
        assert_eq!(t.find(&5).at_or_after().map(|p| *p.value()), Some(10));
    }

    #[test]
    fn mutations_leave_snapshots_untouched() {
        let before = tree_of(&[1, 2, 3, 4, 5]);
        let after = before.remove(&3).insert(9);
        assert_eq!(before.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(after.iter().copied().collect::<Vec<_>>(), vec![1, 2, 4, 5, 9]);
        assert!(!before.ptr_eq(&after));
        after.assert_balanced();
    }

    #[test]
    fn remove_everything_in_any_order_stays_balanced() {
        let mut t = (0..200).fold(PersistentTree::new(Natural), |t, v| t.insert((v * 37) % 200));
        for v in (0..200).rev().step_by(2).chain((0..200).step_by(2)) {
            t = t.remove(&v);
            t.assert_balanced();
        }
        assert!(t.is_empty());
    }

    #[test]
    fn replace_keeps_shape_and_len() {
        let by_first = crate::comparator::FnComparator(|a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0));
        let t = PersistentTree::new(by_first).insert((1, 'a')).insert((2, 'b'));
        let t2 = t.insert((1, 'z'));
        assert_eq!(t2.len(), 2);
        assert_eq!(t2.iter().copied().collect::<Vec<_>>(), vec![(1, 'z'), (2, 'b')]);
        assert_eq!(t.iter().next(), Some(&(1, 'a')));
    }
}
