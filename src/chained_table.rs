//! ChainedTable: bucket array of singly-linked collision chains.
//!
//! Cells live in a generational arena and are addressed by [`CellHandle`];
//! a bucket holds the handle of its chain head and every cell holds the
//! handle of the next cell in its chain. Resizing relinks handles into a new
//! bucket array and never moves or rebuilds a cell, so a handle (the cell's
//! identity) survives any number of resizes.
//!
//! Sizing: the bucket array is empty or a power of two no smaller than
//! [`MINIMUM_CAPACITY`]. It doubles once `len >= 2 * capacity` and halves
//! once `len <= capacity / 3`, as long as the halved array is still at least
//! the minimum.

use crate::error::{Error, Result};
use crate::helper::{DefaultHelper, Helper};
use crate::reentrancy::DebugReentrancy;
use log::trace;
use slotmap::{DefaultKey, SlotMap};

/// Smallest non-empty bucket array.
pub const MINIMUM_CAPACITY: usize = 16;

/// Stable identity of a cell. Resizes never invalidate it; removing the cell
/// does, and a stale handle never resolves to a later cell.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CellHandle(DefaultKey);

impl CellHandle {
    pub fn key<'a, H: Helper, V>(&self, table: &'a ChainedTable<H, V>) -> Option<&'a H::Stored> {
        table.key(*self)
    }

    pub fn value<'a, H: Helper, V>(&self, table: &'a ChainedTable<H, V>) -> Option<&'a V> {
        table.value(*self)
    }

    pub fn value_mut<'a, H: Helper, V>(
        &self,
        table: &'a mut ChainedTable<H, V>,
    ) -> Option<&'a mut V> {
        table.value_mut(*self)
    }
}

#[derive(Debug)]
struct Cell<S, V> {
    key: S,
    value: V,
    next: Option<DefaultKey>,
    // Computed once by the helper at insertion.
    hash: u64,
}

#[inline]
fn bucket_index(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    (hash as usize) & (capacity - 1)
}

pub struct ChainedTable<H: Helper, V> {
    helper: H,
    buckets: Box<[Option<DefaultKey>]>,
    cells: SlotMap<DefaultKey, Cell<H::Stored, V>>,
    reentrancy: DebugReentrancy,
}

/// The default table: structural keys hashed through a `BuildHasher`.
pub type DefaultTable<K, V, S = hashbrown::hash_map::DefaultHashBuilder> =
    ChainedTable<DefaultHelper<K, S>, V>;

impl<H: Helper + Default, V> ChainedTable<H, V> {
    pub fn new() -> Self {
        Self::with_helper(H::default())
    }
}

impl<H: Helper + Default, V> Default for ChainedTable<H, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Helper, V> ChainedTable<H, V> {
    pub fn with_helper(helper: H) -> Self {
        Self {
            helper,
            buckets: Box::default(),
            cells: SlotMap::new(),
            reentrancy: DebugReentrancy::new(),
        }
    }

    /// Pre-size the bucket array for `capacity` cells without triggering a
    /// grow; rounded up to a power of two no smaller than the minimum.
    pub fn with_capacity_and_helper(capacity: usize, helper: H) -> Self {
        let mut table = Self::with_helper(helper);
        if capacity > 0 {
            let buckets = capacity.next_power_of_two().max(MINIMUM_CAPACITY);
            table.buckets = vec![None; buckets].into_boxed_slice();
            table.cells = SlotMap::with_capacity(capacity);
        }
        table
    }

    pub fn helper(&self) -> &H {
        &self.helper
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of buckets (0 until the first insert).
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn chain_find<F>(&self, hash: u64, mut eq: F) -> Option<DefaultKey>
    where
        F: FnMut(&H::Stored) -> bool,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let mut at = self.buckets[bucket_index(hash, self.buckets.len())];
        while let Some(k) = at {
            let cell = &self.cells[k];
            if cell.hash == hash && eq(&cell.key) {
                return Some(k);
            }
            at = cell.next;
        }
        None
    }

    pub fn find(&self, probe: &H::Probe) -> Option<CellHandle> {
        let _g = self.reentrancy.enter("find");
        let hash = self.helper.hash(probe);
        self.chain_find(hash, |stored| self.helper.equal(stored, probe))
            .map(CellHandle)
    }

    /// Lookup with a caller-computed hash and matcher. `hash` must be the
    /// value the helper would compute for the keys `eq` accepts.
    pub fn find_with<F>(&self, hash: u64, eq: F) -> Option<CellHandle>
    where
        F: FnMut(&H::Stored) -> bool,
    {
        let _g = self.reentrancy.enter("find_with");
        self.chain_find(hash, eq).map(CellHandle)
    }

    pub fn contains(&self, probe: &H::Probe) -> bool {
        self.find(probe).is_some()
    }

    pub fn get(&self, probe: &H::Probe) -> Option<&V> {
        let h = self.find(probe)?;
        self.value(h)
    }

    pub fn get_mut(&mut self, probe: &H::Probe) -> Option<&mut V> {
        let h = self.find(probe)?;
        self.value_mut(h)
    }

    pub fn key(&self, h: CellHandle) -> Option<&H::Stored> {
        self.cells.get(h.0).map(|c| &c.key)
    }

    pub fn value(&self, h: CellHandle) -> Option<&V> {
        self.cells.get(h.0).map(|c| &c.value)
    }

    pub fn value_mut(&mut self, h: CellHandle) -> Option<&mut V> {
        self.cells.get_mut(h.0).map(|c| &mut c.value)
    }

    pub fn entry(&self, h: CellHandle) -> Option<(&H::Stored, &V)> {
        self.cells.get(h.0).map(|c| (&c.key, &c.value))
    }

    /// Insert or overwrite; returns the previous value if the key was present.
    pub fn insert(&mut self, key: H::Key, value: V) -> Option<V> {
        self.insert_full(key, value).1
    }

    /// Like [`insert`](Self::insert), also returning the cell's handle. An
    /// overwrite keeps the existing cell, so the handle is unchanged.
    pub fn insert_full(&mut self, key: H::Key, value: V) -> (CellHandle, Option<V>) {
        let (hash, found) = {
            let _g = self.reentrancy.enter("insert");
            let probe = self.helper.probe(&key);
            let hash = self.helper.hash(probe);
            let found = self.chain_find(hash, |stored| self.helper.equal(stored, probe));
            (hash, found)
        };

        if let Some(k) = found {
            let old = core::mem::replace(&mut self.cells[k].value, value);
            return (CellHandle(k), Some(old));
        }

        let stored = self.helper.make(key);
        let k = self.cells.insert(Cell {
            key: stored,
            value,
            next: None,
            hash,
        });
        self.grow();
        self.link(k);
        (CellHandle(k), None)
    }

    // Prepend an unlinked cell to its chain.
    fn link(&mut self, k: DefaultKey) {
        let idx = bucket_index(self.cells[k].hash, self.buckets.len());
        self.cells[k].next = self.buckets[idx].replace(k);
    }

    fn grow(&mut self) {
        let capacity = self.buckets.len();
        if capacity == 0 || self.cells.len() >= capacity * 2 {
            self.resize((capacity * 2).max(MINIMUM_CAPACITY));
        }
    }

    fn should_shrink(&self) -> bool {
        let capacity = self.buckets.len();
        capacity / 2 >= MINIMUM_CAPACITY && self.cells.len() <= capacity / 3
    }

    fn shrink(&mut self) {
        if self.should_shrink() {
            self.resize(self.buckets.len() / 2);
        }
    }

    // Relink every linked cell by its cached hash. Cells that are in the arena
    // but not linked yet (a pending insert) are left for the caller.
    fn resize(&mut self, capacity: usize) {
        assert!(capacity.is_power_of_two(), "bucket count must be a power of two");
        trace!(
            "chained table resize: {} -> {} buckets ({} cells)",
            self.buckets.len(),
            capacity,
            self.cells.len()
        );
        let old = core::mem::replace(&mut self.buckets, vec![None; capacity].into_boxed_slice());
        for head in old.iter() {
            let mut at = *head;
            while let Some(k) = at {
                let cell = &mut self.cells[k];
                at = cell.next;
                let idx = bucket_index(cell.hash, capacity);
                cell.next = self.buckets[idx].replace(k);
            }
        }
    }

    fn finish_remove(&mut self, k: DefaultKey) -> Option<(H::Stored, V)> {
        let cell = self.cells.remove(k)?;
        self.shrink();
        Some((cell.key, cell.value))
    }

    /// Remove the cell matching `probe`, returning its key and value.
    pub fn remove(&mut self, probe: &H::Probe) -> Option<(H::Stored, V)> {
        let k = {
            let _g = self.reentrancy.enter("remove");
            let hash = self.helper.hash(probe);
            let helper = &self.helper;
            let buckets = &mut self.buckets;
            let cells = &mut self.cells;
            unlink_in(buckets, cells, hash, |_, stored| helper.equal(stored, probe))
        }?;
        self.finish_remove(k)
    }

    /// Removal with a caller-computed hash and matcher; see [`find_with`](Self::find_with).
    pub fn remove_with<F>(&mut self, hash: u64, mut eq: F) -> Option<(H::Stored, V)>
    where
        F: FnMut(&H::Stored) -> bool,
    {
        let k = {
            let _g = self.reentrancy.enter("remove_with");
            unlink_in(&mut self.buckets, &mut self.cells, hash, |_, stored| eq(stored))
        }?;
        self.finish_remove(k)
    }

    /// Remove the cell behind `h`. Calls no user code.
    pub fn remove_cell(&mut self, h: CellHandle) -> Option<(H::Stored, V)> {
        let hash = self.cells.get(h.0)?.hash;
        let k = unlink_in(&mut self.buckets, &mut self.cells, hash, |k, _| k == h.0)?;
        self.finish_remove(k)
    }

    /// Drop every cell and release the bucket array.
    pub fn clear(&mut self) {
        trace!("chained table clear: {} cells released", self.cells.len());
        self.cells.clear();
        self.buckets = Box::default();
    }

    /// Keep only the cells for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&H::Stored, &mut V) -> bool,
    {
        let mut cursor = self.cursor();
        while let Some((k, v)) = cursor.next() {
            if !keep(k, v) {
                let removed = cursor.remove();
                debug_assert!(removed.is_ok(), "cursor must hold the cell `next` returned");
            }
        }
    }

    /// Bucket-order iteration.
    pub fn iter(&self) -> Iter<'_, H, V> {
        Iter {
            table: self,
            next_bucket: 0,
            next: None,
            remaining: self.cells.len(),
        }
    }

    /// Mutable iteration in arena order (still unspecified relative to keys).
    pub fn iter_mut(&mut self) -> IterMut<'_, H::Stored, V> {
        IterMut {
            it: self.cells.iter_mut(),
        }
    }

    /// Iterator that can remove the element it just returned.
    pub fn cursor(&mut self) -> Cursor<'_, H, V> {
        Cursor {
            table: self,
            next_bucket: 0,
            prev: None,
            current: None,
            next: None,
            removed: 0,
        }
    }

    /// Panics if the sizing or chain invariants do not hold.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let capacity = self.buckets.len();
        if capacity != 0 {
            assert!(capacity.is_power_of_two(), "capacity {capacity} not a power of two");
            assert!(capacity >= MINIMUM_CAPACITY, "capacity {capacity} below minimum");
        }
        assert!(self.cells.len() <= 2 * capacity, "load above 2x capacity");
        let mut linked = 0;
        for (idx, head) in self.buckets.iter().enumerate() {
            let mut at = *head;
            while let Some(k) = at {
                let cell = &self.cells[k];
                assert_eq!(bucket_index(cell.hash, capacity), idx, "cell in wrong bucket");
                linked += 1;
                at = cell.next;
            }
        }
        assert_eq!(linked, self.cells.len(), "every cell is linked exactly once");
    }
}

// Free function so the helper can be borrowed while buckets and cells are
// mutated.
fn unlink_in<S, V, F>(
    buckets: &mut [Option<DefaultKey>],
    cells: &mut SlotMap<DefaultKey, Cell<S, V>>,
    hash: u64,
    mut eq: F,
) -> Option<DefaultKey>
where
    F: FnMut(DefaultKey, &S) -> bool,
{
    if buckets.is_empty() {
        return None;
    }
    let idx = bucket_index(hash, buckets.len());
    let mut prev: Option<DefaultKey> = None;
    let mut at = buckets[idx];
    while let Some(k) = at {
        let cell = &cells[k];
        let next = cell.next;
        if cell.hash == hash && eq(k, &cell.key) {
            match prev {
                None => buckets[idx] = next,
                Some(p) => cells[p].next = next,
            }
            return Some(k);
        }
        prev = at;
        at = next;
    }
    None
}

impl<H, V> core::fmt::Debug for ChainedTable<H, V>
where
    H: Helper,
    H::Stored: core::fmt::Debug,
    V: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, k, v)| (k, v)))
            .finish()
    }
}

/// Bucket-order iterator over `(handle, key, value)`.
pub struct Iter<'a, H: Helper, V> {
    table: &'a ChainedTable<H, V>,
    next_bucket: usize,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, H: Helper, V> Iterator for Iter<'a, H, V> {
    type Item = (CellHandle, &'a H::Stored, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let buckets = &self.table.buckets;
        while self.next.is_none() {
            if self.next_bucket >= buckets.len() {
                return None;
            }
            self.next = buckets[self.next_bucket];
            self.next_bucket += 1;
        }
        let k = self.next?;
        let cell = &self.table.cells[k];
        self.next = cell.next;
        self.remaining -= 1;
        Some((CellHandle(k), &cell.key, &cell.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<H: Helper, V> ExactSizeIterator for Iter<'_, H, V> {}

/// Iterator over mutable values.
pub struct IterMut<'a, S, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Cell<S, V>>,
}

impl<'a, S, V> Iterator for IterMut<'a, S, V> {
    type Item = (CellHandle, &'a S, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, c)| (CellHandle(k), &c.key, &mut c.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<H: Helper, V> IntoIterator for ChainedTable<H, V> {
    type Item = (H::Stored, V);
    type IntoIter = IntoIter<H::Stored, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            it: self.cells.into_iter(),
        }
    }
}

/// Owning iterator over `(key, value)`.
pub struct IntoIter<S, V> {
    it: slotmap::basic::IntoIter<DefaultKey, Cell<S, V>>,
}

impl<S, V> Iterator for IntoIter<S, V> {
    type Item = (S, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, c)| (c.key, c.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

/// Bucket-order cursor that can unlink the cell it last returned.
///
/// Tracks the previous, current and next cell of the chain being walked and
/// the next bucket to scan, so removal is a single relink. The table cannot
/// be resized while the cursor lives (it holds the only `&mut`); shrinking
/// owed to removals happens when the cursor is dropped.
pub struct Cursor<'a, H: Helper, V> {
    table: &'a mut ChainedTable<H, V>,
    next_bucket: usize,
    // Cell before `current` in its chain; `None` when `current` is a head.
    prev: Option<DefaultKey>,
    current: Option<DefaultKey>,
    next: Option<DefaultKey>,
    removed: usize,
}

impl<H: Helper, V> Cursor<'_, H, V> {
    fn advance(&mut self) -> Option<DefaultKey> {
        let k = match self.next {
            Some(n) => {
                // After a removal `prev` already precedes `n`.
                if self.current.is_some() {
                    self.prev = self.current;
                }
                n
            }
            None => {
                let buckets = &self.table.buckets;
                loop {
                    if self.next_bucket >= buckets.len() {
                        self.prev = None;
                        self.current = None;
                        return None;
                    }
                    let head = buckets[self.next_bucket];
                    self.next_bucket += 1;
                    if let Some(h) = head {
                        self.prev = None;
                        break h;
                    }
                }
            }
        };
        self.current = Some(k);
        self.next = self.table.cells[k].next;
        Some(k)
    }

    /// Step to the next cell and borrow its key and value.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(&H::Stored, &mut V)> {
        let k = self.advance()?;
        let cell = &mut self.table.cells[k];
        Some((&cell.key, &mut cell.value))
    }

    /// Step to the next cell and return its handle.
    pub fn next_handle(&mut self) -> Option<CellHandle> {
        self.advance().map(CellHandle)
    }

    /// The cell last returned, unless it was removed.
    pub fn current(&self) -> Option<(&H::Stored, &V)> {
        let c = &self.table.cells[self.current?];
        Some((&c.key, &c.value))
    }

    /// Unlink and return the cell last returned by `next`.
    pub fn remove(&mut self) -> Result<(H::Stored, V)> {
        let k = self
            .current
            .take()
            .ok_or(Error::IllegalState("remove without a current cell"))?;
        match self.prev {
            None => {
                let idx = bucket_index(self.table.cells[k].hash, self.table.buckets.len());
                self.table.buckets[idx] = self.next;
            }
            Some(p) => self.table.cells[p].next = self.next,
        }
        let cell = self
            .table
            .cells
            .remove(k)
            .ok_or(Error::IllegalState("cursor cell vanished"))?;
        self.removed += 1;
        Ok((cell.key, cell.value))
    }
}

impl<H: Helper, V> Drop for Cursor<'_, H, V> {
    fn drop(&mut self) {
        if self.removed > 0 {
            trace!("cursor removed {} cells", self.removed);
            // Catch up on every halving the removals earned.
            while self.table.should_shrink() {
                self.table.resize(self.table.buckets.len() / 2);
            }
        }
    }
}
