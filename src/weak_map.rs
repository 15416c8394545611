//! WeakHashMap: keys are held weakly and evicted once reclaimed.
//!
//! The table keeps a `WeakShared<T>` per cell. A key is reclaimed when its
//! last strong reference elsewhere is dropped. A reclaimed key never matches
//! a probe, so `get` and `contains_key` stay O(1) expected and do not sweep.
//! Dead cells are evicted by `len`, `keys`, `for_each`, `retain` and
//! [`WeakHashMap::reclaim`], each an O(n) pass, and by `insert` just before
//! the table would grow.
//!
//! Reads take `&self`, so the table sits in a `RefCell` and `get` hands out a
//! `cell::Ref` into it. Read paths only ever take shared borrows; while such a
//! `Ref` is alive the sweep is skipped and `len` counts live keys instead.

use crate::chained_table::ChainedTable;
use crate::helper::WeakHelper;
use crate::Shared;
use core::cell::{Ref, RefCell};
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use log::debug;

pub struct WeakHashMap<T, V, S = DefaultHashBuilder>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    table: RefCell<ChainedTable<WeakHelper<T, S>, V>>,
}

impl<T, V> WeakHashMap<T, V>
where
    T: Hash + Eq,
{
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<T, V> Default for WeakHashMap<T, V>
where
    T: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V, S> WeakHashMap<T, V, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: RefCell::new(ChainedTable::with_helper(WeakHelper::with_hasher(hasher))),
        }
    }

    /// Evict every entry whose key has been reclaimed. Returns how many were
    /// evicted; 0 while a value returned by `get` is still borrowed.
    pub fn reclaim(&self) -> usize {
        match self.table.try_borrow_mut() {
            Ok(mut table) => Self::drain_reclaimed(&mut table),
            Err(_) => 0,
        }
    }

    fn drain_reclaimed(table: &mut ChainedTable<WeakHelper<T, S>, V>) -> usize {
        let before = table.len();
        table.retain(|key, _| key.strong_count() > 0);
        let reclaimed = before - table.len();
        if reclaimed > 0 {
            debug!("weak map reclaimed {reclaimed} keys ({} live)", table.len());
        }
        reclaimed
    }

    // Write paths own `&mut self` and skip the runtime borrow.
    fn table_mut(&mut self) -> &mut ChainedTable<WeakHelper<T, S>, V> {
        self.table.get_mut()
    }

    /// Number of live keys. O(n).
    pub fn len(&self) -> usize {
        self.reclaim();
        let table = self.table.borrow();
        table.iter().filter(|(_, weak, _)| weak.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert with a weak hold on `key`. The entry lives as long as some
    /// other strong reference to `key` does.
    pub fn insert(&mut self, key: Shared<T>, value: V) -> Option<V> {
        let table = self.table_mut();
        // Dead cells would otherwise count toward the next resize.
        if table.len() + 1 >= 2 * table.capacity() {
            Self::drain_reclaimed(table);
        }
        table.insert(key, value)
    }

    pub fn get(&self, key: &T) -> Option<Ref<'_, V>> {
        Ref::filter_map(self.table.borrow(), |t| t.get(key)).ok()
    }

    pub fn get_mut(&mut self, key: &T) -> Option<&mut V> {
        self.table_mut().get_mut(key)
    }

    pub fn contains_key(&self, key: &T) -> bool {
        self.table.borrow().contains(key)
    }

    pub fn remove(&mut self, key: &T) -> Option<V> {
        self.table_mut().remove(key).map(|(_, v)| v)
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T, &mut V) -> bool,
    {
        self.table.get_mut().retain(|weak, v| match weak.upgrade() {
            Some(key) => keep(&*key, v),
            None => false,
        });
    }

    pub fn clear(&mut self) {
        self.table.get_mut().clear();
    }

    /// Strong snapshot of the live keys.
    pub fn keys(&self) -> Vec<Shared<T>> {
        self.reclaim();
        self.table
            .borrow()
            .iter()
            .filter_map(|(_, weak, _)| weak.upgrade())
            .collect()
    }

    /// Visit every live entry. `f` may call back into the map's `&self`
    /// methods.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&T, &V),
    {
        self.reclaim();
        for (_, weak, v) in self.table.borrow().iter() {
            if let Some(key) = weak.upgrade() {
                f(&*key, v);
            }
        }
    }
}

impl<T, V, S> core::fmt::Debug for WeakHashMap<T, V, S>
where
    T: Hash + Eq + core::fmt::Debug,
    V: core::fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let table = self.table.borrow();
        f.debug_map()
            .entries(
                table
                    .iter()
                    .filter_map(|(_, weak, v)| weak.upgrade().map(|k| (k, v))),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_key_is_evicted_on_next_call() {
        let mut m: WeakHashMap<String, u32> = WeakHashMap::new();
        let keep = Shared::new("keep".to_string());
        let lose = Shared::new("lose".to_string());
        m.insert(keep.clone(), 1);
        m.insert(lose.clone(), 2);
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(&"lose".to_string()).map(|v| *v), Some(2));

        drop(lose);
        assert!(!m.contains_key(&"lose".to_string()));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(&"keep".to_string()).map(|v| *v), Some(1));
    }

    #[test]
    fn reclaim_reports_count() {
        let mut m: WeakHashMap<u32, ()> = WeakHashMap::new();
        let keys: Vec<_> = (0..40).map(Shared::new).collect();
        for k in &keys {
            m.insert(k.clone(), ());
        }
        drop(keys);
        assert_eq!(m.reclaim(), 40);
        assert!(m.is_empty());
    }

    #[test]
    fn overwrite_keeps_weak_cell() {
        let mut m: WeakHashMap<u32, &str> = WeakHashMap::new();
        let k = Shared::new(7);
        assert_eq!(m.insert(k.clone(), "a"), None);
        // A different allocation with an equal key overwrites in place; the
        // original key still governs the entry's lifetime.
        let other = Shared::new(7);
        assert_eq!(m.insert(other.clone(), "b"), Some("a"));
        drop(other);
        assert_eq!(m.len(), 1);
        drop(k);
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn dead_key_misses_without_a_sweep() {
        let mut m: WeakHashMap<u32, u32> = WeakHashMap::new();
        let k = Shared::new(5);
        m.insert(k.clone(), 50);
        drop(k);
        // The cell is still in the table; only a sweep removes it.
        assert_eq!(m.table.borrow().len(), 1);
        assert!(m.get(&5).is_none());
        assert!(!m.contains_key(&5));
        assert!(m.get_mut(&5).is_none());
        assert_eq!(m.table.borrow().len(), 1);
        assert_eq!(m.len(), 0);
        assert_eq!(m.table.borrow().len(), 0);
    }

    #[test]
    fn insert_sweeps_before_growing() {
        let mut m: WeakHashMap<u32, ()> = WeakHashMap::new();
        let keys: Vec<_> = (0..31).map(Shared::new).collect();
        for k in &keys {
            m.insert(k.clone(), ());
        }
        assert_eq!(m.table.borrow().capacity(), 16);
        drop(keys);
        let fresh = Shared::new(100);
        m.insert(fresh.clone(), ());
        assert_eq!(m.table.borrow().len(), 1);
        assert_eq!(m.table.borrow().capacity(), 16);
    }
}
