//! IdentityHashMap: keys match only when they are the same allocation.

use crate::chained_table::{CellHandle, ChainedTable};
use crate::helper::IdentityHelper;
use crate::Shared;
use core::hash::BuildHasher;
use hashbrown::hash_map::DefaultHashBuilder;

/// Map keyed by pointer identity of shared keys.
///
/// Two structurally equal keys in different allocations are different
/// entries. The map keeps each key alive through its own strong reference.
pub struct IdentityHashMap<T, V, S = DefaultHashBuilder>
where
    S: BuildHasher,
{
    table: ChainedTable<IdentityHelper<T, S>, V>,
}

impl<T, V> IdentityHashMap<T, V> {
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<T, V> Default for IdentityHashMap<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V, S> IdentityHashMap<T, V, S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: ChainedTable::with_helper(IdentityHelper::with_hasher(hasher)),
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn insert(&mut self, key: Shared<T>, value: V) -> Option<V> {
        self.table.insert(key, value)
    }

    /// Look up by address; `key` may be the shared key itself or any
    /// reference into its allocation.
    pub fn get(&self, key: &T) -> Option<&V> {
        self.table.get(key)
    }

    pub fn get_mut(&mut self, key: &T) -> Option<&mut V> {
        self.table.get_mut(key)
    }

    pub fn contains_key(&self, key: &T) -> bool {
        self.table.contains(key)
    }

    pub fn cell(&self, key: &T) -> Option<CellHandle> {
        self.table.find(key)
    }

    pub fn remove(&mut self, key: &T) -> Option<V> {
        self.table.remove(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &T) -> Option<(Shared<T>, V)> {
        self.table.remove(key)
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Shared<T>, &V)> {
        self.table.iter().map(|(_, k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Shared<T>> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

impl<T, V, S> core::fmt::Debug for IdentityHashMap<T, V, S>
where
    T: core::fmt::Debug,
    V: core::fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k, v)| (Shared::as_ptr(k), (k, v))))
            .finish()
    }
}
