//! OrderedMap: an [`OrderedSet`] of key/value entries compared by key.
//!
//! Views (`keys`, `values`) and the cursor are projections of the set's own
//! iteration, so removing through a map cursor takes the same three paths
//! as the set's.

use crate::comparator::{Comparator, Natural};
use crate::error::Result;
use crate::ordered_set::{self, OrderedSet};
use core::cmp::Ordering;
use core::fmt::Debug;

/// A key/value pair as stored in the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<K, V> {
    pub key: K,
    pub value: V,
}

/// Orders entries by key alone.
pub(crate) struct ByKey<C>(C);

impl<K, V, C: Comparator<K>> Comparator<Entry<K, V>> for ByKey<C> {
    #[inline]
    fn compare(&self, a: &Entry<K, V>, b: &Entry<K, V>) -> Ordering {
        self.0.compare(&a.key, &b.key)
    }
}

pub struct OrderedMap<K, V, C = Natural> {
    set: OrderedSet<Entry<K, V>, ByKey<C>>,
}

impl<K: Ord, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::with_comparator(Natural)
    }
}

impl<K: Ord, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> Clone for OrderedMap<K, V, C> {
    /// O(1): the clone shares structure and diverges on mutation.
    fn clone(&self) -> Self {
        Self {
            set: self.set.clone(),
        }
    }
}

impl<K, V, C> OrderedMap<K, V, C> {
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            set: OrderedSet::with_comparator(ByKey(comparator)),
        }
    }

    pub fn comparator(&self) -> &C {
        &self.set.comparator().0
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.set.iter(),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Smallest key and its value.
    pub fn first_key_value(&self) -> Result<(&K, &V)> {
        self.set.first().map(|e| (&e.key, &e.value))
    }

    /// Largest key and its value (the oldest of a chained key).
    pub fn last_key_value(&self) -> Result<(&K, &V)> {
        self.set.last().map(|e| (&e.key, &e.value))
    }
}

impl<K, V, C: Comparator<K>> OrderedMap<K, V, C> {
    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let cmp = self.comparator();
        self.set
            .get_by(|e| cmp.compare(key, &e.key))
            .map(|e| (&e.key, &e.value))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get_key_value(key).is_some()
    }
}

impl<K: Clone, V: Clone, C: Comparator<K>> OrderedMap<K, V, C> {
    /// Insert or overwrite. Returns the value that was at the head of
    /// `key`'s position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.set
            .insert_or_replace(Entry { key, value })
            .map(|old| old.value)
    }

    /// Insert ahead of any values already under an equal key. `get` then
    /// sees this value; `remove` peels values off newest first.
    pub fn insert_chained(&mut self, key: K, value: V) {
        self.set.push(Entry { key, value });
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.set
            .remove_by(|by_key, e| by_key.0.compare(key, &e.key))
            .map(|e| (e.key, e.value))
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.set.pop_first().map(|e| (e.key, e.value))
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.set.pop_last().map(|e| (e.key, e.value))
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.set.retain(|e| keep(&e.key, &e.value));
    }

    pub fn cursor_mut(&mut self) -> CursorMut<'_, K, V, C> {
        CursorMut {
            inner: self.set.cursor_mut(),
        }
    }
}

pub struct Iter<'a, K, V> {
    inner: ordered_set::Iter<'a, Entry<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|e| (&e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, C> IntoIterator for &'a OrderedMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Key-order iterator over an [`OrderedMap`] that can remove the entry it
/// last returned.
pub struct CursorMut<'a, K, V, C> {
    inner: ordered_set::CursorMut<'a, Entry<K, V>, ByKey<C>>,
}

impl<K: Clone, V: Clone, C: Comparator<K>> CursorMut<'_, K, V, C> {
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(&K, &V)> {
        self.inner.next().map(|e| (&e.key, &e.value))
    }

    pub fn current(&self) -> Option<(&K, &V)> {
        self.inner.current().map(|e| (&e.key, &e.value))
    }

    /// See [`ordered_set::CursorMut::remove`].
    pub fn remove(&mut self) -> Result<(K, V)> {
        self.inner.remove().map(|e| (e.key, e.value))
    }
}

impl<K: Debug, V: Debug, C> Debug for OrderedMap<K, V, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone, V: Clone, C: Comparator<K>> Extend<(K, V)> for OrderedMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Clone, V: Clone, C: Comparator<K> + Default> FromIterator<(K, V)> for OrderedMap<K, V, C> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_comparator(C::default());
        map.extend(iter);
        map
    }
}
