//! Synchronized: one lock around any container.
//!
//! Every forwarding method takes the lock for exactly one call and returns
//! owned results. To read views (iterators, references) or run several
//! calls atomically, hold [`Synchronized::lock`] or use
//! [`Synchronized::with`]; both go through the same mutex the forwarding
//! methods use.

use crate::chained_table::ChainedTable;
use crate::comparator::Comparator;
use crate::hash_map::HashMap;
use crate::hash_set::HashSet;
use crate::helper::Helper;
use crate::identity_map::IdentityHashMap;
use crate::ordered_map::OrderedMap;
use crate::ordered_set::OrderedSet;
use crate::weak_map::WeakHashMap;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Operations every container offers regardless of its shape.
pub trait Container {
    fn len(&self) -> usize;
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! container_impl {
    ([$($gen:tt)*] $ty:ty $(where $($bound:tt)*)?) => {
        impl<$($gen)*> Container for $ty $(where $($bound)*)? {
            fn len(&self) -> usize {
                <$ty>::len(self)
            }

            fn clear(&mut self) {
                <$ty>::clear(self)
            }
        }
    };
}

container_impl!([H: Helper, V] ChainedTable<H, V>);
container_impl!([K, V, S] HashMap<K, V, S> where K: Hash + Eq, S: BuildHasher);
container_impl!([T, S] HashSet<T, S> where T: Hash + Eq, S: BuildHasher);
container_impl!([T, V, S] IdentityHashMap<T, V, S> where S: BuildHasher);
container_impl!([T, V, S] WeakHashMap<T, V, S> where T: Hash + Eq, S: BuildHasher);
container_impl!([E, C] OrderedSet<E, C>);
container_impl!([K, V, C] OrderedMap<K, V, C>);

/// A container behind a shared `parking_lot` mutex. Clones share the lock.
pub struct Synchronized<C> {
    inner: Arc<Mutex<C>>,
}

impl<C> Clone for Synchronized<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Default> Default for Synchronized<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C> Synchronized<C> {
    pub fn new(container: C) -> Self {
        Self {
            inner: Arc::new(Mutex::new(container)),
        }
    }

    /// Hold the lock for as long as the guard lives.
    pub fn lock(&self) -> MutexGuard<'_, C> {
        self.inner.lock()
    }

    /// Run `f` under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// The container, if this is the last handle; otherwise the handle back.
    pub fn into_inner(self) -> Result<C, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner()),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl<C: Container> Synchronized<C> {
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl<K, V, S> Synchronized<HashMap<K, V, S>>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().insert(key, value)
    }

    /// Clone of the value under `q`.
    pub fn get<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.inner.lock().get(q).cloned()
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().contains_key(q)
    }

    pub fn remove<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().remove(q)
    }
}

impl<T, S> Synchronized<HashSet<T, S>>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    pub fn insert(&self, value: T) -> bool {
        self.inner.lock().insert(value)
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().contains(q)
    }

    pub fn remove<Q>(&self, q: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().remove(q)
    }
}

impl<E, C> Synchronized<OrderedSet<E, C>>
where
    E: Clone,
    C: Comparator<E>,
{
    pub fn insert(&self, value: E) -> bool {
        self.inner.lock().insert(value)
    }

    pub fn contains(&self, value: &E) -> bool {
        self.inner.lock().contains(value)
    }

    pub fn remove(&self, value: &E) -> Option<E> {
        self.inner.lock().remove(value)
    }
}

impl<K, V, C> Synchronized<OrderedMap<K, V, C>>
where
    K: Clone,
    V: Clone,
    C: Comparator<K>,
{
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().insert(key, value)
    }

    /// Clone of the value under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }
}
