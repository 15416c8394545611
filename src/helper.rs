//! Hash/equality strategies for the chained table.
//!
//! A [`Helper`] decides how a key is hashed, how a stored key is compared
//! against a lookup probe, and what a cell actually keeps for its key. The
//! table logic never looks at keys itself, so the identity-keyed and
//! weak-keyed variants are the same table with a different helper.

use crate::{Shared, WeakShared};
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use hashbrown::hash_map::DefaultHashBuilder;

/// Pluggable hash + equality + cell-key construction policy.
///
/// One helper instance is shared by every cell of a table. `hash` is called
/// exactly once per inserted key; the table caches the result in the cell.
pub trait Helper {
    /// Key as handed to `insert`.
    type Key;
    /// Key as held by a cell.
    type Stored;
    /// Borrowed form used for lookups.
    type Probe: ?Sized;

    fn hash(&self, probe: &Self::Probe) -> u64;

    /// Whether the key held by a cell matches `probe`.
    fn equal(&self, stored: &Self::Stored, probe: &Self::Probe) -> bool;

    /// View an owned key as a probe (used to look it up before inserting).
    fn probe<'k>(&self, key: &'k Self::Key) -> &'k Self::Probe;

    /// Turn an owned key into what the new cell keeps.
    fn make(&self, key: Self::Key) -> Self::Stored;
}

/// Structural hashing and equality: `K: Hash + Eq` through a `BuildHasher`.
pub struct DefaultHelper<K, S = DefaultHashBuilder> {
    hasher: S,
    _key: PhantomData<fn(K) -> K>,
}

impl<K, S> DefaultHelper<K, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            _key: PhantomData,
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<K, S> DefaultHelper<K, S>
where
    S: BuildHasher,
{
    /// Hash any borrowed form of `K`; must agree with `Helper::hash` for
    /// forms related through `Borrow`.
    #[inline]
    pub fn hash_of<Q: ?Sized + Hash>(&self, q: &Q) -> u64 {
        self.hasher.hash_one(q)
    }
}

impl<K, S> Helper for DefaultHelper<K, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Key = K;
    type Stored = K;
    type Probe = K;

    #[inline]
    fn hash(&self, probe: &K) -> u64 {
        self.hasher.hash_one(probe)
    }

    #[inline]
    fn equal(&self, stored: &K, probe: &K) -> bool {
        stored == probe
    }

    #[inline]
    fn probe<'k>(&self, key: &'k K) -> &'k K {
        key
    }

    #[inline]
    fn make(&self, key: K) -> K {
        key
    }
}

/// Identity hashing: two keys match only if they are the same allocation.
///
/// Probes are plain `&T`; a probe matches when it points into the shared
/// allocation the cell holds.
pub struct IdentityHelper<T, S = DefaultHashBuilder> {
    hasher: S,
    _key: PhantomData<fn(T) -> T>,
}

impl<T, S> IdentityHelper<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            _key: PhantomData,
        }
    }
}

impl<T, S> Helper for IdentityHelper<T, S>
where
    S: BuildHasher,
{
    type Key = Shared<T>;
    type Stored = Shared<T>;
    type Probe = T;

    #[inline]
    fn hash(&self, probe: &T) -> u64 {
        // Addresses are aligned; run them through the hasher so the low bits
        // used for bucket selection are mixed.
        self.hasher.hash_one(probe as *const T as usize)
    }

    #[inline]
    fn equal(&self, stored: &Shared<T>, probe: &T) -> bool {
        core::ptr::eq(Shared::as_ptr(stored), probe)
    }

    #[inline]
    fn probe<'k>(&self, key: &'k Shared<T>) -> &'k T {
        key
    }

    #[inline]
    fn make(&self, key: Shared<T>) -> Shared<T> {
        key
    }
}

/// Weak keys: the cell holds a weak reference, so dropping the last strong
/// reference elsewhere reclaims the key. A reclaimed key never matches.
pub struct WeakHelper<T, S = DefaultHashBuilder> {
    hasher: S,
    _key: PhantomData<fn(T) -> T>,
}

impl<T, S> WeakHelper<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            _key: PhantomData,
        }
    }
}

impl<T, S> Helper for WeakHelper<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Key = Shared<T>;
    type Stored = WeakShared<T>;
    type Probe = T;

    #[inline]
    fn hash(&self, probe: &T) -> u64 {
        self.hasher.hash_one(probe)
    }

    #[inline]
    fn equal(&self, stored: &WeakShared<T>, probe: &T) -> bool {
        stored.upgrade().is_some_and(|k| *k == *probe)
    }

    #[inline]
    fn probe<'k>(&self, key: &'k Shared<T>) -> &'k T {
        key
    }

    #[inline]
    fn make(&self, key: Shared<T>) -> WeakShared<T> {
        Shared::downgrade(&key)
    }
}

// Manual impls: deriving would put bounds on the key parameter.
macro_rules! helper_impls {
    ($($name:ident),*) => {$(
        impl<K, S: Default> Default for $name<K, S> {
            fn default() -> Self {
                Self::with_hasher(S::default())
            }
        }

        impl<K, S: Clone> Clone for $name<K, S> {
            fn clone(&self) -> Self {
                Self::with_hasher(self.hasher.clone())
            }
        }

        impl<K, S> core::fmt::Debug for $name<K, S> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }
    )*};
}

helper_impls!(DefaultHelper, IdentityHelper, WeakHelper);
