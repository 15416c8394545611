//! Debug-only reentrancy guard.
//!
//! The chained table calls back into user code while a chain is being
//! walked or relinked (`Hash`, `Eq`, the strategy's equality). A callback
//! that reaches back into the same table would observe a half-linked
//! bucket, so in debug builds such nesting panics, naming the entry point
//! that was already active. In release builds the guard is a no-op.

#[cfg(debug_assertions)]
use core::cell::Cell;
#[cfg(not(debug_assertions))]
use core::marker::PhantomData;

/// Per-table tracker. Entry points guard themselves with
/// `let _g = self.reentrancy.enter("find");`.
///
/// Holding a `Cell` keeps the owner `!Sync`; it stays `Send` so a table can
/// be moved behind a lock.
#[derive(Debug, Default)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
        }
    }

    /// Mark `site` as running. Panics in debug builds if another entry point
    /// of the same owner has not returned yet.
    #[inline]
    pub fn enter(&self, site: &'static str) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.get() {
                panic!("reentrancy detected: `{site}` called while `{outer}` is running");
            }
            self.active.set(Some(site));
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = site;
            return ReentrancyGuard { _owner: PhantomData };
        }
    }

    /// The entry point currently running, if any (always `None` in release).
    pub fn active(&self) -> Option<&'static str> {
        #[cfg(debug_assertions)]
        {
            return self.active.get();
        }
        #[cfg(not(debug_assertions))]
        {
            return None;
        }
    }
}

/// RAII guard returned by [`DebugReentrancy::enter`].
pub struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _owner: PhantomData<&'a DebugReentrancy>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let prev = self.owner.active.take();
            debug_assert!(prev.is_some());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DebugReentrancy;

    #[test]
    fn sequential_entries_are_fine() {
        let r = DebugReentrancy::new();
        {
            let _g = r.enter("insert");
        }
        let _g = r.enter("remove");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn active_site_is_reported() {
        let r = DebugReentrancy::new();
        assert_eq!(r.active(), None);
        let g = r.enter("find");
        assert_eq!(r.active(), Some("find"));
        drop(g);
        assert_eq!(r.active(), None);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nested_entry_panics_in_debug() {
        let r = DebugReentrancy::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _outer = r.enter("insert");
            let _inner = r.enter("find");
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn nested_entry_is_noop_in_release() {
        let r = DebugReentrancy::new();
        let _outer = r.enter("insert");
        let _inner = r.enter("find");
    }
}
