#![cfg(test)]

use chain_collections::DebugReentrancy;

#[test]
fn enter_and_exit_is_ok() {
    let r = DebugReentrancy::new();
    {
        let _g = r.enter("find");
    }
    // Released on drop: the next entry point may run.
    let _g = r.enter("insert");
}

#[cfg(debug_assertions)]
#[test]
fn reentrancy_panics_in_debug() {
    let r = DebugReentrancy::new();
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _g1 = r.enter("insert");
        assert_eq!(r.active(), Some("insert"));
        // Re-entering should panic in debug builds
        let _g2 = r.enter("find");
    }));
    assert!(res.is_err(), "expected reentrancy to panic in debug builds");
}

#[cfg(not(debug_assertions))]
#[test]
fn reentrancy_noop_in_release() {
    let r = DebugReentrancy::new();
    let _g1 = r.enter("insert");
    let _g2 = r.enter("find");
    assert_eq!(r.active(), None);
}
