// Integration tests for the hash-derived collections.
//
// Invariants exercised:
// - Capacity doubles once load reaches 2x and halves once it falls to a
//   third, never below 16.
// - Overwriting keeps the entry's cell; misses are `None`/`false`.
// - Identity maps separate equal keys in distinct allocations.
// - Weak maps stop reporting a key as soon as its last strong reference is
//   dropped, and lookups stay usable while earlier results are borrowed.

use chain_collections::{HashMap, HashSet, IdentityHashMap, Shared, WeakHashMap, MINIMUM_CAPACITY};

// Test: grow past 2x load and shrink back.
// Assumes: a table pre-sized to 16 buckets.
// Verifies: capacity is >= 32 when the 33rd insert returns, and 31 removals
// bring it back to the minimum.
#[test]
fn table_grows_and_shrinks_with_load() {
    let mut m: HashMap<u32, u32> = HashMap::with_capacity(16);
    assert_eq!(m.capacity(), MINIMUM_CAPACITY);
    for i in 0..33 {
        assert_eq!(m.insert(i, i * 2), None);
    }
    assert!(m.capacity() >= 32, "capacity {}", m.capacity());
    for i in 0..31 {
        assert_eq!(m.remove(&i), Some(i * 2));
    }
    assert_eq!(m.len(), 2);
    assert_eq!(m.capacity(), MINIMUM_CAPACITY);
    assert_eq!(m.get(&31), Some(&62));
    assert_eq!(m.get(&32), Some(&64));
}

// Test: removal is idempotent.
// Verifies: the second removal reports not-found instead of failing.
#[test]
fn double_remove_reports_absent() {
    let mut m = HashMap::new();
    m.insert("k".to_string(), 1);
    assert_eq!(m.remove("k"), Some(1));
    assert_eq!(m.remove("k"), None);
    assert!(!m.contains_key("k"));
    assert!(m.is_empty());
}

// Test: overwrite and handles.
// Verifies: an overwrite returns the old value and keeps the cell handle.
#[test]
fn overwrite_keeps_cell() {
    let mut m = HashMap::new();
    m.insert("a".to_string(), 1);
    let before = m.cell("a").expect("present");
    assert_eq!(m.insert("a".to_string(), 2), Some(1));
    assert_eq!(m.cell("a"), Some(before));
    assert_eq!(before.value(m.table()), Some(&2));
}

#[test]
fn cursor_removes_while_walking() {
    let mut m: HashMap<u32, u32> = (0..200).map(|i| (i, i)).collect();
    let before = m.capacity();
    {
        let mut cur = m.cursor();
        while let Some((k, _)) = cur.next() {
            if *k >= 10 {
                cur.remove().unwrap();
            }
        }
    }
    assert_eq!(m.len(), 10);
    assert!(m.capacity() < before);
    let mut keys: Vec<_> = m.keys().copied().collect();
    keys.sort_unstable();
    assert_eq!(keys, (0..10).collect::<Vec<_>>());
}

#[test]
fn views_and_equality() {
    let mut a: HashMap<&str, i32> = [("x", 1), ("y", 2)].into_iter().collect();
    let b: HashMap<&str, i32> = [("y", 2), ("x", 1)].into_iter().collect();
    assert_eq!(a, b);
    for v in a.values_mut() {
        *v *= 10;
    }
    assert_ne!(a, b);
    let mut vals: Vec<_> = a.values().copied().collect();
    vals.sort_unstable();
    assert_eq!(vals, vec![10, 20]);
    a.retain(|_, v| *v > 10);
    assert_eq!(a.len(), 1);
    a.clear();
    assert_eq!(a.capacity(), 0);
}

#[test]
fn set_reports_newly_inserted() {
    let mut s: HashSet<String> = HashSet::new();
    assert!(s.insert("a".into()));
    assert!(!s.insert("a".into()));
    s.extend(["b".to_string(), "c".to_string()]);
    assert_eq!(s.len(), 3);
    assert_eq!(s.get("b").map(String::as_str), Some("b"));
    assert!(s.remove("b"));
    assert!(!s.remove("b"));
    assert!(!s.contains("b"));
}

#[test]
fn identity_map_keys_by_allocation() {
    let a = Shared::new(String::from("same"));
    let b = Shared::new(String::from("same"));
    let mut m = IdentityHashMap::new();
    m.insert(a.clone(), 'a');
    m.insert(b.clone(), 'b');
    assert_eq!(m.len(), 2);
    assert_eq!(m.get(&*a), Some(&'a'));
    assert_eq!(m.get(&*b), Some(&'b'));
    assert_eq!(m.remove_entry(&*a).map(|(k, v)| (Shared::ptr_eq(&k, &a), v)), Some((true, 'a')));
    assert!(!m.contains_key(&*a));
}

// Test: Scenario D, reclaimed weak key.
// Assumes: the map holds the only other reference weakly.
// Verifies: after the strong reference is dropped, the next read reports the
// key absent and the size drops.
#[test]
fn weak_map_evicts_reclaimed_keys() {
    let mut m: WeakHashMap<String, u32> = WeakHashMap::new();
    let keep = Shared::new("keep".to_string());
    let lose = Shared::new("lose".to_string());
    m.insert(keep.clone(), 1);
    m.insert(lose.clone(), 2);
    assert_eq!(m.len(), 2);

    drop(lose);
    assert!(m.get(&"lose".to_string()).is_none());
    assert_eq!(m.len(), 1);

    // A dead cell does not count toward the size of later writes.
    let other = Shared::new("other".to_string());
    drop(keep);
    m.insert(other.clone(), 3);
    assert_eq!(m.len(), 1);
    assert_eq!(m.keys().len(), 1);
    assert!(Shared::ptr_eq(&m.keys()[0], &other));
}

// Test: borrowed lookups across further reads.
// Assumes: values returned by `get` borrow the map.
// Verifies: a held `get` result survives a second `get`, `len`,
// `contains_key`, `keys` and `reclaim`; a dead key stays absent while the
// sweep is skipped, and is evicted once the borrow ends.
#[test]
fn weak_map_reads_while_value_borrowed() {
    let mut m: WeakHashMap<String, u32> = WeakHashMap::new();
    let a = Shared::new("a".to_string());
    let b = Shared::new("b".to_string());
    let gone = Shared::new("gone".to_string());
    m.insert(a.clone(), 1);
    m.insert(b.clone(), 2);
    m.insert(gone.clone(), 3);
    drop(gone);

    let va = m.get(&"a".to_string()).unwrap();
    let vb = m.get(&"b".to_string()).unwrap();
    assert_eq!((*va, *vb), (1, 2));
    assert!(m.get(&"gone".to_string()).is_none());
    assert!(m.contains_key(&"a".to_string()));
    assert_eq!(m.len(), 2);
    assert_eq!(m.keys().len(), 2);
    assert_eq!(m.reclaim(), 0);
    drop((va, vb));

    assert_eq!(m.reclaim(), 1);
    assert_eq!(m.len(), 2);
}

// Test: calling back into the map from `for_each`.
// Verifies: the visitor can look up, count and list keys without panicking.
#[test]
fn weak_map_for_each_may_read_the_map() {
    let mut m: WeakHashMap<u32, u32> = WeakHashMap::new();
    let mut keys: Vec<_> = (0..8u32).map(Shared::new).collect();
    for k in &keys {
        m.insert(k.clone(), **k * 10);
    }
    keys.truncate(4);

    let mut visited = 0;
    m.for_each(|k, v| {
        assert_eq!(*m.get(k).unwrap(), *v);
        assert_eq!(m.len(), 4);
        assert_eq!(m.keys().len(), 4);
        visited += 1;
    });
    assert_eq!(visited, 4);
}
