#![cfg(feature = "sync")]

use chain_collections::{Container, HashMap, OrderedMap, Synchronized};
use std::thread;

#[test]
fn concurrent_writers_and_one_lock_for_views() {
    let map: Synchronized<HashMap<u64, u64>> = Synchronized::default();
    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let map = map.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    let k = t * 10_000 + i;
                    map.insert(k, k * 2);
                    if i % 5 == 0 {
                        assert_eq!(map.remove(&k), Some(k * 2));
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(map.len(), 8 * 400);

    // Views are read under the same guard the forwarding methods take.
    let guard = map.lock();
    let sum: u64 = guard.values().sum();
    let expected: u64 = (0..8u64)
        .flat_map(|t| (0..500).filter(|i| i % 5 != 0).map(move |i| (t * 10_000 + i) * 2))
        .sum();
    assert_eq!(sum, expected);
}

#[test]
fn container_trait_is_uniform() {
    fn drain<C: Container>(c: &mut C) -> usize {
        let n = c.len();
        c.clear();
        n
    }
    let mut m: OrderedMap<u8, u8> = (0..10).map(|i| (i, i)).collect();
    assert_eq!(drain(&mut m), 10);
    assert!(Container::is_empty(&m));
}

#[cfg(feature = "arc")]
#[test]
fn ordered_map_is_shareable_with_arc_nodes() {
    let map: Synchronized<OrderedMap<u32, u32>> = Synchronized::default();
    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let map = map.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    map.insert(t * 100 + i, i);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let guard = map.lock();
    assert_eq!(guard.len(), 400);
    assert!(guard.keys().copied().eq(0..400));
}
