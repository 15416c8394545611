#![cfg(test)]

// Property tests for ChainedTable kept inside the crate so they can check
// the private sizing and chain invariants after every step.

use crate::chained_table::{CellHandle, ChainedTable, DefaultTable, MINIMUM_CAPACITY};
use crate::helper::DefaultHelper;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Remove(usize),
    RemoveCell(usize),
    Find(usize),
    Mutate(usize, i32),
    RetainOdd,
    CursorDrainEvery(usize),
    Iterate,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=48).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            6 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            3 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::RemoveCell),
            2 => idx.clone().prop_map(OpI::Find),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::RetainOdd),
            1 => (1usize..4).prop_map(OpI::CursorDrainEvery),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drive one table and a std HashMap model through the same operations.
fn run<S: BuildHasher>(
    mut sut: ChainedTable<DefaultHelper<String, S>, i32>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, i32> = HashMap::new();
    let mut live: HashMap<String, CellHandle> = HashMap::new();
    let mut stale: Vec<CellHandle> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i].clone();
                let (h, old) = sut.insert_full(k.clone(), v);
                prop_assert_eq!(old, model.insert(k.clone(), v));
                if let Some(prev) = live.insert(k, h) {
                    prop_assert_eq!(prev, h, "overwrite must keep the cell");
                }
            }
            OpI::Remove(i) => {
                let k = &pool[i];
                let got = sut.remove(k);
                prop_assert_eq!(got.map(|(_, v)| v), model.remove(k));
                if let Some(h) = live.remove(k) {
                    stale.push(h);
                }
            }
            OpI::RemoveCell(i) => {
                let k = &pool[i];
                if let Some(h) = live.remove(k) {
                    let (kk, vv) = sut.remove_cell(h).expect("live handle removes");
                    prop_assert_eq!(&kk, k);
                    prop_assert_eq!(Some(vv), model.remove(k));
                    stale.push(h);
                    prop_assert!(sut.remove_cell(h).is_none(), "second removal is a no-op");
                }
            }
            OpI::Find(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.find(k), live.get(k).copied());
                prop_assert_eq!(sut.get(k), model.get(k));
            }
            OpI::Mutate(i, d) => {
                let k = &pool[i];
                if let Some(&h) = live.get(k) {
                    let vr = h.value_mut(&mut sut).expect("live handle resolves");
                    *vr = vr.wrapping_add(d);
                    let mv = model.get_mut(k).expect("model has live key");
                    *mv = mv.wrapping_add(d);
                }
            }
            OpI::RetainOdd => {
                sut.retain(|_, v| *v % 2 != 0);
                model.retain(|_, v| *v % 2 != 0);
                let gone: Vec<String> = live
                    .keys()
                    .filter(|k| !model.contains_key(*k))
                    .cloned()
                    .collect();
                for k in gone {
                    stale.extend(live.remove(&k));
                }
            }
            OpI::CursorDrainEvery(n) => {
                let mut cursor = sut.cursor();
                let mut seen = 0usize;
                while cursor.next_handle().is_some() {
                    seen += 1;
                    if seen % n == 0 {
                        let (k, v) = cursor.remove().expect("current cell removable");
                        prop_assert_eq!(model.remove(&k), Some(v));
                        stale.extend(live.remove(&k));
                        prop_assert!(cursor.remove().is_err(), "double remove must fail");
                    } else {
                        prop_assert!(cursor.current().is_some());
                    }
                }
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.iter().map(|(_, k, _)| k.clone()).collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().len(), model.len());
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
                stale.extend(live.drain().map(|(_, h)| h));
                prop_assert_eq!(sut.capacity(), 0);
            }
        }

        // Post-conditions after each op
        sut.assert_invariants();
        for &h in &stale {
            prop_assert!(h.value(&sut).is_none(), "stale handle resolved");
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        if sut.capacity() > MINIMUM_CAPACITY {
            prop_assert!(sut.len() > sut.capacity() / 3, "table should have shrunk");
        }
    }
    Ok(())
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `insert` returns the model's previous value; an overwrite keeps the handle.
// - `remove`/`remove_cell` return the removed value and invalidate the handle.
// - Cursor removal visits each cell once and rejects a second `remove`.
// - Capacity is 0 or a power of two >= 16, load stays under 2x capacity, and
//   a table above the minimum is never left at or below a third full.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        let sut: DefaultTable<String, i32> = ChainedTable::new();
        run(sut, &pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state machine with every key in one chain. Unlinking the
// head, middle and tail of a long chain all go through the same paths.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let sut = ChainedTable::with_helper(DefaultHelper::with_hasher(ConstBuildHasher));
        run(sut, &pool, ops)?;
    }
}
