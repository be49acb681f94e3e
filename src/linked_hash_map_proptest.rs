#![cfg(test)]

// Property tests for LinkedHashMap kept inside the crate so they can reach
// the private storage type.

use crate::linked_hash_map::LinkedHashMap;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations: indices shrink to earlier keys, the pool and the
// op list shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    GetOrInsert(usize, i32),
    Remove(usize),
    PopFront,
    Contains(String),
    Retain(i32),
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::GetOrInsert(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => Just(OpI::PopFront),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (2i32..4).prop_map(OpI::Retain),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// The model is a Vec of entries in insertion order.
fn model_pos(model: &[(Key, i32)], k: &Key) -> Option<usize> {
    model.iter().position(|(mk, _)| mk == k)
}

fn run<S: BuildHasher>(
    mut sut: LinkedHashMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: Vec<(Key, i32)> = Vec::new();
    let default_calls = Cell::new(0);

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                let old = match model_pos(&model, &k) {
                    Some(p) => Some(std::mem::replace(&mut model[p].1, v)),
                    None => {
                        model.push((k.clone(), v));
                        None
                    }
                };
                prop_assert_eq!(sut.insert(k, v), old);
            }
            OpI::GetOrInsert(i, v) => {
                let k = key_from(pool, i);
                let before = default_calls.get();
                let existing = model_pos(&model, &k).map(|p| model[p].1);
                let (got, inserted) = sut.get_or_insert_with(k.clone(), || {
                    default_calls.set(default_calls.get() + 1);
                    v
                });
                let got = *got;
                match existing {
                    Some(mv) => {
                        prop_assert!(!inserted);
                        prop_assert_eq!(got, mv);
                        prop_assert_eq!(default_calls.get(), before, "default must not run on hit");
                    }
                    None => {
                        prop_assert!(inserted);
                        prop_assert_eq!(got, v);
                        prop_assert_eq!(default_calls.get(), before + 1);
                        model.push((k, v));
                    }
                }
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                let want = model_pos(&model, &k).map(|p| model.remove(p));
                prop_assert_eq!(sut.remove(k.0.as_str()), want);
            }
            OpI::PopFront => {
                let want = if model.is_empty() {
                    None
                } else {
                    Some(model.remove(0))
                };
                prop_assert_eq!(sut.pop_front(), want);
            }
            OpI::Contains(s) => {
                let has_model = model.iter().any(|(k, _)| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Retain(m) => {
                sut.retain(|_, v| v % m != 0);
                model.retain(|(_, v)| v % m != 0);
            }
            OpI::Iterate => {
                let rev: Vec<Key> = sut.iter_rev().map(|(k, _)| k.clone()).collect();
                let want: Vec<Key> = model.iter().rev().map(|(k, _)| k.clone()).collect();
                prop_assert_eq!(rev, want);
            }
        }

        // Post-conditions after each op: same entries in the same order.
        let got: Vec<(Key, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(&got, &model);
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: state-machine equivalence against an insertion-ordered Vec.
// - insert returns the previous value and never moves an existing key;
// - get_or_insert_with runs its default exactly once, only on a miss;
// - remove/pop_front return the owned entry and relink the order;
// - iteration in both directions matches the model after every op.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(LinkedHashMap::with_hasher(RandomState::new()), &pool, ops)?;
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

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run(LinkedHashMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}
