#![cfg(test)]

// Property tests for the AVL storage, compared against BTreeMap.

use crate::avl::AvlTree;
use crate::comparator::natural;
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(i16, i32),
    Remove(i16),
    PopFirst,
    Ceiling(i16, bool),
    Floor(i16, bool),
    IterFrom(i16, bool),
    IterRevFrom(i16, bool),
    Retain(i16),
}

fn arb_op() -> impl Strategy<Value = Op> {
    // Narrow key range so removals and lookups hit live keys often.
    let key = -64i16..64;
    prop_oneof![
        4 => (key.clone(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        2 => key.clone().prop_map(Op::Remove),
        1 => Just(Op::PopFirst),
        1 => (key.clone(), any::<bool>()).prop_map(|(k, i)| Op::Ceiling(k, i)),
        1 => (key.clone(), any::<bool>()).prop_map(|(k, i)| Op::Floor(k, i)),
        1 => (key.clone(), any::<bool>()).prop_map(|(k, i)| Op::IterFrom(k, i)),
        1 => (key.clone(), any::<bool>()).prop_map(|(k, i)| Op::IterRevFrom(k, i)),
        1 => (2i16..5).prop_map(Op::Retain),
    ]
}

// Property: state-machine equivalence against std::collections::BTreeMap.
// - insert/remove/pop_first return what the model returns;
// - ceiling/floor and bounded iteration agree with BTreeMap ranges;
// - after every op the tree is balanced, heights are fresh and keys ordered.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_matches_btreemap(ops in proptest::collection::vec(arb_op(), 1..120)) {
        let mut sut: AvlTree<i16, i32> = AvlTree::new(natural());
        let mut model: BTreeMap<i16, i32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    prop_assert_eq!(sut.insert(k, v), model.insert(k, v));
                }
                Op::Remove(k) => {
                    prop_assert_eq!(sut.remove(&k), model.remove_entry(&k));
                }
                Op::PopFirst => {
                    prop_assert_eq!(sut.pop_first(), model.pop_first());
                }
                Op::Ceiling(k, inclusive) => {
                    let got = sut.ceiling(&k, inclusive).map(|(k, v)| (*k, *v));
                    let want = if inclusive {
                        model.range(k..).next()
                    } else {
                        model.range(k.saturating_add(1)..).next()
                    }
                    .map(|(k, v)| (*k, *v));
                    prop_assert_eq!(got, want);
                }
                Op::Floor(k, inclusive) => {
                    let got = sut.floor(&k, inclusive).map(|(k, v)| (*k, *v));
                    let want = if inclusive {
                        model.range(..=k).next_back()
                    } else {
                        model.range(..k).next_back()
                    }
                    .map(|(k, v)| (*k, *v));
                    prop_assert_eq!(got, want);
                }
                Op::IterFrom(k, inclusive) => {
                    let got: Vec<i16> = sut.iter_from(&k, inclusive).map(|(k, _)| *k).collect();
                    let want: Vec<i16> = model
                        .range(k..)
                        .map(|(k, _)| *k)
                        .filter(|x| inclusive || *x != k)
                        .collect();
                    prop_assert_eq!(got, want);
                }
                Op::IterRevFrom(k, inclusive) => {
                    let got: Vec<i16> = sut.iter_rev_from(&k, inclusive).map(|(k, _)| *k).collect();
                    let want: Vec<i16> = model
                        .range(..=k)
                        .rev()
                        .map(|(k, _)| *k)
                        .filter(|x| inclusive || *x != k)
                        .collect();
                    prop_assert_eq!(got, want);
                }
                Op::Retain(m) => {
                    sut.retain(|k, _| k % m != 0);
                    model.retain(|k, _| k % m != 0);
                }
            }
            sut.check();
            prop_assert_eq!(sut.len(), model.len());
            let keys: Vec<i16> = sut.iter().map(|(k, _)| *k).collect();
            let model_keys: Vec<i16> = model.keys().copied().collect();
            prop_assert_eq!(keys, model_keys);
        }
    }
}
