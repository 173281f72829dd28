use proptest::prelude::*;
use std::collections::BTreeSet;

use crate::{BatchOptions, RadixTrie, StringIndex, Trie};

/// Engines under test, with their structural validators attached.
trait Checked: StringIndex {
    fn check(&self);
}

impl Checked for Trie {
    fn check(&self) {
        self.check_invariants();
    }
}

impl Checked for RadixTrie {
    fn check(&self) {
        self.check_invariants();
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(String),
    Remove(String),
    Contains(String),
    ContainsPrefix(String),
    Enumerate(String, Option<usize>),
    BatchInsert(Vec<String>),
    BatchRemove(Vec<String>),
}

/// Keys drawn from two shapes: a narrow alphabet with longer strings to
/// force deep shared prefixes, splits, and coalescing; and a wide
/// alphabet with short strings to push fanout through the representation
/// switch. Lowercase only, so the default normalizer is the identity and
/// the model needs no folding of its own.
fn key_strategy() -> impl Strategy<Value = String> + Clone {
    prop_oneof![
        3 => proptest::string::string_regex("[ab]{0,10}").unwrap(),
        1 => proptest::string::string_regex("[a-p]{0,2}").unwrap(),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let key = key_strategy();
    prop_oneof![
        4 => key.clone().prop_map(Op::Insert),
        3 => key.clone().prop_map(Op::Remove),
        2 => key.clone().prop_map(Op::Contains),
        1 => key.clone().prop_map(Op::ContainsPrefix),
        1 => (key.clone(), proptest::option::of(0usize..5))
            .prop_map(|(prefix, limit)| Op::Enumerate(prefix, limit)),
        1 => prop::collection::vec(key.clone(), 0..12).prop_map(Op::BatchInsert),
        1 => prop::collection::vec(key, 0..12).prop_map(Op::BatchRemove),
    ]
}

/// Drive an engine and a `BTreeSet` model through the same op sequence,
/// asserting agreement and structural invariants after every step.
fn run_ops<T: Checked>(index: &mut T, ops: &[Op]) {
    let mut model: BTreeSet<String> = BTreeSet::new();

    for op in ops {
        match op {
            Op::Insert(key) => {
                let expected = model.insert(key.clone());
                assert_eq!(index.insert(key), expected, "insert {key:?}");
            }
            Op::Remove(key) => {
                let expected = model.remove(key.as_str());
                assert_eq!(index.remove(key), expected, "remove {key:?}");
            }
            Op::Contains(key) => {
                assert_eq!(index.contains(key), model.contains(key.as_str()));
            }
            Op::ContainsPrefix(prefix) => {
                let expected = model.iter().any(|k| k.starts_with(prefix.as_str()));
                assert_eq!(index.contains_prefix(prefix), expected);
            }
            Op::Enumerate(prefix, limit) => {
                let expected: Vec<String> = model
                    .iter()
                    .filter(|k| k.starts_with(prefix.as_str()))
                    .cloned()
                    .collect();
                let mut got: Vec<String> = index.keys_with_prefix(prefix, *limit).collect();
                match limit {
                    None => {
                        got.sort_unstable();
                        assert_eq!(got, expected, "enumerate {prefix:?}");
                    }
                    Some(limit) => {
                        assert_eq!(got.len(), expected.len().min(*limit));
                        let distinct: BTreeSet<&String> = got.iter().collect();
                        assert_eq!(distinct.len(), got.len(), "duplicate yields");
                        for key in &got {
                            assert!(model.contains(key) && key.starts_with(prefix.as_str()));
                        }
                    }
                }
            }
            Op::BatchInsert(keys) => {
                let mut added = 0;
                for key in keys {
                    if model.insert(key.clone()) {
                        added += 1;
                    }
                }
                assert_eq!(index.batch_insert(keys, BatchOptions::default()), added);
            }
            Op::BatchRemove(keys) => {
                let unique: BTreeSet<&String> = keys.iter().collect();
                let mut removed = 0;
                for key in &unique {
                    if model.remove(key.as_str()) {
                        removed += 1;
                    }
                }
                let outcome = index.batch_remove(keys, BatchOptions::default());
                assert_eq!(outcome.removed, removed);
                assert_eq!(outcome.missing, unique.len() - removed);
            }
        }
        index.check();
        assert_eq!(index.len(), model.len());
    }

    let mut all: Vec<String> = index.keys_with_prefix("", None).collect();
    all.sort_unstable();
    let expected: Vec<String> = model.iter().cloned().collect();
    assert_eq!(all, expected, "final enumeration");
}

proptest! {
    #[test]
    fn trie_matches_set_model(ops in prop::collection::vec(op_strategy(), 0..50)) {
        let mut trie = Trie::new();
        run_ops(&mut trie, &ops);
    }

    #[test]
    fn radix_matches_set_model(ops in prop::collection::vec(op_strategy(), 0..50)) {
        let mut trie = RadixTrie::new();
        run_ops(&mut trie, &ops);
    }

    /// Any permutation of single inserts builds a structure observably
    /// identical to one batch insert of the same keys.
    #[test]
    fn batch_insert_equals_singles(keys in prop::collection::vec(key_strategy(), 0..30)) {
        let mut batched = RadixTrie::new();
        batched.batch_insert(&keys, BatchOptions::default());
        batched.check_invariants();

        let mut singles = RadixTrie::new();
        for key in keys.iter().rev() {
            singles.insert(key);
        }

        prop_assert_eq!(batched.len(), singles.len());
        prop_assert_eq!(batched.stats(), singles.stats());

        let mut trie_batched = Trie::new();
        trie_batched.batch_insert(&keys, BatchOptions::default());
        trie_batched.check_invariants();

        let mut trie_singles = Trie::new();
        for key in keys.iter().rev() {
            trie_singles.insert(key);
        }

        prop_assert_eq!(trie_batched.len(), trie_singles.len());
        prop_assert_eq!(trie_batched.stats(), trie_singles.stats());

        let mut a: Vec<String> = batched.keys_with_prefix("", None).collect();
        let mut b: Vec<String> = trie_batched.keys_with_prefix("", None).collect();
        a.sort_unstable();
        b.sort_unstable();
        prop_assert_eq!(a, b, "engines disagree on the stored key set");
    }

    /// Inserting then removing a key restores node count and key set.
    #[test]
    fn remove_undoes_insert(
        keys in prop::collection::vec(key_strategy(), 0..20),
        extra in key_strategy(),
    ) {
        let mut trie = RadixTrie::new();
        trie.batch_insert(&keys, BatchOptions::default());

        let stats = trie.stats();
        let had = trie.contains(&extra);

        let added = trie.insert(&extra);
        prop_assert_eq!(added, !had);
        trie.remove(&extra);
        trie.check_invariants();

        if !had {
            prop_assert_eq!(trie.stats(), stats);
        }
        prop_assert_eq!(trie.contains(&extra), had);
    }

    /// Both engines agree with each other on random lookups.
    #[test]
    fn engines_agree(
        keys in prop::collection::vec(key_strategy(), 0..25),
        probes in prop::collection::vec(key_strategy(), 0..25),
    ) {
        let mut trie = Trie::new();
        let mut radix = RadixTrie::new();
        for key in &keys {
            trie.insert(key);
            radix.insert(key);
        }
        for probe in &probes {
            prop_assert_eq!(trie.contains(probe), radix.contains(probe));
            prop_assert_eq!(trie.contains_prefix(probe), radix.contains_prefix(probe));
            let t: usize = trie.keys_with_prefix(probe, None).count();
            let r: usize = radix.keys_with_prefix(probe, None).count();
            prop_assert_eq!(t, r);
        }
    }
}
