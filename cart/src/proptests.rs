use std::collections::BTreeMap;

use proptest::prelude::*;

use crate::node::Slot;
use crate::partials::Partial;
use crate::tree::AdaptiveRadixTree;

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, u64),
    Remove(Vec<u8>),
    Get(Vec<u8>),
    DeletePrefix(Vec<u8>),
}

// A small alphabet and short keys give plenty of shared prefixes, keys that are prefixes of
// other keys, and nodes that grow and shrink.
fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    prop::collection::vec(prop_oneof![0u8..4, Just(0xFF), any::<u8>()], 0..=6)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        50 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        23 => key.clone().prop_map(Op::Get),
        2 => prop::collection::vec(0u8..4, 1..=2).prop_map(Op::DeletePrefix),
    ];
    prop::collection::vec(op, 0..=600)
}

fn apply(tree: &AdaptiveRadixTree<u64>, model: &mut BTreeMap<Vec<u8>, u64>, op: &Op) {
    match op {
        Op::Insert(k, v) => assert_eq!(tree.insert(k, *v), model.insert(k.clone(), *v)),
        Op::Remove(k) => assert_eq!(tree.remove(k), model.remove(k)),
        Op::Get(k) => assert_eq!(tree.get(k), model.get(k).copied()),
        Op::DeletePrefix(p) => {
            let before = model.len();
            model.retain(|k, _| !k.starts_with(p));
            assert_eq!(tree.delete_prefix(p), before - model.len());
        }
    }
}

fn entries(model: &BTreeMap<Vec<u8>, u64>) -> Vec<(Vec<u8>, u64)> {
    model.iter().map(|(k, v)| (k.clone(), *v)).collect()
}

/// Inner nodes visited on the way from the root to `key`'s leaf.
fn inner_nodes_on_path(tree: &AdaptiveRadixTree<u64>, key: &[u8]) -> usize {
    let mut cur = tree.root_node().expect("key is present");
    let mut depth = 0;
    let mut count = 0;
    loop {
        let next = {
            let node = cur.read();
            if node.is_leaf() {
                return count;
            }
            count += 1;
            depth += node.prefix.len();
            let slot = Slot::for_key(key, depth);
            if let Slot::Child(_) = slot {
                depth += 1;
            }
            node.slot(slot).expect("key is present").clone()
        };
        cur = next;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_matches_btreemap(ops in ops_strategy()) {
        let tree = AdaptiveRadixTree::new();
        let mut model = BTreeMap::new();
        for op in &ops {
            apply(&tree, &mut model, op);
        }
        prop_assert_eq!(tree.check_invariants(), Ok(()));
        prop_assert_eq!(tree.len(), model.len());
        prop_assert_eq!(tree.iter().collect::<Vec<_>>(), entries(&model));
        prop_assert_eq!(tree.minimum(), model.first_key_value().map(|(k, v)| (k.clone(), *v)));
        prop_assert_eq!(tree.maximum(), model.last_key_value().map(|(k, v)| (k.clone(), *v)));
    }

    #[test]
    fn prop_delete_absent_is_idempotent(keys in prop::collection::btree_set(key_strategy(), 0..100), absent in key_strategy()) {
        prop_assume!(!keys.contains(&absent));
        let tree = AdaptiveRadixTree::new();
        for (i, k) in keys.iter().enumerate() {
            tree.insert(k, i as u64);
        }
        let before: Vec<_> = tree.iter().collect();
        prop_assert_eq!(tree.remove(&absent), None);
        prop_assert_eq!(tree.remove(&absent), None);
        prop_assert_eq!(tree.iter().collect::<Vec<_>>(), before);
        prop_assert_eq!(tree.check_invariants(), Ok(()));
    }

    #[test]
    fn prop_path_compression_bound(keys in prop::collection::btree_set(key_strategy(), 1..200)) {
        let tree = AdaptiveRadixTree::new();
        for k in &keys {
            tree.insert(k, 0);
        }
        for k in &keys {
            // One extra level when the key sits in a terminal slot.
            prop_assert!(inner_nodes_on_path(&tree, k) <= k.len() + 1);
        }
    }

    #[test]
    fn prop_path_compression_bound_prefix_free(keys in prop::collection::btree_set(prop::collection::vec(0u8..6, 5), 1..200)) {
        let tree = AdaptiveRadixTree::new();
        for k in &keys {
            tree.insert(k, 0);
        }
        for k in &keys {
            prop_assert!(inner_nodes_on_path(&tree, k) <= k.len());
        }
    }

    #[test]
    fn prop_snapshot_isolation(before in ops_strategy(), after in ops_strategy()) {
        let tree = AdaptiveRadixTree::new();
        let mut model = BTreeMap::new();
        for op in &before {
            apply(&tree, &mut model, op);
        }
        let frozen = entries(&model);
        let iter = tree.iter();
        let clone = tree.clone();
        let path_iter = tree.prefix_iter([1u8]);

        for op in &after {
            apply(&tree, &mut model, op);
        }
        prop_assert_eq!(iter.collect::<Vec<_>>(), frozen.clone());
        prop_assert_eq!(clone.iter().collect::<Vec<_>>(), frozen.clone());
        prop_assert_eq!(
            path_iter.collect::<Vec<_>>(),
            frozen.into_iter().filter(|(k, _)| k.starts_with(&[1])).collect::<Vec<_>>()
        );
        prop_assert_eq!(tree.iter().collect::<Vec<_>>(), entries(&model));
        prop_assert_eq!(tree.check_invariants(), Ok(()));
        prop_assert_eq!(clone.check_invariants(), Ok(()));
    }

    #[test]
    fn prop_path_queries(keys in prop::collection::btree_set(key_strategy(), 0..150), path in key_strategy()) {
        let tree = AdaptiveRadixTree::new();
        let mut model = BTreeMap::new();
        for (i, k) in keys.iter().enumerate() {
            tree.insert(k, i as u64);
            model.insert(k.clone(), i as u64);
        }

        let expected_path: Vec<_> = entries(&model)
            .into_iter()
            .filter(|(k, _)| path.starts_with(k) || k.starts_with(&path))
            .collect();
        prop_assert_eq!(tree.path_iter(&path).collect::<Vec<_>>(), expected_path);

        let expected_prefix: Vec<_> = entries(&model)
            .into_iter()
            .filter(|(k, _)| k.starts_with(&path))
            .collect();
        prop_assert_eq!(tree.prefix_iter(&path).collect::<Vec<_>>(), expected_prefix);

        let expected_longest = model
            .iter()
            .filter(|(k, _)| path.starts_with(k))
            .max_by_key(|(k, _)| k.len())
            .map(|(k, v)| (k.clone(), *v));
        prop_assert_eq!(tree.longest_prefix(&path), expected_longest);
    }
}
