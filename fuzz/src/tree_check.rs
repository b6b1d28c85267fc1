#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cart::AdaptiveRadixTree;

#[derive(Arbitrary, Debug)]
enum MapMethod {
    Get { key: Vec<u8> },
    Insert { key: Vec<u8>, val: usize },
    Delete { key: Vec<u8> },
    DeletePrefix { prefix: Vec<u8> },
    LongestPrefix { key: Vec<u8> },
}

fuzz_target!(|methods: Vec<MapMethod>| {
    let art = AdaptiveRadixTree::<usize>::new();
    let mut bt_map = BTreeMap::<Vec<u8>, usize>::new();

    for m in methods.iter().take(4096) {
        match m {
            MapMethod::Get { key } => {
                assert_eq!(art.get(key), bt_map.get(key).copied());
            }
            MapMethod::Insert { key, val } => {
                assert_eq!(art.insert(key, *val), bt_map.insert(key.clone(), *val));
            }
            MapMethod::Delete { key } => {
                assert_eq!(art.remove(key), bt_map.remove(key));
            }
            MapMethod::DeletePrefix { prefix } => {
                let before = bt_map.len();
                bt_map.retain(|k, _| !k.starts_with(prefix));
                assert_eq!(art.delete_prefix(prefix), before - bt_map.len());
            }
            MapMethod::LongestPrefix { key } => {
                let expected = (0..=key.len())
                    .rev()
                    .find_map(|n| bt_map.get(&key[..n]).map(|v| (key[..n].to_vec(), *v)));
                assert_eq!(art.longest_prefix(key), expected);
            }
        }
        assert_eq!(art.len(), bt_map.len());
    }

    if let Err(e) = art.check_invariants() {
        panic!("invariant violated: {e}");
    }
    let entries: Vec<_> = art.iter().collect();
    let expected: Vec<_> = bt_map.into_iter().collect();
    assert_eq!(entries, expected);
});
