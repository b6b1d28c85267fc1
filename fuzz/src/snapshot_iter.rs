#![no_main]

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cart::AdaptiveRadixTree;

#[derive(Arbitrary, Debug)]
enum Op {
    Insert { key: Vec<u8>, val: u16 },
    Remove { key: Vec<u8> },
    Snapshot,
    PrefixScan { prefix: Vec<u8> },
    PathScan { path: Vec<u8> },
}

fn expected_path(model: &BTreeMap<Vec<u8>, u16>, path: &[u8]) -> Vec<(Vec<u8>, u16)> {
    model
        .iter()
        .filter(|(k, _)| path.starts_with(k) || k.starts_with(path))
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

fuzz_target!(|ops: Vec<Op>| {
    let tree = AdaptiveRadixTree::<u16>::new();
    let mut model = BTreeMap::new();
    let mut snapshots: Vec<(AdaptiveRadixTree<u16>, BTreeMap<Vec<u8>, u16>)> = Vec::new();

    for op in ops.into_iter().take(2048) {
        match op {
            Op::Insert { key, val } => {
                assert_eq!(tree.insert(&key, val), model.insert(key, val));
            }
            Op::Remove { key } => {
                assert_eq!(tree.remove(&key), model.remove(&key));
            }
            Op::Snapshot => {
                if snapshots.len() < 8 {
                    snapshots.push((tree.snapshot(), model.clone()));
                }
            }
            Op::PrefixScan { prefix } => {
                let got: Vec<_> = tree.prefix_iter(&prefix).collect();
                let want: Vec<_> = model
                    .range(prefix.clone()..)
                    .take_while(|(k, _)| k.starts_with(&prefix))
                    .map(|(k, v)| (k.clone(), *v))
                    .collect();
                assert_eq!(got, want);
            }
            Op::PathScan { path } => {
                let got: Vec<_> = tree.path_iter(&path).collect();
                assert_eq!(got, expected_path(&model, &path));
            }
        }
    }

    let entries: Vec<_> = tree.iter().collect();
    let expected: Vec<_> = model.into_iter().collect();
    assert_eq!(entries, expected);

    for (snapshot, frozen) in snapshots {
        assert_eq!(snapshot.len(), frozen.len());
        let entries: Vec<_> = snapshot.iter().collect();
        let expected: Vec<_> = frozen.into_iter().collect();
        assert_eq!(entries, expected);
        if let Err(e) = snapshot.check_invariants() {
            panic!("snapshot invariant violated: {e}");
        }
    }
});
