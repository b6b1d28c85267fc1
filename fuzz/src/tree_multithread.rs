#![no_main]

use std::collections::BTreeMap;
use std::sync::{Arc, Barrier};
use std::thread;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cart::AdaptiveRadixTree;

#[derive(Arbitrary, Debug, Clone)]
enum ThreadOp {
    Insert { key: Vec<u8>, val: usize },
    Remove { key: Vec<u8> },
    Get { key: Vec<u8> },
    Scan,
}

#[derive(Arbitrary, Debug)]
struct MultithreadedFuzzInput {
    // Entries inserted before any thread starts; every thread may read them
    shared: Vec<(Vec<u8>, usize)>,
    // Number of threads to spawn (1-8)
    num_threads: u8,
    // Operations per thread, each confined to keys under the thread's own byte
    thread_ops: Vec<Vec<ThreadOp>>,
}

/// Threads own disjoint key spaces: byte `0xF0 + id` followed by the fuzzed key. Shared entries
/// live under bytes below `0xF0`.
fn owned(id: usize, key: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(key.len() + 1);
    k.push(0xF0 + id as u8);
    k.extend_from_slice(key);
    k
}

fuzz_target!(|input: MultithreadedFuzzInput| {
    let num_threads = ((input.num_threads % 8) + 1) as usize;
    let tree = Arc::new(AdaptiveRadixTree::<usize>::new());

    let mut shared = BTreeMap::new();
    for (key, val) in input.shared.into_iter().take(64) {
        let key: Vec<u8> = key.into_iter().take_while(|b| *b < 0xF0).collect();
        tree.insert(&key, val);
        shared.insert(key, val);
    }
    let shared = Arc::new(shared);

    let barrier = Arc::new(Barrier::new(num_threads));
    let handles: Vec<_> = (0..num_threads)
        .map(|id| {
            let tree = tree.clone();
            let barrier = barrier.clone();
            let shared = shared.clone();
            let ops: Vec<_> = input
                .thread_ops
                .get(id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .take(200)
                .collect();
            thread::spawn(move || {
                let mut model = BTreeMap::new();
                barrier.wait();
                for op in ops {
                    match op {
                        ThreadOp::Insert { key, val } => {
                            let key = owned(id, &key);
                            assert_eq!(tree.insert(&key, val), model.insert(key, val));
                        }
                        ThreadOp::Remove { key } => {
                            let key = owned(id, &key);
                            assert_eq!(tree.remove(&key), model.remove(&key));
                        }
                        ThreadOp::Get { key } => {
                            let own = owned(id, &key);
                            assert_eq!(tree.get(&own), model.get(&own).copied());
                            if let Some(v) = shared.get(&key) {
                                assert_eq!(tree.get(&key), Some(*v));
                            }
                        }
                        ThreadOp::Scan => {
                            let mine: Vec<_> = tree.prefix_iter([0xF0 + id as u8]).collect();
                            let want: Vec<_> =
                                model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                            assert_eq!(mine, want);
                        }
                    }
                }
                model
            })
        })
        .collect();

    let mut expected: BTreeMap<Vec<u8>, usize> = (*shared).clone();
    for handle in handles {
        expected.extend(handle.join().expect("thread panicked"));
    }

    assert_eq!(tree.len(), expected.len());
    let entries: Vec<_> = tree.iter().collect();
    let expected: Vec<_> = expected.into_iter().collect();
    assert_eq!(entries, expected);
    if let Err(e) = tree.check_invariants() {
        panic!("invariant violated: {e}");
    }
});
