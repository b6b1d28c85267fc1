//! Concurrent adaptive radix tree.
//!
//! This module contains the main [`AdaptiveRadixTree`] implementation: descent, path splitting
//! and merging, copy-on-write versioning and snapshot handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::invariants::{InvariantViolation, check_structure};
use crate::iter::Iter;
use crate::node::{Content, Node, NodeKind, NodeRef, Slot};
use crate::partials::Partial;
use crate::partials::vector_partial::VectorPartial;
use crate::path_iter::{PathIter, PrefixIter};
use crate::utils::intent_lock::IntentGuard;

type RootSlot<V> = Option<NodeRef<V>>;

/// A concurrent Adaptive Radix Tree over byte-string keys.
///
/// Every operation takes `&self`; share the tree between threads behind an [`Arc`].
///
/// ## Features
///
/// - **Adaptive nodes**: inner nodes move between 4, 16, 48 and 256 child slots as they fill
///   and drain
/// - **Path compression**: runs of single-child levels are folded into one node's prefix
/// - **Node-local locking**: writers take intent locks root to leaf and only go exclusive on
///   the node they change, so readers and writers in sibling subtrees do not contend
/// - **Snapshots**: iterators and clones see the tree as of their creation; later writes copy
///   the nodes they touch instead of changing them under the snapshot
///
/// ## Examples
///
/// ```rust
/// use cart::AdaptiveRadixTree;
///
/// let tree = AdaptiveRadixTree::<String>::new();
///
/// tree.insert("apple", "fruit".to_string());
/// tree.insert("application", "software".to_string());
///
/// assert_eq!(tree.get("apple"), Some("fruit".to_string()));
/// assert_eq!(tree.get("orange"), None);
///
/// for (key, value) in tree.iter() {
///     println!("{:?} -> {}", String::from_utf8_lossy(&key), value);
/// }
/// ```
///
/// Snapshots are cheap and isolated:
///
/// ```rust
/// use cart::AdaptiveRadixTree;
///
/// let tree = AdaptiveRadixTree::new();
/// tree.insert("a", 1);
///
/// let before = tree.snapshot();
/// tree.insert("b", 2);
///
/// assert_eq!(before.len(), 1);
/// assert_eq!(tree.len(), 2);
/// assert_eq!(before.get("b"), None);
/// ```
pub struct AdaptiveRadixTree<V> {
    root: Arc<RwLock<RootSlot<V>>>,
    /// Nodes stamped with this version are private to this tree's current generation.
    version: AtomicU64,
    /// Held shared by writers for a whole operation, exclusively while a snapshot is taken.
    snapshot_gate: RwLock<()>,
    len: AtomicUsize,
}

/// The slot a writer will swap a replacement node into.
enum Parent<V> {
    Root(IntentGuard<RootSlot<V>>),
    Inner(IntentGuard<Node<V>>, Slot),
}

impl<V> Parent<V> {
    fn replace(&mut self, node: NodeRef<V>) {
        match self {
            Parent::Root(root) => *root.get_mut() = Some(node),
            Parent::Inner(guard, Slot::Child(b)) => {
                *guard
                    .get_mut()
                    .seek_child_mut(*b)
                    .expect("parent slot is occupied") = node
            }
            Parent::Inner(guard, Slot::Terminal) => guard.get_mut().terminal = Some(node),
        }
    }
}

/// How a subtree relates to a prefix being deleted.
enum Coverage {
    Covered,
    Descend,
    Disjoint,
}

fn coverage<V>(node: &Node<V>, prefix: &[u8], depth: usize) -> Coverage {
    if let Some(leaf) = node.leaf() {
        return if leaf.key.starts_with(prefix) {
            Coverage::Covered
        } else {
            Coverage::Disjoint
        };
    }
    let rest = &prefix[depth..];
    let lcp = node.prefix.prefix_length_slice(rest);
    if lcp == rest.len() {
        Coverage::Covered
    } else if lcp == node.prefix.len() {
        Coverage::Descend
    } else {
        Coverage::Disjoint
    }
}

/// Hands back a guard on a node that may be changed in place at `epoch`. A node from an older
/// generation is copied first and the copy is swapped into `parent`, which must itself be
/// current.
fn make_current<V: Clone>(
    parent: &mut Parent<V>,
    guard: IntentGuard<Node<V>>,
    epoch: u64,
) -> IntentGuard<Node<V>> {
    if guard.version == epoch {
        return guard;
    }
    let copy = guard.cow_clone(epoch).into_ref();
    let copy_guard = IntentGuard::acquire(&copy);
    drop(guard);
    parent.replace(copy);
    copy_guard
}

/// Builds the Node4 that replaces `existing` when `key` diverges from it `lcp` bytes into its
/// prefix, or runs past the end of a leaf.
fn split_node<V: Clone>(
    existing: &Node<V>,
    key: &[u8],
    depth: usize,
    lcp: usize,
    value: V,
    epoch: u64,
) -> Node<V> {
    let mut node = Node::new_inner(existing.prefix.partial_before(lcp), epoch);
    if lcp == existing.prefix.len() {
        // Only a leaf whose key is a strict prefix of `key` ends up here.
        debug_assert!(existing.is_leaf());
        let rehomed = existing.with_prefix(VectorPartial::default(), epoch);
        node.terminal = Some(rehomed.into_ref());
    } else {
        let rehomed = existing.with_prefix(existing.prefix.partial_after(lcp + 1), epoch);
        node.add_child(existing.prefix.at(lcp), rehomed.into_ref());
    }

    let at = depth + lcp;
    match key.get(at) {
        None => node.terminal = Some(Node::new_leaf(&[], key, value, epoch).into_ref()),
        Some(b) => node.add_child(*b, Node::new_leaf(&key[at + 1..], key, value, epoch).into_ref()),
    }
    trace!(prefix = ?node.prefix, depth, "split");
    node
}

/// After a removal from `guard`'s node, drops an emptied root or folds a non-root Node4 left
/// with a single entry into that entry.
fn collapse<V: Clone>(parent: &mut Parent<V>, guard: IntentGuard<Node<V>>, epoch: u64) {
    if let Parent::Root(root) = parent {
        if guard.num_entries() == 0 {
            drop(guard);
            *root.get_mut() = None;
        }
        return;
    }
    debug_assert!(guard.num_entries() > 0);
    if guard.kind() != NodeKind::Node4 || guard.num_entries() != 1 {
        return;
    }

    let merged = match &guard.terminal {
        Some(terminal) => {
            let entry = IntentGuard::acquire(terminal);
            entry.with_prefix(guard.prefix.clone(), epoch)
        }
        None => {
            let (b, child) = guard.iter().next().expect("one child remains");
            let entry = IntentGuard::acquire(child);
            entry.with_prefix(guard.prefix.partial_joined(b, &entry.prefix), epoch)
        }
    };
    trace!(prefix = ?merged.prefix, kind = %merged.kind(), "collapse");
    drop(guard);
    parent.replace(merged.into_ref());
}

fn take_value<V: Clone>(node: NodeRef<V>) -> V {
    match Arc::try_unwrap(node) {
        Ok(lock) => match lock.into_inner().content {
            Content::Leaf(leaf) => leaf.value,
            _ => unreachable!("removed entry is not a leaf"),
        },
        Err(shared) => shared
            .read()
            .leaf()
            .expect("removed entry is not a leaf")
            .value
            .clone(),
    }
}

pub(crate) fn count_leaves<V>(node: &NodeRef<V>) -> usize {
    let mut stack = vec![node.clone()];
    let mut count = 0;
    while let Some(node) = stack.pop() {
        let node = node.read();
        if node.is_leaf() {
            count += 1;
            continue;
        }
        stack.extend(node.terminal.clone());
        stack.extend(node.iter().map(|(_, child)| child.clone()));
    }
    count
}

impl<V> Default for AdaptiveRadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> AdaptiveRadixTree<V> {
    pub fn new() -> Self {
        Self {
            root: Arc::new(RwLock::new(None)),
            version: AtomicU64::new(0),
            snapshot_gate: RwLock::new(()),
            len: AtomicUsize::new(0),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn root_node(&self) -> Option<NodeRef<V>> {
        self.root.read().clone()
    }

    /// Pins the current root for a snapshot: waits out in-flight writers, then moves the tree
    /// to a new version so later writes copy anything the snapshot can reach.
    fn snapshot_root(&self) -> Option<NodeRef<V>> {
        let _gate = self.snapshot_gate.write();
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(version, "snapshot");
        self.root.read().clone()
    }

    /// Verifies every structural invariant of the tree. Waits for in-flight writers and holds
    /// off new ones while it runs.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let _gate = self.snapshot_gate.write();
        check_structure(self.root_node().as_ref(), self.len())
    }
}

impl<V: Clone> AdaptiveRadixTree<V> {
    /// Looks up `key`, returning a clone of its value.
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> Option<V> {
        let key = key.as_ref();
        let mut cur = self.root_node()?;
        let mut depth = 0;
        loop {
            let next = {
                let node = cur.read();
                if let Some(leaf) = node.leaf() {
                    return (*leaf.key == *key).then(|| leaf.value.clone());
                }
                if !node.match_prefix(&key[depth..]) {
                    return None;
                }
                depth += node.prefix.len();
                let slot = Slot::for_key(key, depth);
                if let Slot::Child(_) = slot {
                    depth += 1;
                }
                node.slot(slot)?.clone()
            };
            cur = next;
        }
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    pub fn insert<K: AsRef<[u8]>>(&self, key: K, value: V) -> Option<V> {
        let key = key.as_ref();
        let _gate = self.snapshot_gate.read();
        let epoch = self.version.load(Ordering::Acquire);

        let mut root = IntentGuard::acquire(&self.root);
        let Some(mut cur) = root.clone() else {
            *root.get_mut() = Some(Node::new_leaf(key, key, value, epoch).into_ref());
            self.len.fetch_add(1, Ordering::AcqRel);
            return None;
        };
        let mut parent = Parent::Root(root);
        let mut depth = 0;

        loop {
            let guard = IntentGuard::acquire(&cur);
            let rest = &key[depth..];
            let lcp = guard.prefix.prefix_length_slice(rest);
            let prefix_len = guard.prefix.len();

            if guard.is_leaf() {
                if lcp == prefix_len && lcp == rest.len() {
                    let mut guard = make_current(&mut parent, guard, epoch);
                    let leaf = guard.get_mut().leaf_mut().expect("checked leaf");
                    debug_assert_eq!(&*leaf.key, key);
                    return Some(std::mem::replace(&mut leaf.value, value));
                }
            } else if lcp == prefix_len {
                depth += lcp;
                let mut guard = make_current(&mut parent, guard, epoch);
                let slot = Slot::for_key(key, depth);
                if let Some(next) = guard.slot(slot).cloned() {
                    parent = Parent::Inner(guard, slot);
                    cur = next;
                    if let Slot::Child(_) = slot {
                        depth += 1;
                    }
                    continue;
                }
                match slot {
                    Slot::Terminal => {
                        let leaf = Node::new_leaf(&[], key, value, epoch).into_ref();
                        guard.get_mut().terminal = Some(leaf);
                    }
                    Slot::Child(b) => {
                        let leaf = Node::new_leaf(&key[depth + 1..], key, value, epoch).into_ref();
                        guard.get_mut().add_child(b, leaf);
                    }
                }
                self.len.fetch_add(1, Ordering::AcqRel);
                return None;
            }

            let split = split_node(&guard, key, depth, lcp, value, epoch);
            drop(guard);
            parent.replace(split.into_ref());
            self.len.fetch_add(1, Ordering::AcqRel);
            return None;
        }
    }

    /// Removes `key`, returning its value. Absent keys leave the tree untouched.
    pub fn remove<K: AsRef<[u8]>>(&self, key: K) -> Option<V> {
        let key = key.as_ref();
        let _gate = self.snapshot_gate.read();
        let epoch = self.version.load(Ordering::Acquire);

        let mut root = IntentGuard::acquire(&self.root);
        let mut cur = root.clone()?;
        let root_leaf_matches = cur.read().leaf().map(|leaf| *leaf.key == *key);
        match root_leaf_matches {
            Some(false) => return None,
            Some(true) => {
                *root.get_mut() = None;
                self.len.fetch_sub(1, Ordering::AcqRel);
                return Some(take_value(cur));
            }
            None => {}
        }

        let mut parent = Parent::Root(root);
        let mut depth = 0;
        loop {
            // `cur` is always an inner node; leaves are inspected one level ahead so that their
            // parent is still held when they are detached.
            let guard = IntentGuard::acquire(&cur);
            if !guard.match_prefix(&key[depth..]) {
                return None;
            }
            depth += guard.prefix.len();
            let slot = Slot::for_key(key, depth);
            let target = guard.slot(slot)?.clone();
            let target_leaf_matches = target.read().leaf().map(|leaf| *leaf.key == *key);
            match target_leaf_matches {
                Some(false) => return None,
                Some(true) => {
                    drop(target);
                    let mut guard = make_current(&mut parent, guard, epoch);
                    let removed = guard.get_mut().detach(slot).expect("slot held under lock");
                    self.len.fetch_sub(1, Ordering::AcqRel);
                    collapse(&mut parent, guard, epoch);
                    return Some(take_value(removed));
                }
                None => {
                    debug_assert!(matches!(slot, Slot::Child(_)));
                    let guard = make_current(&mut parent, guard, epoch);
                    parent = Parent::Inner(guard, slot);
                    cur = target;
                    depth += 1;
                }
            }
        }
    }

    /// Removes every key starting with `prefix` and returns how many were removed. An empty
    /// prefix clears the tree. Runs exclusively of other writers.
    pub fn delete_prefix<K: AsRef<[u8]>>(&self, prefix: K) -> usize {
        let prefix = prefix.as_ref();
        let _gate = self.snapshot_gate.write();
        let epoch = self.version.load(Ordering::Acquire);

        let mut root = IntentGuard::acquire(&self.root);
        let Some(mut cur) = root.clone() else {
            return 0;
        };
        let root_coverage = coverage(&cur.read(), prefix, 0);
        match root_coverage {
            Coverage::Disjoint => return 0,
            Coverage::Covered => {
                *root.get_mut() = None;
                let removed = count_leaves(&cur);
                self.len.fetch_sub(removed, Ordering::AcqRel);
                debug!(removed, "cleared tree");
                return removed;
            }
            Coverage::Descend => {}
        }

        let mut parent = Parent::Root(root);
        let mut depth = 0;
        loop {
            let guard = IntentGuard::acquire(&cur);
            depth += guard.prefix.len();
            let slot = Slot::Child(prefix[depth]);
            let Some(target) = guard.slot(slot).cloned() else {
                return 0;
            };
            let target_coverage = coverage(&target.read(), prefix, depth + 1);
            match target_coverage {
                Coverage::Disjoint => return 0,
                Coverage::Covered => {
                    let mut guard = make_current(&mut parent, guard, epoch);
                    let subtree = guard.get_mut().detach(slot).expect("slot held under lock");
                    let removed = count_leaves(&subtree);
                    self.len.fetch_sub(removed, Ordering::AcqRel);
                    collapse(&mut parent, guard, epoch);
                    trace!(removed, "delete prefix");
                    return removed;
                }
                Coverage::Descend => {
                    let guard = make_current(&mut parent, guard, epoch);
                    parent = Parent::Inner(guard, slot);
                    cur = target;
                    depth += 1;
                }
            }
        }
    }

    /// The stored key that is the longest prefix of `key`, with its value.
    pub fn longest_prefix<K: AsRef<[u8]>>(&self, key: K) -> Option<(Vec<u8>, V)> {
        let key = key.as_ref();
        let mut best = None;
        let mut cur = self.root_node()?;
        let mut depth = 0;
        loop {
            let next = {
                let node = cur.read();
                if let Some(leaf) = node.leaf() {
                    if key.starts_with(&leaf.key) {
                        best = Some((leaf.key.to_vec(), leaf.value.clone()));
                    }
                    return best;
                }
                if !node.match_prefix(&key[depth..]) {
                    return best;
                }
                depth += node.prefix.len();
                if let Some(terminal) = &node.terminal {
                    let terminal = terminal.read();
                    let leaf = terminal.leaf().expect("terminal slot holds a leaf");
                    best = Some((leaf.key.to_vec(), leaf.value.clone()));
                }
                let Some(b) = key.get(depth) else {
                    return best;
                };
                depth += 1;
                match node.seek_child(*b) {
                    Some(child) => child.clone(),
                    None => return best,
                }
            };
            cur = next;
        }
    }

    /// The smallest key and its value.
    pub fn minimum(&self) -> Option<(Vec<u8>, V)> {
        self.edge(|node| {
            node.terminal
                .clone()
                .or_else(|| node.iter().next().map(|(_, c)| c.clone()))
        })
    }

    /// The largest key and its value.
    pub fn maximum(&self) -> Option<(Vec<u8>, V)> {
        self.edge(|node| {
            node.iter()
                .next_back()
                .map(|(_, c)| c.clone())
                .or_else(|| node.terminal.clone())
        })
    }

    fn edge(&self, pick: impl Fn(&Node<V>) -> Option<NodeRef<V>>) -> Option<(Vec<u8>, V)> {
        let mut cur = self.root_node()?;
        loop {
            let next = {
                let node = cur.read();
                if let Some(leaf) = node.leaf() {
                    return Some((leaf.key.to_vec(), leaf.value.clone()));
                }
                pick(&node)?
            };
            cur = next;
        }
    }

    /// Iterates every entry in ascending key order, as of this call.
    pub fn iter(&self) -> Iter<V> {
        Iter::new(self.snapshot_root())
    }

    /// Iterates, in ascending order and as of this call, every entry whose key is a prefix of
    /// `path` or has `path` as a prefix.
    pub fn path_iter<K: AsRef<[u8]>>(&self, path: K) -> PathIter<V> {
        PathIter::new(self.snapshot_root(), path.as_ref())
    }

    /// Iterates the entries whose keys start with `prefix`, in ascending order.
    pub fn prefix_iter<K: AsRef<[u8]>>(&self, prefix: K) -> PrefixIter<V> {
        PrefixIter::new(self.path_iter(prefix))
    }

    /// An independent handle on the tree as it is now. Same as [`Clone::clone`].
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}

impl<V: Clone> Clone for AdaptiveRadixTree<V> {
    /// O(1): both trees share every node and copy on write from here on.
    fn clone(&self) -> Self {
        let _gate = self.snapshot_gate.write();
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        let len = self.len.load(Ordering::Acquire);
        debug!(version, len, "clone");
        Self {
            root: Arc::new(RwLock::new(self.root.read().clone())),
            version: AtomicU64::new(version),
            snapshot_gate: RwLock::new(()),
            len: AtomicUsize::new(len),
        }
    }
}

impl<K: AsRef<[u8]>, V: Clone> FromIterator<(K, V)> for AdaptiveRadixTree<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let tree = Self::new();
        for (k, v) in iter {
            tree.insert(k, v);
        }
        tree
    }
}
