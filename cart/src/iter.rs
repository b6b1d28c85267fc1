use std::iter::FusedIterator;

use crate::node::{Node, NodeRef};

/// Ascending iterator over a snapshot of the tree.
///
/// The walk is driven by an explicit stack of node handles captured from the snapshot, so its
/// depth is independent of the call stack and later writes to the tree never show up in it.
pub struct Iter<V> {
    stack: Vec<NodeRef<V>>,
}

/// Pushes an inner node's entries so that they pop in ascending key order: the terminal (the
/// node's own key) first, then children by discriminator.
pub(crate) fn push_entries<V>(stack: &mut Vec<NodeRef<V>>, node: &Node<V>) {
    stack.extend(node.iter().rev().map(|(_, child)| child.clone()));
    stack.extend(node.terminal.clone());
}

impl<V> Iter<V> {
    pub(crate) fn new(root: Option<NodeRef<V>>) -> Self {
        Self {
            stack: root.into_iter().collect(),
        }
    }
}

impl<V: Clone> Iterator for Iter<V> {
    type Item = (Vec<u8>, V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            let node = node.read();
            if let Some(leaf) = node.leaf() {
                return Some((leaf.key.to_vec(), leaf.value.clone()));
            }
            push_entries(&mut self.stack, &node);
        }
        None
    }
}

impl<V: Clone> FusedIterator for Iter<V> {}

#[cfg(test)]
mod tests {
    use crate::tree::AdaptiveRadixTree;

    #[test]
    fn test_iter_one_regression() {
        let tree = AdaptiveRadixTree::new();
        tree.insert(123u64.to_be_bytes(), 456);
        let mut iter = tree.iter();
        let result = iter.next().expect("Expected an entry");
        assert_eq!(result.1, 456);
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_empty() {
        let tree = AdaptiveRadixTree::<u8>::new();
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn test_numeric_keys_in_order() {
        let tree = AdaptiveRadixTree::new();
        for i in (0..70_000u32).rev().step_by(7) {
            tree.insert(i.to_be_bytes(), i);
        }
        let mut last = None;
        let mut count = 0;
        for (key, value) in tree.iter() {
            assert_eq!(key, value.to_be_bytes());
            assert!(last < Some(value));
            last = Some(value);
            count += 1;
        }
        assert_eq!(count, tree.len());
    }

    #[test]
    fn test_exhausted_iterator_needs_a_fresh_call() {
        let tree = AdaptiveRadixTree::new();
        tree.insert("k", 1);
        let mut iter = tree.iter();
        assert_eq!(iter.by_ref().count(), 1);
        tree.insert("l", 2);
        assert!(iter.next().is_none());
        assert_eq!(tree.iter().count(), 2);
    }
}
