use std::iter::FusedIterator;

use crate::iter::push_entries;
use crate::node::{Node, NodeRef};
use crate::partials::Partial;

enum Frame<V> {
    /// A node whose path so far agrees with the target path, `depth` bytes in.
    Along { node: NodeRef<V>, depth: usize },
    /// A node whose every key qualifies.
    Beneath(NodeRef<V>),
}

/// Ascending iterator over the entries of a snapshot that lie on a path: keys that are
/// prefixes of the path, then keys that extend it.
///
/// Children that cannot agree with the path are never pushed, so the walk only touches the
/// nodes along the path and the subtree under it.
pub struct PathIter<V> {
    path: Box<[u8]>,
    stack: Vec<Frame<V>>,
}

fn push_beneath<V>(stack: &mut Vec<Frame<V>>, node: &Node<V>) {
    let mut refs = Vec::with_capacity(node.num_entries());
    push_entries(&mut refs, node);
    stack.extend(refs.into_iter().map(Frame::Beneath));
}

impl<V> PathIter<V> {
    pub(crate) fn new(root: Option<NodeRef<V>>, path: &[u8]) -> Self {
        Self {
            path: Box::from(path),
            stack: root
                .map(|node| Frame::Along { node, depth: 0 })
                .into_iter()
                .collect(),
        }
    }

    pub fn path(&self) -> &[u8] {
        &self.path
    }
}

impl<V: Clone> Iterator for PathIter<V> {
    type Item = (Vec<u8>, V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Beneath(node) => {
                    let node = node.read();
                    if let Some(leaf) = node.leaf() {
                        return Some((leaf.key.to_vec(), leaf.value.clone()));
                    }
                    push_beneath(&mut self.stack, &node);
                }
                Frame::Along { node, depth } => {
                    let node = node.read();
                    if let Some(leaf) = node.leaf() {
                        let key = &*leaf.key;
                        if self.path.starts_with(key) || key.starts_with(&self.path) {
                            return Some((key.to_vec(), leaf.value.clone()));
                        }
                        continue;
                    }

                    let rest = &self.path[depth..];
                    let lcp = node.prefix.prefix_length_slice(rest);
                    if lcp == rest.len() {
                        // The path ends inside or right at the end of this node's prefix.
                        push_beneath(&mut self.stack, &node);
                    } else if lcp == node.prefix.len() {
                        let depth = depth + lcp;
                        if let Some(child) = node.seek_child(self.path[depth]) {
                            self.stack.push(Frame::Along {
                                node: child.clone(),
                                depth: depth + 1,
                            });
                        }
                        // The terminal's key is `path[..depth]`, a proper prefix of the path.
                        if let Some(terminal) = &node.terminal {
                            self.stack.push(Frame::Beneath(terminal.clone()));
                        }
                    }
                }
            }
        }
        None
    }
}

impl<V: Clone> FusedIterator for PathIter<V> {}

/// Ascending iterator over the entries of a snapshot whose keys start with a prefix.
pub struct PrefixIter<V> {
    inner: PathIter<V>,
}

impl<V> PrefixIter<V> {
    pub(crate) fn new(inner: PathIter<V>) -> Self {
        Self { inner }
    }
}

impl<V: Clone> Iterator for PrefixIter<V> {
    type Item = (Vec<u8>, V);

    fn next(&mut self) -> Option<Self::Item> {
        // Everything a path iterator yields is a prefix of its path or extends it; keep the
        // latter.
        let path_len = self.inner.path().len();
        self.inner.find(|(key, _)| key.len() >= path_len)
    }
}

impl<V: Clone> FusedIterator for PrefixIter<V> {}

#[cfg(test)]
mod tests {
    use crate::tree::AdaptiveRadixTree;

    fn keys(entries: impl Iterator<Item = (Vec<u8>, usize)>) -> Vec<String> {
        entries
            .map(|(k, _)| String::from_utf8(k).unwrap())
            .collect()
    }

    fn sample() -> AdaptiveRadixTree<usize> {
        let tree = AdaptiveRadixTree::new();
        for k in [
            "", "r", "ro", "rom", "roma", "romane", "romanus", "romulus", "rubens", "ruber",
            "rubicon", "rubicundus", "x",
        ] {
            tree.insert(k, k.len());
        }
        tree
    }

    #[test]
    fn test_path_iter_yields_ancestors_and_descendants() {
        let tree = sample();
        assert_eq!(
            keys(tree.path_iter("rom")),
            vec!["", "r", "ro", "rom", "roma", "romane", "romanus", "romulus"]
        );
        assert_eq!(
            keys(tree.path_iter("romanesque")),
            vec!["", "r", "ro", "rom", "roma", "romane"]
        );
        assert_eq!(keys(tree.path_iter("rub")), vec![
            "", "r", "rubens", "ruber", "rubicon", "rubicundus"
        ]);
        assert_eq!(keys(tree.path_iter("q")), vec![""]);
        assert_eq!(keys(tree.path_iter("")).len(), tree.len());
    }

    #[test]
    fn test_prefix_iter() {
        let tree = sample();
        assert_eq!(
            keys(tree.prefix_iter("rub")),
            vec!["rubens", "ruber", "rubicon", "rubicundus"]
        );
        assert_eq!(keys(tree.prefix_iter("romanus")), vec!["romanus"]);
        assert_eq!(
            keys(tree.prefix_iter("roman")),
            vec!["romane", "romanus"]
        );
        assert!(keys(tree.prefix_iter("rubx")).is_empty());
        assert!(keys(tree.prefix_iter("romanusz")).is_empty());
        assert_eq!(keys(tree.prefix_iter("")).len(), tree.len());
    }

    #[test]
    fn test_path_iter_is_a_snapshot() {
        let tree = sample();
        let iter = tree.prefix_iter("rub");
        tree.remove("rubens");
        tree.insert("rubella", 7);
        assert_eq!(
            keys(iter),
            vec!["rubens", "ruber", "rubicon", "rubicundus"]
        );
        assert_eq!(
            keys(tree.prefix_iter("rub")),
            vec!["rubella", "ruber", "rubicon", "rubicundus"]
        );
    }
}
