//! Structural verification.
//!
//! [`check_structure`] walks a whole tree and reports the first broken structural property.
//! It backs [`AdaptiveRadixTree::check_invariants`](crate::AdaptiveRadixTree::check_invariants),
//! which the property tests and fuzz targets call after every batch of operations.

use thiserror::Error;

use crate::node::{NodeKind, NodeRef};
use crate::partials::Partial;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{kind} at path {path:?} holds {children} children, outside its capacity class")]
    CapacityClass {
        path: Vec<u8>,
        kind: NodeKind,
        children: usize,
    },
    #[error("children of the node at path {path:?} are not in ascending discriminator order")]
    UnorderedChildren { path: Vec<u8> },
    #[error("leaf for key {key:?} sits at path {path:?}")]
    MisplacedLeaf { path: Vec<u8>, key: Vec<u8> },
    #[error("terminal slot at path {path:?} does not hold a leaf with an empty prefix")]
    InnerTerminal { path: Vec<u8> },
    #[error("{position} node at path {path:?} has {entries} entries")]
    EmptyNode {
        path: Vec<u8>,
        position: &'static str,
        entries: usize,
    },
    #[error("tree reports {reported} keys but holds {found}")]
    LengthMismatch { reported: usize, found: usize },
}

/// Checks the tree rooted at `root` against every structural invariant, and `len` against the
/// number of leaves found.
///
/// Per inner node: child count within its capacity class (the lower bound being the shrink
/// threshold), children strictly ordered, terminal slot holding only a leaf with an empty prefix,
/// and at least two entries below the root (one at the root). Per leaf: stored key equal to the
/// bytes on the path to it.
pub(crate) fn check_structure<V>(
    root: Option<&NodeRef<V>>,
    len: usize,
) -> Result<(), InvariantViolation> {
    let mut found = 0;
    let mut stack: Vec<(NodeRef<V>, Vec<u8>, bool)> =
        root.map(|r| (r.clone(), Vec::new(), true)).into_iter().collect();

    while let Some((node, mut path, is_root)) = stack.pop() {
        let node = node.read();
        path.extend_from_slice(node.prefix.as_ref());

        if let Some(leaf) = node.leaf() {
            if *leaf.key != *path {
                return Err(InvariantViolation::MisplacedLeaf {
                    path,
                    key: leaf.key.to_vec(),
                });
            }
            found += 1;
            continue;
        }

        let kind = node.kind();
        let children = node.num_children();
        if children > kind.capacity() || children < kind.min_children() {
            return Err(InvariantViolation::CapacityClass {
                path,
                kind,
                children,
            });
        }
        let min_entries = if is_root { 1 } else { 2 };
        if node.num_entries() < min_entries {
            return Err(InvariantViolation::EmptyNode {
                path,
                position: if is_root { "root" } else { "inner" },
                entries: node.num_entries(),
            });
        }
        let keys: Vec<u8> = node.iter().map(|(k, _)| k).collect();
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(InvariantViolation::UnorderedChildren { path });
        }

        if let Some(terminal) = &node.terminal {
            let t = terminal.read();
            if !t.is_leaf() || !t.prefix.is_empty() {
                return Err(InvariantViolation::InnerTerminal { path });
            }
            stack.push((terminal.clone(), path.clone(), false));
        }
        for (b, child) in node.iter() {
            let mut child_path = path.clone();
            child_path.push(b);
            stack.push((child.clone(), child_path, false));
        }
    }

    if found != len {
        return Err(InvariantViolation::LengthMismatch {
            reported: len,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::invariants::{InvariantViolation, check_structure};
    use crate::node::{Node, NodeKind};
    use crate::partials::vector_partial::VectorPartial;

    fn leaf(prefix: &[u8], key: &[u8]) -> Node<u8> {
        Node::new_leaf(prefix, key, 0, 0)
    }

    #[test]
    fn test_well_formed() {
        let mut root = Node::new_4(VectorPartial::from_slice(b"a"), 0);
        root.terminal = Some(leaf(b"", b"a").into_ref());
        root.add_child(b'b', leaf(b"", b"ab").into_ref());
        root.add_child(b'c', leaf(b"de", b"acde").into_ref());
        let root = root.into_ref();
        assert_eq!(check_structure(Some(&root), 3), Ok(()));
        assert_eq!(
            check_structure(Some(&root), 4),
            Err(InvariantViolation::LengthMismatch {
                reported: 4,
                found: 3
            })
        );
        assert_eq!(check_structure::<u8>(None, 0), Ok(()));
    }

    #[test]
    fn test_misplaced_leaf() {
        let mut root = Node::new_4(VectorPartial::default(), 0);
        root.add_child(b'x', leaf(b"", b"y").into_ref());
        let err = check_structure(Some(&root.into_ref()), 1).unwrap_err();
        assert_eq!(
            err,
            InvariantViolation::MisplacedLeaf {
                path: b"x".to_vec(),
                key: b"y".to_vec()
            }
        );
    }

    #[test]
    fn test_single_entry_inner_node() {
        let mut inner = Node::new_4(VectorPartial::from_slice(b"b"), 0);
        inner.add_child(b'c', leaf(b"", b"abc").into_ref());
        let mut root = Node::new_4(VectorPartial::default(), 0);
        root.add_child(b'a', inner.into_ref());
        root.add_child(b'z', leaf(b"", b"z").into_ref());
        let err = check_structure(Some(&root.into_ref()), 2).unwrap_err();
        assert!(matches!(err, InvariantViolation::EmptyNode { entries: 1, .. }));
    }

    #[test]
    fn test_underfull_class() {
        let mut root = Node::new_16(VectorPartial::default(), 0);
        for k in [b'a', b'b', b'c'] {
            root.add_child(k, leaf(b"", &[k]).into_ref());
        }
        let err = check_structure(Some(&root.into_ref()), 3).unwrap_err();
        assert_eq!(
            err,
            InvariantViolation::CapacityClass {
                path: vec![],
                kind: NodeKind::Node16,
                children: 3
            }
        );
        assert!(err.to_string().contains("Node16"));
    }

    #[test]
    fn test_inner_node_in_terminal_slot() {
        let mut inner = Node::new_4(VectorPartial::default(), 0);
        inner.add_child(b'q', leaf(b"", b"q").into_ref());
        inner.add_child(b'r', leaf(b"", b"r").into_ref());
        let mut root = Node::new_4(VectorPartial::default(), 0);
        root.terminal = Some(inner.into_ref());
        root.add_child(b's', leaf(b"", b"s").into_ref());
        let err = check_structure(Some(&root.into_ref()), 3).unwrap_err();
        assert_eq!(err, InvariantViolation::InnerTerminal { path: vec![] });
    }
}
