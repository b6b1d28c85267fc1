use std::fmt::{Display, Formatter};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::mapping::NodeMapping;
use crate::mapping::direct_mapping::DirectMapping;
use crate::mapping::indexed_mapping::IndexedMapping;
use crate::mapping::sorted_keyed_mapping::SortedKeyedMapping;
use crate::partials::Partial;
use crate::partials::vector_partial::VectorPartial;

/// Shared, individually locked handle to a node. Children are held by reference, so cloning a
/// node copies only its own slot table.
pub(crate) type NodeRef<V> = Arc<RwLock<Node<V>>>;

/// The variant a node currently occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Leaf,
    Node4,
    Node16,
    Node48,
    Node256,
}

impl NodeKind {
    /// Maximum number of discriminated children; zero for leaves.
    pub fn capacity(&self) -> usize {
        match self {
            NodeKind::Leaf => 0,
            NodeKind::Node4 => 4,
            NodeKind::Node16 => 16,
            NodeKind::Node48 => 48,
            NodeKind::Node256 => 256,
        }
    }

    /// Smallest child count this class may hold outside the root. Below it the node shrinks.
    pub fn min_children(&self) -> usize {
        match self {
            NodeKind::Leaf | NodeKind::Node4 => 0,
            NodeKind::Node16 => 5,
            NodeKind::Node48 => 17,
            NodeKind::Node256 => 49,
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Where a node sits inside its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Child(u8),
    Terminal,
}

impl Slot {
    /// The slot that continues `key` once `depth` bytes of it have been consumed.
    #[inline]
    pub(crate) fn for_key(key: &[u8], depth: usize) -> Self {
        match key.get(depth) {
            Some(b) => Slot::Child(*b),
            None => Slot::Terminal,
        }
    }
}

#[derive(Clone)]
pub(crate) struct LeafData<V> {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: V,
}

#[derive(Clone)]
pub(crate) enum Content<V> {
    Leaf(LeafData<V>),
    Node4(SortedKeyedMapping<NodeRef<V>, 4>),
    Node16(SortedKeyedMapping<NodeRef<V>, 16>),
    Node48(IndexedMapping<NodeRef<V>, 48>),
    Node256(DirectMapping<NodeRef<V>>),
}

pub(crate) struct Node<V> {
    /// Compressed path segment. A leaf's prefix is whatever remains of its key below the parent.
    pub(crate) prefix: VectorPartial,
    /// Tree version this node was created in. Only nodes of the current version may be
    /// mutated in place.
    pub(crate) version: u64,
    /// Leaf for the key that ends exactly at the end of `prefix`. Always a leaf with an empty
    /// prefix; never present on a leaf.
    pub(crate) terminal: Option<NodeRef<V>>,
    pub(crate) content: Content<V>,
}

impl<V> Node<V> {
    #[inline]
    pub(crate) fn new_leaf(prefix: &[u8], key: &[u8], value: V, version: u64) -> Self {
        Self {
            prefix: VectorPartial::from_slice(prefix),
            version,
            terminal: None,
            content: Content::Leaf(LeafData {
                key: Box::from(key),
                value,
            }),
        }
    }

    #[inline]
    pub(crate) fn new_inner(prefix: VectorPartial, version: u64) -> Self {
        Self::new_4(prefix, version)
    }

    #[inline]
    pub(crate) fn new_4(prefix: VectorPartial, version: u64) -> Self {
        Self::with_content(prefix, version, Content::Node4(SortedKeyedMapping::new()))
    }

    #[cfg(test)]
    pub(crate) fn new_16(prefix: VectorPartial, version: u64) -> Self {
        Self::with_content(prefix, version, Content::Node16(SortedKeyedMapping::new()))
    }

    #[cfg(test)]
    pub(crate) fn new_48(prefix: VectorPartial, version: u64) -> Self {
        Self::with_content(prefix, version, Content::Node48(IndexedMapping::new()))
    }

    #[cfg(test)]
    pub(crate) fn new_256(prefix: VectorPartial, version: u64) -> Self {
        Self::with_content(prefix, version, Content::Node256(DirectMapping::new()))
    }

    fn with_content(prefix: VectorPartial, version: u64, content: Content<V>) -> Self {
        Self {
            prefix,
            version,
            terminal: None,
            content,
        }
    }

    pub(crate) fn into_ref(self) -> NodeRef<V> {
        Arc::new(RwLock::new(self))
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match &self.content {
            Content::Leaf(_) => NodeKind::Leaf,
            Content::Node4(_) => NodeKind::Node4,
            Content::Node16(_) => NodeKind::Node16,
            Content::Node48(_) => NodeKind::Node48,
            Content::Node256(_) => NodeKind::Node256,
        }
    }

    pub(crate) fn leaf(&self) -> Option<&LeafData<V>> {
        let Content::Leaf(leaf) = &self.content else {
            return None;
        };
        Some(leaf)
    }

    pub(crate) fn leaf_mut(&mut self) -> Option<&mut LeafData<V>> {
        let Content::Leaf(leaf) = &mut self.content else {
            return None;
        };
        Some(leaf)
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(&self.content, Content::Leaf(_))
    }

    /// True if this node's prefix is a prefix of `bytes`.
    #[inline]
    pub(crate) fn match_prefix(&self, bytes: &[u8]) -> bool {
        self.prefix.matches_prefix_of(bytes)
    }

    /// Number of discriminated children, not counting the terminal slot.
    pub(crate) fn num_children(&self) -> usize {
        match &self.content {
            Content::Node4(n) => n.num_children(),
            Content::Node16(n) => n.num_children(),
            Content::Node48(n) => n.num_children(),
            Content::Node256(n) => n.num_children(),
            Content::Leaf(_) => 0,
        }
    }

    /// Children plus the terminal slot.
    pub(crate) fn num_entries(&self) -> usize {
        self.num_children() + usize::from(self.terminal.is_some())
    }

    pub(crate) fn seek_child(&self, key: u8) -> Option<&NodeRef<V>> {
        match &self.content {
            Content::Node4(km) => km.seek_child(key),
            Content::Node16(km) => km.seek_child(key),
            Content::Node48(im) => im.seek_child(key),
            Content::Node256(dm) => dm.seek_child(key),
            Content::Leaf(_) => None,
        }
    }

    pub(crate) fn seek_child_mut(&mut self, key: u8) -> Option<&mut NodeRef<V>> {
        match &mut self.content {
            Content::Node4(km) => km.seek_child_mut(key),
            Content::Node16(km) => km.seek_child_mut(key),
            Content::Node48(im) => im.seek_child_mut(key),
            Content::Node256(dm) => dm.seek_child_mut(key),
            Content::Leaf(_) => None,
        }
    }

    pub(crate) fn slot(&self, slot: Slot) -> Option<&NodeRef<V>> {
        match slot {
            Slot::Child(b) => self.seek_child(b),
            Slot::Terminal => self.terminal.as_ref(),
        }
    }

    /// Removes whatever occupies `slot`, shrinking the node if a child was removed.
    pub(crate) fn detach(&mut self, slot: Slot) -> Option<NodeRef<V>> {
        match slot {
            Slot::Child(b) => self.delete_child(b),
            Slot::Terminal => self.terminal.take(),
        }
    }

    /// Adds a child, growing to the next capacity class first if this node is full.
    pub(crate) fn add_child(&mut self, key: u8, node: NodeRef<V>) {
        assert!(
            self.seek_child(key).is_none(),
            "duplicate discriminator {key:#04x}"
        );
        if self.is_full() {
            self.grow();
        }

        match &mut self.content {
            Content::Node4(km) => km.add_child(key, node),
            Content::Node16(km) => km.add_child(key, node),
            Content::Node48(im) => im.add_child(key, node),
            Content::Node256(dm) => dm.add_child(key, node),
            Content::Leaf(_) => unreachable!("add_child on a leaf"),
        }
    }

    /// Removes a child, shrinking to the next smaller class once occupancy drops under the
    /// current class's threshold. A Node4 never shrinks here; collapsing it into its remaining
    /// entry needs the parent and is done by the tree.
    pub(crate) fn delete_child(&mut self, key: u8) -> Option<NodeRef<V>> {
        let node = match &mut self.content {
            Content::Node4(km) => km.delete_child(key),
            Content::Node16(km) => km.delete_child(key),
            Content::Node48(im) => im.delete_child(key),
            Content::Node256(dm) => dm.delete_child(key),
            Content::Leaf(_) => unreachable!("delete_child on a leaf"),
        };
        if node.is_some() && self.num_children() < self.kind().min_children() {
            self.shrink();
        }
        node
    }

    #[inline]
    fn is_full(&self) -> bool {
        match &self.content {
            Content::Node4(km) => km.is_full(),
            Content::Node16(km) => km.is_full(),
            Content::Node48(im) => im.is_full(),
            Content::Node256(dm) => dm.is_full(),
            Content::Leaf(_) => unreachable!("is_full on a leaf"),
        }
    }

    fn shrink(&mut self) {
        let from = self.kind();
        self.content = match &mut self.content {
            Content::Node16(km) => Content::Node4(SortedKeyedMapping::from_mapping(km)),
            Content::Node48(im) => Content::Node16(SortedKeyedMapping::from_mapping(im)),
            Content::Node256(dm) => Content::Node48(IndexedMapping::from_mapping(dm)),
            Content::Node4(_) | Content::Leaf(_) => unreachable!("cannot shrink a {from}"),
        };
        trace!(%from, to = %self.kind(), prefix = ?self.prefix, "shrink");
    }

    fn grow(&mut self) {
        let from = self.kind();
        self.content = match &mut self.content {
            Content::Node4(km) => Content::Node16(SortedKeyedMapping::from_mapping(km)),
            Content::Node16(km) => Content::Node48(IndexedMapping::from_mapping(km)),
            Content::Node48(im) => Content::Node256(DirectMapping::from_mapping(im)),
            Content::Node256(_) | Content::Leaf(_) => unreachable!("cannot grow a {from}"),
        };
        trace!(%from, to = %self.kind(), prefix = ?self.prefix, "grow");
    }

    /// Children in ascending discriminator order.
    pub(crate) fn iter(&self) -> Box<dyn DoubleEndedIterator<Item = (u8, &NodeRef<V>)> + '_> {
        match &self.content {
            Content::Node4(n) => Box::new(n.iter()),
            Content::Node16(n) => Box::new(n.iter()),
            Content::Node48(n) => Box::new(n.iter()),
            Content::Node256(n) => Box::new(n.iter()),
            Content::Leaf(_) => Box::new(std::iter::empty()),
        }
    }
}

impl<V: Clone> Node<V> {
    /// Shallow copy stamped with `version`. Children are shared with the original.
    pub(crate) fn cow_clone(&self, version: u64) -> Self {
        trace!(kind = %self.kind(), from = self.version, to = version, "copy-on-write");
        self.with_prefix(self.prefix.clone(), version)
    }

    /// Shallow copy carrying a different prefix.
    pub(crate) fn with_prefix(&self, prefix: VectorPartial, version: u64) -> Self {
        Self {
            prefix,
            version,
            terminal: self.terminal.clone(),
            content: self.content.clone(),
        }
    }
}
