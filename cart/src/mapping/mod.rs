pub mod direct_mapping;
pub mod indexed_mapping;
pub mod sorted_keyed_mapping;

/// A map from discriminator byte to child, with a fixed capacity.
///
/// Iteration over every implementation is in ascending key order.
pub trait NodeMapping<N, const NUM_CHILDREN: usize> {
    /// Adds a child under `key`. The key must be absent and the mapping must not be full.
    fn add_child(&mut self, key: u8, node: N);
    fn seek_child(&self, key: u8) -> Option<&N>;
    fn seek_child_mut(&mut self, key: u8) -> Option<&mut N>;
    fn delete_child(&mut self, key: u8) -> Option<N>;
    fn num_children(&self) -> usize;
    fn width(&self) -> usize {
        NUM_CHILDREN
    }
    fn is_full(&self) -> bool {
        self.num_children() >= self.width()
    }
    /// Moves every child into `other`, leaving `self` empty.
    fn move_into<const OTHER: usize, M: NodeMapping<N, OTHER>>(&mut self, other: &mut M);
}
