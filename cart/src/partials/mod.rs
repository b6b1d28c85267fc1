pub mod vector_partial;

/// A compressed path segment stored on a node.
///
/// Partials are immutable once attached to a node; splitting or merging a path produces fresh
/// partials and a fresh node to carry them.
pub trait Partial: AsRef<[u8]> + Sized {
    /// Returns a partial of the first `length` bytes.
    fn partial_before(&self, length: usize) -> Self;
    /// Returns a partial of the bytes from `start` onwards.
    fn partial_after(&self, start: usize) -> Self;
    /// Returns `self`, then `discriminator`, then `tail` as one partial.
    fn partial_joined(&self, discriminator: u8, tail: &Self) -> Self;
    /// Returns the byte at `pos`.
    fn at(&self, pos: usize) -> u8;
    /// Returns the length of the partial.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Returns the length of the common prefix between `self` and `slice`.
    fn prefix_length_slice(&self, slice: &[u8]) -> usize;

    /// True if `slice` begins with the whole of this partial.
    fn matches_prefix_of(&self, slice: &[u8]) -> bool {
        slice.starts_with(self.as_ref())
    }
}
