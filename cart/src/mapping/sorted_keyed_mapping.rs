use crate::mapping::NodeMapping;
use crate::utils::u8_keys::{u8_keys_find_insert_position, u8_keys_find_key_position_sorted};

/// Maps a key to a node, using a sorted array of keys and a parallel array of children.
/// Used for Node4 and Node16. Lookups are a linear scan at width 4 and a SIMD compare (or binary
/// search) at width 16; inserts and deletes shift the tail to keep both arrays sorted.
#[derive(Clone)]
pub struct SortedKeyedMapping<N, const WIDTH: usize> {
    keys: [u8; WIDTH],
    children: [Option<N>; WIDTH],
    num_children: u8,
}

impl<N, const WIDTH: usize> Default for SortedKeyedMapping<N, WIDTH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, const WIDTH: usize> SortedKeyedMapping<N, WIDTH> {
    #[inline]
    pub fn new() -> Self {
        Self {
            keys: [255; WIDTH],
            children: std::array::from_fn(|_| None),
            num_children: 0,
        }
    }

    pub fn from_mapping<const OTHER: usize, M: NodeMapping<N, OTHER>>(other: &mut M) -> Self {
        let mut new = Self::new();
        other.move_into(&mut new);
        new
    }

    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (u8, &N)> {
        self.keys[..self.num_children as usize]
            .iter()
            .zip(&self.children[..self.num_children as usize])
            .map(|(k, c)| (*k, c.as_ref().expect("occupied slot")))
    }
}

impl<N, const WIDTH: usize> NodeMapping<N, WIDTH> for SortedKeyedMapping<N, WIDTH> {
    #[inline]
    fn add_child(&mut self, key: u8, node: N) {
        let len = self.num_children as usize;
        assert!(len < WIDTH, "add_child on full mapping");
        let idx = u8_keys_find_insert_position::<WIDTH>(key, &self.keys, len);
        debug_assert!(idx == len || self.keys[idx] != key);

        self.keys.copy_within(idx..len, idx + 1);
        self.children[idx..=len].rotate_right(1);
        self.keys[idx] = key;
        self.children[idx] = Some(node);
        self.num_children += 1;
    }

    fn seek_child(&self, key: u8) -> Option<&N> {
        let idx =
            u8_keys_find_key_position_sorted::<WIDTH>(key, &self.keys, self.num_children as usize)?;
        self.children[idx].as_ref()
    }

    fn seek_child_mut(&mut self, key: u8) -> Option<&mut N> {
        let idx =
            u8_keys_find_key_position_sorted::<WIDTH>(key, &self.keys, self.num_children as usize)?;
        self.children[idx].as_mut()
    }

    fn delete_child(&mut self, key: u8) -> Option<N> {
        let len = self.num_children as usize;
        let idx = u8_keys_find_key_position_sorted::<WIDTH>(key, &self.keys, len)?;
        let old = self.children[idx].take();

        self.keys.copy_within(idx + 1..len, idx);
        self.children[idx..len].rotate_left(1);
        self.keys[len - 1] = 255;
        self.num_children -= 1;
        old
    }

    #[inline(always)]
    fn num_children(&self) -> usize {
        self.num_children as usize
    }

    fn move_into<const OTHER: usize, M: NodeMapping<N, OTHER>>(&mut self, other: &mut M) {
        for i in 0..self.num_children as usize {
            let child = self.children[i].take().expect("occupied slot");
            other.add_child(self.keys[i], child);
            self.keys[i] = 255;
        }
        self.num_children = 0;
    }
}
