use crate::mapping::NodeMapping;
use crate::utils::bitset::Bitset64;

const EMPTY: u8 = 0xFF;

// A 256-entry key index into a compact array of up to WIDTH children (Node48).
// Child slots are handed out from an occupancy bitset, so the order of `children` is arbitrary;
// key order comes from walking the index.
#[derive(Clone)]
pub struct IndexedMapping<N, const WIDTH: usize> {
    child_ptr_indexes: Box<[u8; 256]>,
    children: Box<[Option<N>; WIDTH]>,
    occupied: Bitset64<1>,
    num_children: u8,
}

impl<N, const WIDTH: usize> Default for IndexedMapping<N, WIDTH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, const WIDTH: usize> IndexedMapping<N, WIDTH> {
    pub fn new() -> Self {
        const { assert!(WIDTH <= 64) };
        Self {
            child_ptr_indexes: Box::new([EMPTY; 256]),
            children: Box::new(std::array::from_fn(|_| None)),
            occupied: Bitset64::new(),
            num_children: 0,
        }
    }

    pub fn from_mapping<const OTHER: usize, M: NodeMapping<N, OTHER>>(other: &mut M) -> Self {
        let mut new = Self::new();
        other.move_into(&mut new);
        new
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (u8, &N)> {
        self.child_ptr_indexes
            .iter()
            .enumerate()
            .filter(|(_, pos)| **pos != EMPTY)
            .map(|(key, pos)| {
                let child = self.children[*pos as usize].as_ref().expect("indexed slot");
                (key as u8, child)
            })
    }
}

impl<N, const WIDTH: usize> NodeMapping<N, WIDTH> for IndexedMapping<N, WIDTH> {
    fn add_child(&mut self, key: u8, node: N) {
        assert!((self.num_children as usize) < WIDTH, "add_child on full mapping");
        debug_assert_eq!(self.child_ptr_indexes[key as usize], EMPTY);
        let pos = self.occupied.first_empty().expect("free slot below width");
        self.occupied.set(pos);
        self.child_ptr_indexes[key as usize] = pos as u8;
        self.children[pos] = Some(node);
        self.num_children += 1;
    }

    fn seek_child(&self, key: u8) -> Option<&N> {
        match self.child_ptr_indexes[key as usize] {
            EMPTY => None,
            pos => self.children[pos as usize].as_ref(),
        }
    }

    fn seek_child_mut(&mut self, key: u8) -> Option<&mut N> {
        match self.child_ptr_indexes[key as usize] {
            EMPTY => None,
            pos => self.children[pos as usize].as_mut(),
        }
    }

    fn delete_child(&mut self, key: u8) -> Option<N> {
        let pos = std::mem::replace(&mut self.child_ptr_indexes[key as usize], EMPTY);
        if pos == EMPTY {
            return None;
        }
        self.occupied.unset(pos as usize);
        self.num_children -= 1;
        self.children[pos as usize].take()
    }

    fn num_children(&self) -> usize {
        self.num_children as usize
    }

    fn move_into<const OTHER: usize, M: NodeMapping<N, OTHER>>(&mut self, other: &mut M) {
        for key in 0..=255u8 {
            if let Some(child) = self.delete_child(key) {
                other.add_child(key, child);
            }
        }
    }
}
