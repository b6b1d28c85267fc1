use crate::mapping::NodeMapping;

/// Node256 storage: one slot per possible byte.
#[derive(Clone)]
pub struct DirectMapping<N> {
    children: Box<[Option<N>; 256]>,
    num_children: usize,
}

impl<N> Default for DirectMapping<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> DirectMapping<N> {
    pub fn new() -> Self {
        Self {
            children: Box::new(std::array::from_fn(|_| None)),
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
        self.children
            .iter()
            .enumerate()
            .filter_map(|(key, child)| child.as_ref().map(|c| (key as u8, c)))
    }
}

impl<N> NodeMapping<N, 256> for DirectMapping<N> {
    #[inline]
    fn add_child(&mut self, key: u8, node: N) {
        let slot = &mut self.children[key as usize];
        debug_assert!(slot.is_none());
        *slot = Some(node);
        self.num_children += 1;
    }

    #[inline]
    fn seek_child(&self, key: u8) -> Option<&N> {
        self.children[key as usize].as_ref()
    }

    #[inline]
    fn seek_child_mut(&mut self, key: u8) -> Option<&mut N> {
        self.children[key as usize].as_mut()
    }

    #[inline]
    fn delete_child(&mut self, key: u8) -> Option<N> {
        let n = self.children[key as usize].take();
        if n.is_some() {
            self.num_children -= 1;
        }
        n
    }

    #[inline]
    fn num_children(&self) -> usize {
        self.num_children
    }

    fn move_into<const OTHER: usize, M: NodeMapping<N, OTHER>>(&mut self, other: &mut M) {
        for (key, slot) in self.children.iter_mut().enumerate() {
            if let Some(child) = slot.take() {
                other.add_child(key as u8, child);
            }
        }
        self.num_children = 0;
    }
}
