use num_traits::PrimInt;

/// Fixed-capacity occupancy bitmap, stored as `STORAGE_WIDTH` words of `StorageType`.
/// `SHIFT` must be log2 of the word's bit width.
#[derive(Clone)]
pub struct Bitset<StorageType, const SHIFT: usize, const STORAGE_WIDTH: usize>
where
    StorageType: PrimInt,
{
    words: [StorageType; STORAGE_WIDTH],
}

impl<StorageType, const SHIFT: usize, const STORAGE_WIDTH: usize>
    Bitset<StorageType, SHIFT, STORAGE_WIDTH>
where
    StorageType: PrimInt,
{
    const WORD_BITS: usize = 1 << SHIFT;

    pub fn new() -> Self {
        Self {
            words: [StorageType::zero(); STORAGE_WIDTH],
        }
    }

    #[inline]
    fn locate(pos: usize) -> (usize, StorageType) {
        assert!(pos < Self::WORD_BITS * STORAGE_WIDTH, "bit {pos} out of range");
        (pos >> SHIFT, StorageType::one() << (pos & (Self::WORD_BITS - 1)))
    }

    /// Lowest unset bit, if any.
    pub fn first_empty(&self) -> Option<usize> {
        self.words.iter().enumerate().find_map(|(i, w)| {
            (*w != StorageType::max_value()).then(|| (i << SHIFT) + (!*w).trailing_zeros() as usize)
        })
    }

    #[inline]
    pub fn set(&mut self, pos: usize) {
        let (word, mask) = Self::locate(pos);
        self.words[word] = self.words[word] | mask;
    }

    #[inline]
    pub fn unset(&mut self, pos: usize) {
        let (word, mask) = Self::locate(pos);
        self.words[word] = self.words[word] & !mask;
    }
}

impl<StorageType, const SHIFT: usize, const STORAGE_WIDTH: usize> Default
    for Bitset<StorageType, SHIFT, STORAGE_WIDTH>
where
    StorageType: PrimInt,
{
    fn default() -> Self {
        Self::new()
    }
}

pub type Bitset64<const STORAGE_WIDTH_U64: usize> = Bitset<u64, 6, STORAGE_WIDTH_U64>;
