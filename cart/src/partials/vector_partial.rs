use std::cmp::min;
use std::fmt::{Debug, Formatter};

use crate::partials::Partial;

#[derive(Clone, PartialEq, Eq, Default)]
pub struct VectorPartial {
    data: Box<[u8]>,
}

impl VectorPartial {
    pub fn from_slice(src: &[u8]) -> Self {
        Self { data: Box::from(src) }
    }

    pub fn to_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Debug for VectorPartial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.data))
    }
}

impl From<&[u8]> for VectorPartial {
    fn from(src: &[u8]) -> Self {
        Self::from_slice(src)
    }
}

impl AsRef<[u8]> for VectorPartial {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Partial for VectorPartial {
    fn partial_before(&self, length: usize) -> Self {
        assert!(length <= self.data.len());
        VectorPartial::from_slice(&self.data[..length])
    }

    fn partial_after(&self, start: usize) -> Self {
        assert!(start <= self.data.len());
        VectorPartial::from_slice(&self.data[start..])
    }

    fn partial_joined(&self, discriminator: u8, tail: &Self) -> Self {
        let mut data = Vec::with_capacity(self.data.len() + 1 + tail.data.len());
        data.extend_from_slice(&self.data);
        data.push(discriminator);
        data.extend_from_slice(&tail.data);
        Self {
            data: data.into_boxed_slice(),
        }
    }

    #[inline(always)]
    fn at(&self, pos: usize) -> u8 {
        assert!(pos < self.data.len());
        self.data[pos]
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.data.len()
    }

    fn prefix_length_slice(&self, slice: &[u8]) -> usize {
        let len = min(self.data.len(), slice.len());
        self.data[..len]
            .iter()
            .zip(&slice[..len])
            .take_while(|(a, b)| a == b)
            .count()
    }
}
