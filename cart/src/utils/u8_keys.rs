//! Discriminator-byte search over the sorted key arrays used by Node4 and Node16.
//!
//! Keys occupy `keys[..num_children]` in ascending order; slots past `num_children`
//! hold garbage and are never matched.

#[cfg(all(feature = "simd_keys", target_arch = "x86_64", target_feature = "sse2"))]
#[inline]
fn sse2_match_mask_16(key: u8, keys: &[u8; 16], num_children: usize) -> (i32, i32) {
    use std::arch::x86_64::{
        __m128i, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_max_epu8, _mm_movemask_epi8,
        _mm_set1_epi8,
    };

    let live = ((1u32 << num_children) - 1) as i32;
    // SAFETY: sse2 is statically enabled and `keys` is exactly 16 readable bytes.
    unsafe {
        let needle = _mm_set1_epi8(key as i8);
        let haystack = _mm_loadu_si128(keys.as_ptr() as *const __m128i);
        let equal = _mm_movemask_epi8(_mm_cmpeq_epi8(needle, haystack)) & live;
        // Unsigned `haystack > needle` is `max(haystack, needle) == haystack && !equal`.
        let not_less = _mm_movemask_epi8(_mm_cmpeq_epi8(_mm_max_epu8(haystack, needle), haystack));
        (equal, not_less & !equal & live)
    }
}

fn binary_find_key(key: u8, keys: &[u8]) -> Option<usize> {
    keys.binary_search(&key).ok()
}

/// Position of `key` among the first `num_children` sorted keys.
#[allow(unreachable_code)]
pub fn u8_keys_find_key_position_sorted<const WIDTH: usize>(
    key: u8,
    keys: &[u8; WIDTH],
    num_children: usize,
) -> Option<usize> {
    debug_assert!(num_children <= WIDTH);
    if WIDTH <= 4 {
        return keys[..num_children].iter().position(|k| *k == key);
    }

    #[cfg(all(feature = "simd_keys", target_arch = "x86_64", target_feature = "sse2"))]
    if WIDTH == 16 {
        let keys: &[u8; 16] = keys[..].try_into().expect("width checked above");
        let (equal, _) = sse2_match_mask_16(key, keys, num_children);
        return (equal != 0).then(|| equal.trailing_zeros() as usize);
    }

    binary_find_key(key, &keys[..num_children])
}

/// Position at which `key` would be inserted to keep the first `num_children` keys sorted.
#[allow(unreachable_code)]
pub fn u8_keys_find_insert_position<const WIDTH: usize>(
    key: u8,
    keys: &[u8; WIDTH],
    num_children: usize,
) -> usize {
    debug_assert!(num_children <= WIDTH);

    #[cfg(all(feature = "simd_keys", target_arch = "x86_64", target_feature = "sse2"))]
    if WIDTH == 16 {
        let keys: &[u8; 16] = keys[..].try_into().expect("width checked above");
        let (_, greater) = sse2_match_mask_16(key, keys, num_children);
        return if greater != 0 {
            greater.trailing_zeros() as usize
        } else {
            num_children
        };
    }

    keys[..num_children].partition_point(|k| *k < key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_keys<const W: usize>(src: &[u8]) -> [u8; W] {
        let mut keys = [0xAA; W];
        keys[..src.len()].copy_from_slice(src);
        keys
    }

    #[test]
    fn test_find_key_width_4() {
        let keys = sorted_keys::<4>(&[1, 7, 200]);
        assert_eq!(u8_keys_find_key_position_sorted(7, &keys, 3), Some(1));
        assert_eq!(u8_keys_find_key_position_sorted(200, &keys, 3), Some(2));
        assert_eq!(u8_keys_find_key_position_sorted(2, &keys, 3), None);
        // Garbage past num_children must not match.
        assert_eq!(u8_keys_find_key_position_sorted(0xAA, &keys, 3), None);
    }

    #[test]
    fn test_find_key_width_16() {
        let src: Vec<u8> = (0..12).map(|i| i * 20).collect();
        let keys = sorted_keys::<16>(&src);
        for (i, k) in src.iter().enumerate() {
            assert_eq!(u8_keys_find_key_position_sorted(*k, &keys, src.len()), Some(i));
        }
        assert_eq!(u8_keys_find_key_position_sorted(21, &keys, src.len()), None);
        assert_eq!(u8_keys_find_key_position_sorted(0xAA, &keys, src.len()), None);
        assert_eq!(u8_keys_find_key_position_sorted(0, &keys, 0), None);
    }

    #[test]
    fn test_insert_position_keeps_order() {
        let keys = sorted_keys::<16>(&[3, 10, 128, 250]);
        assert_eq!(u8_keys_find_insert_position(0, &keys, 4), 0);
        assert_eq!(u8_keys_find_insert_position(5, &keys, 4), 1);
        assert_eq!(u8_keys_find_insert_position(129, &keys, 4), 3);
        assert_eq!(u8_keys_find_insert_position(255, &keys, 4), 4);
        assert_eq!(u8_keys_find_insert_position(255, &keys, 0), 0);

        let keys = sorted_keys::<4>(&[3, 10]);
        assert_eq!(u8_keys_find_insert_position(7, &keys, 2), 1);
        assert_eq!(u8_keys_find_insert_position(11, &keys, 2), 2);
    }
}
