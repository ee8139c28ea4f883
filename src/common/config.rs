//! Layout and allocation constants for slotbase.

/// Size of a page in bytes (4KB).
///
/// Every page kind (heap, B-tree leaf, B-tree internal) shares this size.
/// Slot offsets are stored as `u16`, so the page size must stay below 64KB.
pub const PAGE_SIZE: usize = 4096;

/// Number of pages grouped into one extent by the allocator.
pub const EXTENT_SIZE: u32 = 16;

/// Default extent fill factor (percent of an extent that may be allocated).
pub const DEFAULT_FILL_FACTOR: u8 = 100;

/// Byte alignment applied to object payloads and key bytes.
pub const ALIGNMENT: usize = 4;

/// Maximum length of an encoded B-tree key in bytes.
///
/// Leaves at least three maximal entries per B-tree page so that a split
/// always leaves both halves non-empty.
pub const MAX_KEY_LEN: usize = 1000;

/// Free-space thresholds (percent of a page's data area) of the avail buckets.
///
/// Bucket `i` holds pages with at least `AVAIL_THRESHOLDS[i]` percent free.
pub const AVAIL_THRESHOLDS: [usize; 5] = [10, 20, 30, 40, 50];

/// Round `len` up to the next multiple of [`ALIGNMENT`].
#[inline]
pub const fn aligned_len(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert!(PAGE_SIZE <= u16::MAX as usize);
    }

    #[test]
    fn test_aligned_len() {
        assert_eq!(aligned_len(0), 0);
        assert_eq!(aligned_len(1), 4);
        assert_eq!(aligned_len(4), 4);
        assert_eq!(aligned_len(5), 8);
    }

    #[test]
    fn test_thresholds_ascending() {
        assert!(AVAIL_THRESHOLDS.windows(2).all(|w| w[0] < w[1]));
    }
}
