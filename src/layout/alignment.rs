// Tue Jan 13 2026 - Alex

/// Width of every stored offset, count and string length.
pub const POINTER_WIDTH: usize = 4;

/// Rounds `offset` up to the next multiple of `align`, which must be a power of two.
pub fn align_to(offset: usize, align: usize) -> usize {
    debug_assert!(align > 0 && align.is_power_of_two());
    (offset + align - 1) & !(align - 1)
}

pub fn is_aligned(offset: usize, align: usize) -> bool {
    offset % align == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(0, 4), 0);
        assert_eq!(align_to(5, 4), 8);
        assert_eq!(align_to(7, 1), 7);
        assert_eq!(align_to(9, 8), 16);
        assert!(is_aligned(16, 8));
        assert!(!is_aligned(6, 4));
    }
}
