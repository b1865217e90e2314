// Tue Jan 13 2026 - Alex

use crate::layout::align_to;
use std::fmt;

/// Physical packing facts of a layout node.
///
/// `stride` is present iff the node has a fixed physical size and can be stored densely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Traits {
    pub align: usize,
    pub size: usize,
    pub stride: Option<usize>,
}

impl Traits {
    pub fn new(align: usize, size: usize, stride: Option<usize>) -> Self {
        Self { align, size, stride }
    }

    /// Numeric kinds: align, size and stride all equal.
    pub fn fixed(size: usize) -> Self {
        Self::new(size, size, Some(size))
    }

    /// Fixed-size slot with a dense stride rounded up to the alignment.
    pub fn dense(align: usize, size: usize) -> Self {
        Self::new(align, size, Some(align_to(size, align)))
    }

    /// Header slot whose payload lives out of line.
    pub fn variable(align: usize, size: usize) -> Self {
        Self::new(align, size, None)
    }

    pub fn is_fixed(&self) -> bool {
        self.stride.is_some()
    }
}

impl fmt::Display for Traits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stride {
            Some(stride) => write!(f, "{{align={} size={} stride={}}}", self.align, self.size, stride),
            None => write!(f, "{{align={} size={}}}", self.align, self.size),
        }
    }
}
