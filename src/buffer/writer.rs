// Fri Jan 16 2026 - Alex

use crate::buffer::{BufferError, BufferView};
use bytes::Bytes;

/// Growable target of a single forward writer pass.
///
/// Every `set_*` grows the block with zeroes on demand, so bytes that a writer skips (padding,
/// absent inline optionals) are always zero.
pub struct ViewWriter {
    bytes: Vec<u8>,
    limit: usize,
}

macro_rules! write_lane {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, offset: usize, value: $ty) -> Result<(), BufferError> {
            let raw = value.to_le_bytes();
            self.put_bytes(offset, &raw)
        }
    };
}

impl ViewWriter {
    pub fn new() -> Self {
        Self::with_limits(0, usize::MAX)
    }

    pub fn with_limits(initial_capacity: usize, limit: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(initial_capacity.min(limit)),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn reserve_to(&mut self, end: usize) -> Result<(), BufferError> {
        if end > self.limit {
            return Err(BufferError::CapacityExceeded {
                requested: end,
                limit: self.limit,
            });
        }
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        Ok(())
    }

    pub fn put_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), BufferError> {
        let end = offset.checked_add(data.len()).ok_or(BufferError::CapacityExceeded {
            requested: usize::MAX,
            limit: self.limit,
        })?;
        self.reserve_to(end)?;
        self.bytes[offset..end].copy_from_slice(data);
        Ok(())
    }

    write_lane!(set_int8, i8);
    write_lane!(set_uint8, u8);
    write_lane!(set_int16, i16);
    write_lane!(set_uint16, u16);
    write_lane!(set_int32, i32);
    write_lane!(set_uint32, u32);
    write_lane!(set_double, f64);

    /// Ends the pass. The block is cut (or zero-extended) to `end`, the final heap cursor.
    pub fn finish(mut self, end: usize) -> Bytes {
        self.bytes.resize(end, 0);
        Bytes::from(self.bytes)
    }

    pub fn freeze(self, end: usize) -> BufferView {
        BufferView::new(self.finish(end))
    }
}

impl Default for ViewWriter {
    fn default() -> Self {
        Self::new()
    }
}
