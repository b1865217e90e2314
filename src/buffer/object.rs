// Fri Jan 16 2026 - Alex

use crate::buffer::{BufferError, BufferView};
use parking_lot::RwLock;

/// Base identity of an overlay instance: a buffer plus the byte offset of its struct.
///
/// Raw access is crate-private so only the overlay machinery can reach into the buffer.
pub struct BufferObject {
    view: RwLock<BufferView>,
    offset: usize,
}

impl BufferObject {
    pub fn new(view: BufferView, offset: usize) -> Self {
        Self {
            view: RwLock::new(view),
            offset,
        }
    }

    /// An object that has never been populated. Every field reads as zero.
    pub fn null() -> Self {
        Self::new(BufferView::null(), 0)
    }

    pub(crate) fn check(&self) -> Result<(), BufferError> {
        if self.view.read().is_detached() {
            return Err(BufferError::Detached);
        }
        Ok(())
    }

    /// Drops this object's hold on its buffer. Other objects over the same buffer are unaffected.
    pub(crate) fn detach(&self) {
        *self.view.write() = BufferView::detached();
    }

    pub(crate) fn buffer(&self) -> BufferView {
        self.view.read().clone()
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_is_per_object() {
        let view = BufferView::new(vec![7u8; 4]);
        let first = BufferObject::new(view.clone(), 0);
        let second = BufferObject::new(view, 2);
        first.detach();
        assert_eq!(first.check(), Err(BufferError::Detached));
        assert!(second.check().is_ok());
        assert_eq!(second.buffer().uint8(second.offset()).unwrap(), 7);
    }
}
