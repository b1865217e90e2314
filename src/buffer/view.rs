// Fri Jan 16 2026 - Alex

use crate::buffer::BufferError;
use bytes::Bytes;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const LIVE: u8 = 0;
const DETACHED: u8 = 1;
const NULL: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Live,
    /// Every access fails.
    Detached,
    /// Every numeric access reads zero.
    Null,
}

/// Read-only multiplexed view over one memory block.
///
/// The seven numeric lanes (`int8`, `uint8`, `int16`, `uint16`, `int32`, `uint32`, `double`)
/// all address the same little-endian bytes by byte offset. Clones share both the bytes and the
/// lifecycle state, so detaching one clone traps access through all of them. The bytes are never
/// mutated, which is what makes handing a view to other threads free of coordination.
#[derive(Clone)]
pub struct BufferView {
    bytes: Bytes,
    state: Arc<AtomicU8>,
}

macro_rules! read_lane {
    ($name:ident, $ty:ty) => {
        pub fn $name(&self, offset: usize) -> Result<$ty, BufferError> {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            match self.lane(offset, WIDTH)? {
                Some(raw) => {
                    let mut le = [0u8; WIDTH];
                    le.copy_from_slice(raw);
                    Ok(<$ty>::from_le_bytes(le))
                }
                None => Ok(<$ty>::default()),
            }
        }
    };
}

impl BufferView {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self::with_state(bytes.into(), LIVE)
    }

    /// A view where every index reads as zero. Backs freshly constructed overlays.
    pub fn null() -> Self {
        Self::with_state(Bytes::new(), NULL)
    }

    /// A view that was never attached to memory.
    pub fn detached() -> Self {
        Self::with_state(Bytes::new(), DETACHED)
    }

    fn with_state(bytes: Bytes, state: u8) -> Self {
        Self {
            bytes,
            state: Arc::new(AtomicU8::new(state)),
        }
    }

    pub fn state(&self) -> ViewState {
        match self.state.load(Ordering::Acquire) {
            DETACHED => ViewState::Detached,
            NULL => ViewState::Null,
            _ => ViewState::Live,
        }
    }

    /// Permanently invalidates this view and every clone of it.
    pub fn detach(&self) {
        self.state.store(DETACHED, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.state() == ViewState::Detached
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `Ok(None)` means the view is nulled and the caller should produce zero.
    fn lane(&self, offset: usize, len: usize) -> Result<Option<&[u8]>, BufferError> {
        match self.state() {
            ViewState::Detached => {
                log::warn!("Access to detached buffer view at offset {}", offset);
                Err(BufferError::Detached)
            }
            ViewState::Null => Ok(None),
            ViewState::Live => {
                let end = offset.checked_add(len).filter(|end| *end <= self.bytes.len());
                match end {
                    Some(end) => Ok(Some(&self.bytes[offset..end])),
                    None => Err(BufferError::OutOfBounds {
                        offset,
                        len,
                        size: self.bytes.len(),
                    }),
                }
            }
        }
    }

    read_lane!(int8, i8);
    read_lane!(uint8, u8);
    read_lane!(int16, i16);
    read_lane!(uint16, u16);
    read_lane!(int32, i32);
    read_lane!(uint32, u32);
    read_lane!(double, f64);

    /// Fails unless `len` bytes starting at `offset` are addressable.
    pub fn ensure(&self, offset: usize, len: usize) -> Result<(), BufferError> {
        self.lane(offset, len).map(|_| ())
    }

    /// Zero-copy slice of the underlying bytes.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Bytes, BufferError> {
        match self.lane(offset, len)? {
            Some(_) => Ok(self.bytes.slice(offset..offset + len)),
            None => Ok(Bytes::from(vec![0u8; len])),
        }
    }
}

impl fmt::Debug for BufferView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferView")
            .field("len", &self.bytes.len())
            .field("state", &self.state())
            .finish()
    }
}

impl From<Vec<u8>> for BufferView {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<Bytes> for BufferView {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}
