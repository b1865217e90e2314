// Fri Jan 16 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("Buffer view has been detached")]
    Detached,
    #[error("Out of bounds: {len} bytes at offset {offset} exceed a buffer of {size} bytes")]
    OutOfBounds { offset: usize, len: usize, size: usize },
    #[error("Write up to byte {requested} exceeds the buffer limit of {limit} bytes")]
    CapacityExceeded { requested: usize, limit: usize },
}
