// Sun Jan 18 2026 - Alex

use crate::buffer::BufferObject;
use crate::codec::CodecError;
use crate::overlay::{AccessorTable, OverlayClass};
use crate::value::{Record, Value};
use parking_lot::Mutex;
use std::sync::Arc;

/// Per-member state of an overlay instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Still backed by the buffer.
    Unread,
    /// Decoded or assigned. Never goes back to the buffer.
    Cached(Value),
}

/// Instance of an overlay class over one struct in a buffer.
///
/// Members decode on first access. Assigning a member detaches it from the buffer for good.
/// Not meant for concurrent mutation: the locks only keep each slot consistent.
pub struct Overlay {
    object: BufferObject,
    class: Arc<OverlayClass>,
    table: Arc<AccessorTable>,
    slots: Vec<Mutex<Slot>>,
}

impl Overlay {
    /// Instance using the class table.
    pub fn new(object: BufferObject, class: &Arc<OverlayClass>) -> Result<Self, CodecError> {
        let table = class
            .table()
            .cloned()
            .ok_or_else(|| CodecError::NotInjected(class.name().to_string()))?;
        Ok(Self::with_table(object, class, table))
    }

    pub fn with_table(object: BufferObject, class: &Arc<OverlayClass>, table: Arc<AccessorTable>) -> Self {
        let slots = (0..table.len()).map(|_| Mutex::new(Slot::Unread)).collect();
        Self {
            object,
            class: class.clone(),
            table,
            slots,
        }
    }

    /// A freshly constructed instance that was never populated: every member reads as zero.
    pub fn detached_default(class: &Arc<OverlayClass>) -> Result<Self, CodecError> {
        Self::new(BufferObject::null(), class)
    }

    pub fn class(&self) -> &Arc<OverlayClass> {
        &self.class
    }

    pub fn offset(&self) -> usize {
        self.object.offset()
    }

    pub fn tag(&self) -> Option<&str> {
        self.table.tag()
    }

    fn index(&self, name: &str) -> Result<usize, CodecError> {
        self.table
            .index_of(name)
            .ok_or_else(|| CodecError::UnknownField(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<Value, CodecError> {
        let index = self.index(name)?;
        self.get_at(index)
    }

    fn get_at(&self, index: usize) -> Result<Value, CodecError> {
        let mut slot = self.slots[index].lock();
        if let Slot::Cached(value) = &*slot {
            return Ok(value.clone());
        }
        let accessor = self
            .table
            .get_index(index)
            .ok_or_else(|| CodecError::UnknownField(index.to_string()))?;
        self.object.check()?;
        let value = accessor.read(&self.object.buffer(), self.object.offset())?;
        if accessor.memoize {
            *slot = Slot::Cached(value.clone());
        }
        Ok(value)
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), CodecError> {
        let index = self.index(name)?;
        *self.slots[index].lock() = Slot::Cached(value.into());
        Ok(())
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.table
            .index_of(name)
            .map_or(false, |index| matches!(*self.slots[index].lock(), Slot::Cached(_)))
    }

    /// Plain record of every member, reading whatever is not cached yet.
    pub fn snapshot(&self) -> Result<Record, CodecError> {
        let mut record = Record::new();
        record.tag = self.tag().map(str::to_string);
        for (index, accessor) in self.table.iter().enumerate() {
            record.insert(&accessor.name, self.get_at(index)?);
        }
        Ok(record)
    }

    /// Releases the buffer. Members that are not cached fail to read afterwards.
    pub fn detach_buffer(&self) {
        self.object.detach();
    }
}

/// Host type backed by an overlay instance.
pub trait OverlayType {
    fn from_overlay(overlay: Arc<Overlay>) -> Self;
    fn overlay(&self) -> &Overlay;
}

impl OverlayType for Arc<Overlay> {
    fn from_overlay(overlay: Arc<Overlay>) -> Self {
        overlay
    }

    fn overlay(&self) -> &Overlay {
        self
    }
}
