// Sun Jan 18 2026 - Alex

use crate::buffer::BufferView;
use crate::codec::{CodecError, Reader, ReaderSet};
use crate::layout::{structural_eq, Layout, LayoutError, LayoutRef};
use crate::value::Value;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::{Arc, Weak};

/// Lazy accessor for one struct member.
pub struct Accessor {
    pub name: String,
    pub offset: usize,
    /// The slot holds a `u32` offset to the payload.
    pub pointer: bool,
    /// Cache after the first read. Integer members are re-read instead.
    pub memoize: bool,
    reader: Reader,
}

impl Accessor {
    /// Decodes this member of the struct starting at `base`.
    pub fn read(&self, view: &BufferView, base: usize) -> Result<Value, CodecError> {
        if self.pointer {
            return match view.uint32(base + self.offset)? {
                0 => Ok(Value::Undefined),
                address => (self.reader)(view, address as usize),
            };
        }
        (self.reader)(view, base + self.offset)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("pointer", &self.pointer)
            .field("memoize", &self.memoize)
            .finish()
    }
}

/// The struct node behind any named or composed wrappers.
fn struct_node(layout: &LayoutRef) -> Option<&LayoutRef> {
    match layout.as_ref() {
        Layout::Struct(_) => Some(layout),
        Layout::Named(named) => named.target().and_then(struct_node),
        Layout::Composed(composed) => struct_node(&composed.layout),
        _ => None,
    }
}

/// Accessors of an overlay class over one struct layout, inherited members first.
#[derive(Debug, Default)]
pub struct AccessorTable {
    layout: Weak<Layout>,
    tag: Option<String>,
    accessors: IndexMap<String, Accessor>,
}

impl AccessorTable {
    /// True when this table was built for `layout` or for a structurally equal one.
    pub fn serves(&self, layout: &LayoutRef) -> bool {
        let Some(node) = struct_node(layout) else {
            return false;
        };
        if std::ptr::eq(self.layout.as_ptr(), Arc::as_ptr(node)) {
            return true;
        }
        self.layout
            .upgrade()
            .map_or(false, |own| structural_eq(&own, node))
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Accessor> {
        self.accessors.get(name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.accessors.get_index_of(name)
    }

    pub fn get_index(&self, index: usize) -> Option<&Accessor> {
        self.accessors.get_index(index).map(|(_, accessor)| accessor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Accessor> {
        self.accessors.values()
    }
}

/// Host class whose instances wrap a buffer region and decode members on demand.
pub struct OverlayClass {
    name: String,
    table: OnceCell<Arc<AccessorTable>>,
}

impl OverlayClass {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            table: OnceCell::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_injected(&self) -> bool {
        self.table.get().is_some()
    }

    pub fn table(&self) -> Option<&Arc<AccessorTable>> {
        self.table.get()
    }

    /// Installs one accessor per member of `layout` as the class table. Returns false, changing
    /// nothing, when the class already has its accessors or is being injected further up the
    /// call stack.
    pub fn inject(&self, layout: &LayoutRef, readers: &mut ReaderSet) -> Result<bool, CodecError> {
        if self.is_injected() || !readers.begin_injection(self) {
            return Ok(false);
        }
        let table = self.build_table(layout, readers);
        readers.end_injection(self);
        let table = table?;

        let count = table.len();
        if self.table.set(Arc::new(table)).is_err() {
            return Ok(false);
        }
        log::debug!("Injected overlay class {} with {} accessors", self.name, count);
        Ok(true)
    }

    /// Accessor table for instances over `layout`.
    ///
    /// The class table serves every layout structurally equal to the one it was injected with.
    /// Any other layout, such as one restored from an older archive, gets a table of its own.
    /// `None` means the class is still being injected further up the call stack, and instances
    /// should take the class table once it exists.
    pub fn table_for(
        &self,
        layout: &LayoutRef,
        readers: &mut ReaderSet,
    ) -> Result<Option<Arc<AccessorTable>>, CodecError> {
        if !self.is_injected() {
            self.inject(layout, readers)?;
        }
        match self.table() {
            Some(table) if table.serves(layout) => Ok(Some(table.clone())),
            Some(_) => {
                let table = self.build_table(layout, readers)?;
                log::debug!("Built a separate accessor table for overlay class {}", self.name);
                Ok(Some(Arc::new(table)))
            }
            None => Ok(None),
        }
    }

    fn build_table(&self, layout: &LayoutRef, readers: &mut ReaderSet) -> Result<AccessorTable, CodecError> {
        let node = struct_node(layout).ok_or_else(|| LayoutError::OverlayTarget(self.name.clone()))?;
        let body = node
            .as_struct()
            .ok_or_else(|| LayoutError::OverlayTarget(self.name.clone()))?;
        let mut accessors = IndexMap::new();
        for member in body.all_members() {
            let accessor = Accessor {
                name: member.name.clone(),
                offset: member.offset,
                pointer: member.pointer,
                memoize: member.pointer || !member.layout.is_integer(),
                reader: readers.reader(&member.layout)?,
            };
            accessors.insert(member.name.clone(), accessor);
        }
        Ok(AccessorTable {
            layout: Arc::downgrade(node),
            tag: body.effective_tag().map(str::to_string),
            accessors,
        })
    }
}

impl fmt::Debug for OverlayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OverlayClass({})", self.name)
    }
}
