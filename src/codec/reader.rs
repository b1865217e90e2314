// Sat Jan 17 2026 - Alex

use crate::buffer::{BufferObject, BufferView};
use crate::codec::{read_string, CodecError};
use crate::format::{Interceptor, Primitive};
use crate::layout::{
    ComposedLayout, Layout, LayoutRef, OptionalKind, StructLayout, VariantLayout, VectorKind, VectorLayout,
    POINTER_WIDTH,
};
use crate::overlay::{Overlay, OverlayClass};
use crate::value::{Record, Value};
use ahash::{AHashMap, AHashSet};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Decodes the value whose slot starts at the given byte offset.
pub type Reader = Arc<dyn Fn(&BufferView, usize) -> Result<Value, CodecError> + Send + Sync>;

type RecordReader = Arc<dyn Fn(&BufferView, usize) -> Result<Record, CodecError> + Send + Sync>;

fn reader<F>(read: F) -> Reader
where
    F: Fn(&BufferView, usize) -> Result<Value, CodecError> + Send + Sync + 'static,
{
    Arc::new(read)
}

fn record_reader<F>(read: F) -> RecordReader
where
    F: Fn(&BufferView, usize) -> Result<Record, CodecError> + Send + Sync + 'static,
{
    Arc::new(read)
}

/// Reader memo keyed by layout identity.
#[derive(Default)]
pub struct ReaderSet {
    memo: AHashMap<usize, (LayoutRef, Reader)>,
    injecting: AHashSet<usize>,
}

impl ReaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    pub fn reader(&mut self, layout: &LayoutRef) -> Result<Reader, CodecError> {
        let key = Arc::as_ptr(layout) as usize;
        if let Some((_, reader)) = self.memo.get(&key) {
            return Ok(reader.clone());
        }
        log::trace!("Generating {} reader", layout.kind());
        let generated = match layout.as_ref() {
            Layout::Named(named) => {
                let bound = named
                    .target()
                    .cloned()
                    .ok_or_else(|| CodecError::Unbound(named.name().to_string()))?;
                // Bound late so a layout that contains itself finds this entry.
                let cell: Arc<OnceCell<Reader>> = Arc::new(OnceCell::new());
                let name = named.name().to_string();
                let slot = cell.clone();
                let trampoline = reader(move |view, offset| {
                    let inner = slot.get().ok_or_else(|| CodecError::Unbound(name.clone()))?;
                    inner(view, offset)
                });
                self.memo.insert(key, (layout.clone(), trampoline.clone()));
                match self.reader(&bound) {
                    Ok(inner) => {
                        let _ = cell.set(inner);
                    }
                    Err(err) => {
                        self.memo.remove(&key);
                        return Err(err);
                    }
                }
                return Ok(trampoline);
            }
            Layout::Primitive(primitive) => primitive_reader(*primitive),
            Layout::Array(array) => {
                let element = self.reader(&array.element)?;
                let length = array.length;
                let traits = array.element.traits();
                let stride = traits.stride.unwrap_or(traits.size);
                reader(move |view, offset| {
                    (0..length)
                        .map(|i| element(view, offset + i * stride))
                        .collect::<Result<Vec<_>, _>>()
                        .map(Value::Array)
                })
            }
            Layout::Vector(vector) => self.vector_reader(vector)?,
            Layout::Optional(optional) => {
                let element = self.reader(&optional.element)?;
                match optional.kind {
                    OptionalKind::Inline { marker } => reader(move |view, offset| match view.uint8(offset + marker)? {
                        0 => Ok(Value::Undefined),
                        1 => element(view, offset),
                        _ => Err(CodecError::MalformedLength {
                            offset: offset + marker,
                            detail: "optional marker",
                        }),
                    }),
                    OptionalKind::Pointer => reader(move |view, offset| match view.uint32(offset)? {
                        0 => Ok(Value::Undefined),
                        address => element(view, address as usize),
                    }),
                }
            }
            Layout::Enum(values) => {
                let values = values.clone();
                reader(move |view, offset| {
                    let index = view.uint8(offset)? as usize;
                    values.get(index).cloned().ok_or(CodecError::EnumIndexOutOfRange {
                        index,
                        count: values.len(),
                    })
                })
            }
            Layout::Constant(value) => {
                let value = value.clone();
                reader(move |_, _| Ok(value.clone()))
            }
            Layout::Struct(body) => {
                let read = self.struct_reader(body)?;
                reader(move |view, offset| read(view, offset).map(Value::Struct))
            }
            Layout::Variant(variant) => self.variant_reader(variant)?,
            Layout::Composed(composed) => self.composed_reader(composed)?,
        };
        let key_layout = layout.clone();
        Ok(self.memo.entry(key).or_insert((key_layout, generated)).1.clone())
    }

    fn vector_reader(&mut self, vector: &VectorLayout) -> Result<Reader, CodecError> {
        let element = self.reader(&vector.element)?;
        let size = vector.element.traits().size;
        Ok(match vector.kind {
            VectorKind::Dense { stride } => reader(move |view, offset| {
                let count = view.uint32(offset)? as usize;
                if count == 0 {
                    return Ok(Value::Array(Vec::new()));
                }
                let data = view.uint32(offset + POINTER_WIDTH)? as usize;
                let span = (count - 1)
                    .checked_mul(stride)
                    .and_then(|n| n.checked_add(size))
                    .ok_or(CodecError::MalformedLength {
                        offset,
                        detail: "vector count",
                    })?;
                view.ensure(data, span)?;
                (0..count)
                    .map(|i| element(view, data + i * stride))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }),
            VectorKind::List => {
                let payload = vector.node_payload();
                reader(move |view, offset| {
                    let mut items = Vec::new();
                    let mut node = view.uint32(offset)? as usize;
                    while node != 0 {
                        items.push(element(view, node + payload)?);
                        let next = view.uint32(node)? as usize;
                        // Nodes are written front to back, so a link backwards is corruption.
                        if next != 0 && next <= node {
                            return Err(CodecError::MalformedLength {
                                offset: node,
                                detail: "list link",
                            });
                        }
                        node = next;
                    }
                    Ok(Value::Array(items))
                })
            }
        })
    }

    /// Reader producing the record of a struct, base members first.
    fn struct_reader(&mut self, body: &StructLayout) -> Result<RecordReader, CodecError> {
        let base = match &body.base {
            Some(base) => Some(self.reader(base)?),
            None => None,
        };
        let mut members = Vec::with_capacity(body.members.len());
        for member in &body.members {
            members.push((member.name.clone(), member.offset, member.pointer, self.reader(&member.layout)?));
        }
        let tag = body.tag.clone();
        Ok(record_reader(move |view, offset| {
            let mut record = match &base {
                Some(base) => match base(view, offset)? {
                    Value::Struct(record) => record,
                    Value::Overlay(overlay) => overlay.snapshot()?,
                    other => {
                        return Err(CodecError::TypeMismatch {
                            expected: "struct",
                            found: other.type_name().to_string(),
                        })
                    }
                },
                None => Record::new(),
            };
            if tag.is_some() {
                record.tag = tag.clone();
            }
            for (name, at, pointer, read) in &members {
                let value = if *pointer {
                    match view.uint32(offset + at)? {
                        0 => Value::Undefined,
                        address => read(view, address as usize)?,
                    }
                } else {
                    read(view, offset + at)?
                };
                record.fields.insert(name.clone(), value);
            }
            Ok(record)
        }))
    }

    fn variant_reader(&mut self, variant: &VariantLayout) -> Result<Reader, CodecError> {
        let arms = variant
            .arms
            .iter()
            .map(|arm| self.reader(arm))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reader(move |view, offset| {
            let address = view.uint32(offset)? as usize;
            let index = view.uint8(offset + POINTER_WIDTH)? as usize;
            let arm = arms.get(index).ok_or(CodecError::VariantIndexOutOfRange {
                index,
                count: arms.len(),
            })?;
            arm(view, address)
        }))
    }

    fn composed_reader(&mut self, composed: &ComposedLayout) -> Result<Reader, CodecError> {
        Ok(match &composed.interceptor {
            None => self.reader(&composed.layout)?,
            Some(Interceptor::Transform(transform)) => {
                let inner = self.reader(&composed.layout)?;
                let transform = transform.clone();
                reader(move |view, offset| transform.compose(inner(view, offset)?))
            }
            Some(Interceptor::Raw(codec)) => {
                let codec = codec.clone();
                reader(move |view, offset| codec.read(view, offset))
            }
            Some(Interceptor::Overlay(class)) => {
                let table = class.table_for(&composed.layout, self)?;
                let class = class.clone();
                reader(move |view, offset| {
                    let object = BufferObject::new(view.clone(), offset);
                    let overlay = match &table {
                        Some(table) => Overlay::with_table(object, &class, table.clone()),
                        None => Overlay::new(object, &class)?,
                    };
                    Ok(Value::Overlay(Arc::new(overlay)))
                })
            }
        })
    }

    /// Marks `class` as being injected. False when an injection of it is already running.
    pub(crate) fn begin_injection(&mut self, class: &OverlayClass) -> bool {
        self.injecting.insert(class as *const OverlayClass as usize)
    }

    pub(crate) fn end_injection(&mut self, class: &OverlayClass) {
        self.injecting.remove(&(class as *const OverlayClass as usize));
    }
}

fn primitive_reader(primitive: Primitive) -> Reader {
    match primitive {
        Primitive::Int8 => reader(|view, offset| Ok(Value::Int(view.int8(offset)? as i64))),
        Primitive::Int16 => reader(|view, offset| Ok(Value::Int(view.int16(offset)? as i64))),
        Primitive::Int32 => reader(|view, offset| Ok(Value::Int(view.int32(offset)? as i64))),
        Primitive::Uint8 => reader(|view, offset| Ok(Value::Int(view.uint8(offset)? as i64))),
        Primitive::Uint16 => reader(|view, offset| Ok(Value::Int(view.uint16(offset)? as i64))),
        Primitive::Uint32 => reader(|view, offset| Ok(Value::Int(view.uint32(offset)? as i64))),
        Primitive::Double => reader(|view, offset| Ok(Value::Float(view.double(offset)?))),
        Primitive::Bool => reader(|view, offset| Ok(Value::Bool(view.uint8(offset)? != 0))),
        Primitive::String => reader(|view, offset| read_string(view, offset).map(Value::String)),
        Primitive::Buffer => reader(|view, offset| {
            let length = view.uint32(offset)? as usize;
            if length == 0 {
                return Ok(Value::Bytes(Vec::new()));
            }
            let data = view.uint32(offset + POINTER_WIDTH)? as usize;
            Ok(Value::Bytes(view.slice(data, length)?.to_vec()))
        }),
    }
}
