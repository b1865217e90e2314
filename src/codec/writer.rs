// Sat Jan 17 2026 - Alex

use crate::buffer::ViewWriter;
use crate::codec::{write_string, CodecError};
use crate::format::{Interceptor, Primitive};
use crate::layout::{
    align_to, ComposedLayout, Layout, LayoutRef, OptionalKind, StructLayout, VariantLayout, VectorKind, VectorLayout,
    POINTER_WIDTH,
};
use crate::value::{Record, Value};
use ahash::AHashMap;
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::sync::Arc;

/// Encodes a value into the slot at `offset`, bump-allocating out-of-line data from `heap`.
/// Returns the heap cursor after everything this value allocated.
pub type Writer = Arc<dyn Fn(&Value, &mut ViewWriter, usize, usize) -> Result<usize, CodecError> + Send + Sync>;

fn writer<F>(write: F) -> Writer
where
    F: Fn(&Value, &mut ViewWriter, usize, usize) -> Result<usize, CodecError> + Send + Sync + 'static,
{
    Arc::new(write)
}

fn mismatch(expected: &'static str, found: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        found: found.type_name().to_string(),
    }
}

/// Reserves `size` bytes at the next `align` boundary. Returns the block start and the new heap.
fn allocate(target: &mut ViewWriter, heap: usize, align: usize, size: usize) -> Result<(usize, usize), CodecError> {
    let start = align_to(heap, align);
    let end = start + size;
    target.reserve_to(end)?;
    Ok((start, end))
}

/// Plain record view of a struct value. Overlays are snapshotted; cached fields win.
fn record_of(value: &Value) -> Result<Cow<'_, Record>, CodecError> {
    match value {
        Value::Struct(record) => Ok(Cow::Borrowed(record)),
        Value::Overlay(overlay) => Ok(Cow::Owned(overlay.snapshot()?)),
        other => Err(mismatch("struct", other)),
    }
}

fn integer(value: &Value, primitive: Primitive) -> Result<i64, CodecError> {
    let n = match value {
        Value::Int(n) => *n,
        Value::Float(f) => value.as_i64().ok_or_else(|| CodecError::ValueOutOfRange {
            kind: primitive.name(),
            value: f.to_string(),
        })?,
        other => return Err(mismatch(primitive.name(), other)),
    };
    match primitive.range() {
        Some((min, max)) if n < min || n > max => Err(CodecError::ValueOutOfRange {
            kind: primitive.name(),
            value: n.to_string(),
        }),
        _ => Ok(n),
    }
}

/// Writer memo keyed by layout identity.
#[derive(Default)]
pub struct WriterSet {
    memo: AHashMap<usize, (LayoutRef, Writer)>,
}

impl WriterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }

    pub fn writer(&mut self, layout: &LayoutRef) -> Result<Writer, CodecError> {
        let key = Arc::as_ptr(layout) as usize;
        if let Some((_, writer)) = self.memo.get(&key) {
            return Ok(writer.clone());
        }
        log::trace!("Generating {} writer", layout.kind());
        let generated = match layout.as_ref() {
            Layout::Named(named) => {
                let bound = named
                    .target()
                    .cloned()
                    .ok_or_else(|| CodecError::Unbound(named.name().to_string()))?;
                let cell: Arc<OnceCell<Writer>> = Arc::new(OnceCell::new());
                let name = named.name().to_string();
                let slot = cell.clone();
                let trampoline = writer(move |value, target, offset, heap| {
                    let inner = slot.get().ok_or_else(|| CodecError::Unbound(name.clone()))?;
                    inner(value, target, offset, heap)
                });
                self.memo.insert(key, (layout.clone(), trampoline.clone()));
                match self.writer(&bound) {
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
            Layout::Primitive(primitive) => primitive_writer(*primitive),
            Layout::Array(array) => {
                let element = self.writer(&array.element)?;
                let length = array.length;
                let traits = array.element.traits();
                let stride = traits.stride.unwrap_or(traits.size);
                writer(move |value, target, offset, mut heap| {
                    let items = value.as_array().ok_or_else(|| mismatch("array", value))?;
                    if items.len() != length {
                        return Err(CodecError::LengthMismatch {
                            expected: length,
                            found: items.len(),
                        });
                    }
                    for (i, item) in items.iter().enumerate() {
                        heap = element(item, target, offset + i * stride, heap)?;
                    }
                    Ok(heap)
                })
            }
            Layout::Vector(vector) => self.vector_writer(vector)?,
            Layout::Optional(optional) => {
                let element = self.writer(&optional.element)?;
                match optional.kind {
                    OptionalKind::Inline { marker } => writer(move |value, target, offset, heap| {
                        if value.is_undefined() {
                            target.set_uint8(offset + marker, 0)?;
                            return Ok(heap);
                        }
                        let heap = element(value, target, offset, heap)?;
                        target.set_uint8(offset + marker, 1)?;
                        Ok(heap)
                    }),
                    OptionalKind::Pointer => {
                        let element_layout = optional.element.clone();
                        writer(move |value, target, offset, heap| {
                            if value.is_undefined() {
                                target.set_uint32(offset, 0)?;
                                return Ok(heap);
                            }
                            let traits = element_layout.traits();
                            let (address, heap) = allocate(target, heap, traits.align, traits.size)?;
                            target.set_uint32(offset, address as u32)?;
                            element(value, target, address, heap)
                        })
                    }
                }
            }
            Layout::Enum(values) => {
                let values = values.clone();
                writer(move |value, target, offset, heap| {
                    let index = values
                        .iter()
                        .position(|candidate| candidate == value)
                        .ok_or_else(|| CodecError::UnknownEnumValue(format!("{:?}", value)))?;
                    target.set_uint8(offset, index as u8)?;
                    Ok(heap)
                })
            }
            Layout::Constant(_) => writer(|_, _, _, heap| Ok(heap)),
            Layout::Struct(body) => self.struct_writer(body)?,
            Layout::Variant(variant) => self.variant_writer(variant)?,
            Layout::Composed(composed) => self.composed_writer(composed)?,
        };
        let key_layout = layout.clone();
        Ok(self.memo.entry(key).or_insert((key_layout, generated)).1.clone())
    }

    fn vector_writer(&mut self, vector: &VectorLayout) -> Result<Writer, CodecError> {
        let element = self.writer(&vector.element)?;
        let element_layout = vector.element.clone();
        Ok(match vector.kind {
            VectorKind::Dense { stride } => writer(move |value, target, offset, heap| {
                let items = value.as_array().ok_or_else(|| mismatch("array", value))?;
                target.set_uint32(offset, items.len() as u32)?;
                if items.is_empty() {
                    target.set_uint32(offset + POINTER_WIDTH, 0)?;
                    return Ok(heap);
                }
                let traits = element_layout.traits();
                let span = (items.len() - 1) * stride + traits.size;
                let (data, mut heap) = allocate(target, heap, traits.align, span)?;
                target.set_uint32(offset + POINTER_WIDTH, data as u32)?;
                for (i, item) in items.iter().enumerate() {
                    heap = element(item, target, data + i * stride, heap)?;
                }
                Ok(heap)
            }),
            VectorKind::List => {
                let payload = vector.node_payload();
                let node_align = vector.node_align();
                writer(move |value, target, offset, mut heap| {
                    let items = value.as_array().ok_or_else(|| mismatch("array", value))?;
                    let size = payload + element_layout.traits().size;
                    let mut link = offset;
                    target.set_uint32(offset, 0)?;
                    for item in items {
                        let (node, next_heap) = allocate(target, heap, node_align, size)?;
                        target.set_uint32(link, node as u32)?;
                        target.set_uint32(node, 0)?;
                        heap = element(item, target, node + payload, next_heap)?;
                        link = node;
                    }
                    Ok(heap)
                })
            }
        })
    }

    fn struct_writer(&mut self, body: &StructLayout) -> Result<Writer, CodecError> {
        let base = match &body.base {
            Some(base) => Some(self.writer(base)?),
            None => None,
        };
        let mut members = Vec::with_capacity(body.members.len());
        for member in &body.members {
            members.push((
                member.name.clone(),
                member.offset,
                member.pointer,
                member.layout.clone(),
                self.writer(&member.layout)?,
            ));
        }
        Ok(writer(move |value, target, offset, mut heap| {
            let record = record_of(value)?;
            let missing = Value::Undefined;
            if let Some(base) = &base {
                heap = base(value, target, offset, heap)?;
            }
            for (name, at, pointer, layout, write) in &members {
                let field = record.get(name).unwrap_or(&missing);
                if *pointer {
                    if field.is_undefined() {
                        target.set_uint32(offset + at, 0)?;
                        continue;
                    }
                    let traits = layout.traits();
                    let (address, next_heap) = allocate(target, heap, traits.align, traits.size)?;
                    target.set_uint32(offset + at, address as u32)?;
                    heap = write(field, target, address, next_heap)?;
                } else {
                    heap = write(field, target, offset + at, heap)?;
                }
            }
            Ok(heap)
        }))
    }

    fn variant_writer(&mut self, variant: &VariantLayout) -> Result<Writer, CodecError> {
        let mut arms = Vec::with_capacity(variant.arms.len());
        for (index, arm) in variant.arms.iter().enumerate() {
            let tag = variant.arm_tag(index).unwrap_or_default().to_string();
            arms.push((tag, arm.clone(), self.writer(arm)?));
        }
        Ok(writer(move |value, target, offset, heap| {
            let tag = value.tag().ok_or_else(|| CodecError::UnknownVariantTag("<untagged>".to_string()))?;
            let index = arms
                .iter()
                .position(|(arm_tag, _, _)| arm_tag == tag)
                .ok_or_else(|| CodecError::UnknownVariantTag(tag.to_string()))?;
            let (_, layout, write) = &arms[index];
            let traits = layout.traits();
            let (address, heap) = allocate(target, heap, traits.align, traits.size)?;
            target.set_uint32(offset, address as u32)?;
            target.set_uint8(offset + POINTER_WIDTH, index as u8)?;
            write(value, target, address, heap)
        }))
    }

    fn composed_writer(&mut self, composed: &ComposedLayout) -> Result<Writer, CodecError> {
        Ok(match &composed.interceptor {
            None => self.writer(&composed.layout)?,
            Some(Interceptor::Transform(transform)) => {
                let inner = self.writer(&composed.layout)?;
                let transform = transform.clone();
                writer(move |value, target, offset, heap| {
                    let plain = transform.decompose(value)?;
                    inner(&plain, target, offset, heap)
                })
            }
            Some(Interceptor::Raw(codec)) => {
                let codec = codec.clone();
                let size = composed.layout.traits().size;
                writer(move |value, target, offset, heap| {
                    target.reserve_to(offset + size)?;
                    codec.write(value, target, offset)?;
                    Ok(heap)
                })
            }
            Some(Interceptor::Overlay(_)) => {
                let inner = self.writer(&composed.layout)?;
                writer(move |value, target, offset, heap| match value {
                    Value::Overlay(overlay) => {
                        let snapshot = Value::Struct(overlay.snapshot()?);
                        inner(&snapshot, target, offset, heap)
                    }
                    other => inner(other, target, offset, heap),
                })
            }
        })
    }
}

fn primitive_writer(primitive: Primitive) -> Writer {
    match primitive {
        Primitive::Int8 => writer(|value, target, offset, heap| {
            target.set_int8(offset, integer(value, Primitive::Int8)? as i8)?;
            Ok(heap)
        }),
        Primitive::Int16 => writer(|value, target, offset, heap| {
            target.set_int16(offset, integer(value, Primitive::Int16)? as i16)?;
            Ok(heap)
        }),
        Primitive::Int32 => writer(|value, target, offset, heap| {
            target.set_int32(offset, integer(value, Primitive::Int32)? as i32)?;
            Ok(heap)
        }),
        Primitive::Uint8 => writer(|value, target, offset, heap| {
            target.set_uint8(offset, integer(value, Primitive::Uint8)? as u8)?;
            Ok(heap)
        }),
        Primitive::Uint16 => writer(|value, target, offset, heap| {
            target.set_uint16(offset, integer(value, Primitive::Uint16)? as u16)?;
            Ok(heap)
        }),
        Primitive::Uint32 => writer(|value, target, offset, heap| {
            target.set_uint32(offset, integer(value, Primitive::Uint32)? as u32)?;
            Ok(heap)
        }),
        Primitive::Double => writer(|value, target, offset, heap| {
            let number = value.as_f64().ok_or_else(|| mismatch("double", value))?;
            target.set_double(offset, number)?;
            Ok(heap)
        }),
        Primitive::Bool => writer(|value, target, offset, heap| {
            let flag = value.as_bool().ok_or_else(|| mismatch("bool", value))?;
            target.set_uint8(offset, flag as u8)?;
            Ok(heap)
        }),
        Primitive::String => writer(|value, target, offset, heap| {
            let text = value.as_str().ok_or_else(|| mismatch("string", value))?;
            write_string(text, target, offset, heap)
        }),
        Primitive::Buffer => writer(|value, target, offset, heap| {
            let bytes = match value {
                Value::Bytes(bytes) => bytes,
                other => return Err(mismatch("buffer", other)),
            };
            let length = u32::try_from(bytes.len()).map_err(|_| CodecError::ValueOutOfRange {
                kind: "buffer length",
                value: bytes.len().to_string(),
            })?;
            target.set_uint32(offset, length)?;
            if bytes.is_empty() {
                target.set_uint32(offset + POINTER_WIDTH, 0)?;
                return Ok(heap);
            }
            target.put_bytes(heap, bytes)?;
            target.set_uint32(offset + POINTER_WIDTH, heap as u32)?;
            Ok(heap + bytes.len())
        }),
    }
}
