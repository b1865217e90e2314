// Sun Jan 18 2026 - Alex

use crate::buffer::{BufferView, ViewWriter};
use crate::codec::{CodecError, Reader, Writer};
use crate::config::WriterConfig;
use crate::layout::{LayoutRef, Traits};
use crate::value::{FromValue, ToValue, Value};
use bytes::Bytes;
use std::marker::PhantomData;

/// Top-level reader: decodes the root value at offset 0.
#[derive(Clone)]
pub struct Decoder {
    layout: LayoutRef,
    reader: Reader,
}

impl Decoder {
    pub fn new(layout: LayoutRef, reader: Reader) -> Self {
        Self { layout, reader }
    }

    pub fn layout(&self) -> &LayoutRef {
        &self.layout
    }

    pub fn decode(&self, view: &BufferView) -> Result<Value, CodecError> {
        (self.reader)(view, 0)
    }

    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        self.decode(&BufferView::new(Bytes::copy_from_slice(bytes)))
    }
}

/// Top-level writer: one forward pass producing a self-contained blob.
#[derive(Clone)]
pub struct Encoder {
    layout: LayoutRef,
    writer: Writer,
    config: WriterConfig,
}

impl Encoder {
    pub fn new(layout: LayoutRef, writer: Writer, config: WriterConfig) -> Self {
        Self { layout, writer, config }
    }

    pub fn layout(&self) -> &LayoutRef {
        &self.layout
    }

    /// Root slot at 0, out-of-line data packed after it. The blob ends at the final heap cursor.
    pub fn encode(&self, value: &Value) -> Result<Bytes, CodecError> {
        let root = self.layout.traits().size;
        let mut target = ViewWriter::with_limits(self.config.initial_capacity.max(root), self.config.max_size);
        target.reserve_to(root)?;
        let end = (self.writer)(value, &mut target, 0, root)?;
        Ok(target.finish(end))
    }

    pub fn encode_view(&self, value: &Value) -> Result<BufferView, CodecError> {
        self.encode(value).map(BufferView::new)
    }
}

/// Reader and writer for one layout.
#[derive(Clone)]
pub struct Codec {
    decoder: Decoder,
    encoder: Encoder,
}

impl Codec {
    pub fn new(decoder: Decoder, encoder: Encoder) -> Self {
        Self { decoder, encoder }
    }

    pub fn layout(&self) -> &LayoutRef {
        self.decoder.layout()
    }

    pub fn traits(&self) -> Traits {
        self.layout().traits()
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decode(&self, view: &BufferView) -> Result<Value, CodecError> {
        self.decoder.decode(view)
    }

    pub fn encode(&self, value: &Value) -> Result<Bytes, CodecError> {
        self.encoder.encode(value)
    }
}

/// `Codec` that converts to and from a host type.
pub struct TypedCodec<T> {
    codec: Codec,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedCodec<T> {
    pub fn new(codec: Codec) -> Self {
        Self {
            codec,
            _marker: PhantomData,
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }
}

impl<T: FromValue> TypedCodec<T> {
    pub fn decode(&self, view: &BufferView) -> Result<T, CodecError> {
        T::from_value(self.codec.decode(view)?)
    }
}

impl<T: ToValue> TypedCodec<T> {
    pub fn encode(&self, value: &T) -> Result<Bytes, CodecError> {
        self.codec.encode(&value.to_value())
    }
}

impl<T> Clone for TypedCodec<T> {
    fn clone(&self) -> Self {
        Self::new(self.codec.clone())
    }
}
