// Sun Jan 18 2026 - Alex

use crate::codec::{Codec, CodecError, Decoder, Encoder, Reader, ReaderSet, TypedCodec, Writer, WriterSet};
use crate::config::WriterConfig;
use crate::format::{FormatRef, Typed};
use crate::layout::{LayoutError, LayoutRef, Resolver, Traits};
use crate::overlay::OverlayClass;

/// Memo of layouts, readers and writers for one schema compilation unit.
///
/// Mutated only while warming up. Once every format has been compiled, the readers and writers
/// it handed out are plain `Send + Sync` closures and the cache itself can be shared read-only.
#[derive(Default)]
pub struct Cache {
    config: WriterConfig,
    resolver: Resolver,
    readers: ReaderSet,
    writers: WriterSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub layouts: usize,
    pub readers: usize,
    pub writers: usize,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WriterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn resolve(&mut self, format: &FormatRef) -> Result<LayoutRef, LayoutError> {
        self.resolver.resolve(format)
    }

    pub fn traits(&mut self, format: &FormatRef) -> Result<Traits, LayoutError> {
        self.resolve(format).map(|layout| layout.traits())
    }

    pub fn reader(&mut self, layout: &LayoutRef) -> Result<Reader, CodecError> {
        self.readers.reader(layout)
    }

    pub fn writer(&mut self, layout: &LayoutRef) -> Result<Writer, CodecError> {
        self.writers.writer(layout)
    }

    pub fn make_reader(&mut self, format: &FormatRef) -> Result<Decoder, CodecError> {
        let layout = self.resolve(format)?;
        self.make_reader_for(&layout)
    }

    pub fn make_writer(&mut self, format: &FormatRef) -> Result<Encoder, CodecError> {
        let layout = self.resolve(format)?;
        self.make_writer_for(&layout)
    }

    /// Decoder for a layout that did not come from this cache's resolver, such as a restored archive.
    pub fn make_reader_for(&mut self, layout: &LayoutRef) -> Result<Decoder, CodecError> {
        let reader = self.reader(layout)?;
        Ok(Decoder::new(layout.clone(), reader))
    }

    pub fn make_writer_for(&mut self, layout: &LayoutRef) -> Result<Encoder, CodecError> {
        let writer = self.writer(layout)?;
        Ok(Encoder::new(layout.clone(), writer, self.config.clone()))
    }

    pub fn codec(&mut self, format: &FormatRef) -> Result<Codec, CodecError> {
        let layout = self.resolve(format)?;
        self.codec_for(&layout)
    }

    pub fn codec_for(&mut self, layout: &LayoutRef) -> Result<Codec, CodecError> {
        Ok(Codec::new(self.make_reader_for(layout)?, self.make_writer_for(layout)?))
    }

    pub fn typed_codec<T>(&mut self, format: &Typed<T>) -> Result<TypedCodec<T>, CodecError> {
        self.codec(format.format()).map(TypedCodec::new)
    }

    /// Injects `class` with the struct behind `format`. False when it was already injected.
    pub fn inject(&mut self, class: &OverlayClass, format: &FormatRef) -> Result<bool, CodecError> {
        let layout = self.resolve(format)?;
        if layout.as_struct().is_none() {
            return Err(LayoutError::OverlayTarget(class.name().to_string()).into());
        }
        class.inject(&layout, &mut self.readers)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            layouts: self.resolver.len(),
            readers: self.readers.len(),
            writers: self.writers.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{declare, struct_of, vector, with_type, Primitive};
    use crate::value::Value;
    use std::sync::Arc;

    #[test]
    fn test_same_named_format_shares_layout() {
        let point = declare("Point", struct_of([("x", Primitive::Int32), ("y", Primitive::Int32)]));
        let mut cache = Cache::new();
        let first = cache.resolve(&point).unwrap();
        let second = cache.resolve(&point).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().layouts, 4);
    }

    #[test]
    fn test_readers_are_memoized() {
        let format = vector(Primitive::Uint16);
        let mut cache = Cache::new();
        let layout = cache.resolve(&format).unwrap();
        let a = cache.reader(&layout).unwrap();
        let b = cache.reader(&layout).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats().readers, 2);
    }

    #[test]
    fn test_typed_codec() {
        let scores = with_type::<Vec<u16>>(vector(Primitive::Uint16));
        let codec = Cache::new().typed_codec(&scores).unwrap();
        let blob = codec.encode(&vec![3, 1, 2]).unwrap();
        assert_eq!(blob.len(), 14);
        assert_eq!(codec.decode(&blob.into()).unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn test_encoder_respects_size_limit() {
        let config = WriterConfig {
            initial_capacity: 0,
            max_size: 16,
        };
        let mut cache = Cache::with_config(config);
        let encoder = cache.make_writer(&vector(Primitive::Double)).unwrap();
        let values = Value::Array(vec![Value::Float(1.0); 4]);
        assert!(matches!(encoder.encode(&values), Err(CodecError::Buffer(_))));
    }

    #[test]
    fn test_inject_requires_struct() {
        let class = OverlayClass::new("Scores");
        let mut cache = Cache::new();
        let err = cache.inject(&class, &vector(Primitive::Int8)).unwrap_err();
        assert_eq!(err, CodecError::Layout(LayoutError::OverlayTarget("Scores".to_string())));

        let record = struct_of([("id", Primitive::Uint32)]);
        assert!(cache.inject(&class, &record).unwrap());
        assert!(!cache.inject(&class, &record).unwrap());
    }
}
