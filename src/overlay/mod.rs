// Sun Jan 18 2026 - Alex

pub mod class;
pub mod instance;

pub use class::{Accessor, AccessorTable, OverlayClass};
pub use instance::{Overlay, OverlayType, Slot};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{archive, restore};
    use crate::buffer::{BufferError, BufferView};
    use crate::cache::Cache;
    use crate::codec::CodecError;
    use crate::format::{
        define, forward, optional, struct_of, tagged, vector, with_overlay, FormatRef, IntoFormat, Primitive,
    };
    use crate::value::{Record, Value};
    use std::sync::Arc;

    struct Creep(Arc<Overlay>);

    impl OverlayType for Creep {
        fn from_overlay(overlay: Arc<Overlay>) -> Self {
            Creep(overlay)
        }

        fn overlay(&self) -> &Overlay {
            &self.0
        }
    }

    impl Creep {
        fn name(&self) -> String {
            self.0.get("name").ok().and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default()
        }
    }

    fn creep_blob(cache: &mut Cache, class: &Arc<OverlayClass>) -> (crate::codec::Codec, BufferView) {
        let body = tagged("creep", [
            ("name", Primitive::String.into_format()),
            ("hits", Primitive::Int32.into_format()),
            ("body", vector(Primitive::Uint8)),
        ]);
        let format = with_overlay(&body, class);
        let codec = cache.codec(&format).unwrap();
        let value = Value::Struct(
            Record::tagged("creep")
                .with("name", "Worker1")
                .with("hits", 100)
                .with("body", vec![Value::Int(1), Value::Int(2)]),
        );
        let view = codec.encoder().encode_view(&value).unwrap();
        (codec, view)
    }

    #[test]
    fn test_overlay_decodes_lazily() {
        let class = OverlayClass::new("Creep");
        let mut cache = Cache::new();
        let (codec, view) = creep_blob(&mut cache, &class);
        assert!(class.is_injected());

        let creep: Creep = codec.decode(&view).unwrap().into_overlay().unwrap();
        let overlay = creep.overlay();
        assert_eq!(overlay.tag(), Some("creep"));
        assert!(!overlay.is_cached("name"));
        assert_eq!(creep.name(), "Worker1");
        assert!(overlay.is_cached("name"));

        assert_eq!(overlay.get("hits").unwrap(), Value::Int(100));
        assert!(!overlay.is_cached("hits"));
        assert!(matches!(overlay.get("speed"), Err(CodecError::UnknownField(_))));
    }

    #[test]
    fn test_set_detaches_field() {
        let class = OverlayClass::new("Creep");
        let mut cache = Cache::new();
        let (codec, view) = creep_blob(&mut cache, &class);
        let value = codec.decode(&view).unwrap();
        let creep: Arc<Overlay> = value.clone().into_overlay().unwrap();

        creep.set("hits", 42).unwrap();
        assert_eq!(creep.get("hits").unwrap(), Value::Int(42));

        let reencoded = codec.encode(&value).unwrap();
        let plain = codec.decode(&BufferView::new(reencoded)).unwrap().to_plain().unwrap();
        assert_eq!(plain.field("hits"), Some(&Value::Int(42)));
        assert_eq!(plain.field("name"), Some(&Value::from("Worker1")));
        assert_eq!(plain.tag(), Some("creep"));
    }

    #[test]
    fn test_detached_buffer_traps_unread_fields() {
        let class = OverlayClass::new("Creep");
        let mut cache = Cache::new();
        let (codec, view) = creep_blob(&mut cache, &class);
        let creep: Arc<Overlay> = codec.decode(&view).unwrap().into_overlay().unwrap();
        assert_eq!(creep.get("name").unwrap(), Value::from("Worker1"));

        view.detach();
        assert_eq!(creep.get("name").unwrap(), Value::from("Worker1"));
        assert_eq!(
            creep.get("hits"),
            Err(CodecError::Buffer(BufferError::Detached))
        );
    }

    #[test]
    fn test_detach_buffer_is_per_instance() {
        let class = OverlayClass::new("Creep");
        let mut cache = Cache::new();
        let (codec, view) = creep_blob(&mut cache, &class);
        let first: Arc<Overlay> = codec.decode(&view).unwrap().into_overlay().unwrap();
        let second: Arc<Overlay> = codec.decode(&view).unwrap().into_overlay().unwrap();
        first.detach_buffer();
        assert!(first.get("body").is_err());
        assert_eq!(second.get("hits").unwrap(), Value::Int(100));
    }

    #[test]
    fn test_default_instance_reads_zero() {
        let class = OverlayClass::new("Creep");
        let mut cache = Cache::new();
        creep_blob(&mut cache, &class);
        let fresh = Overlay::detached_default(&class).unwrap();
        assert_eq!(fresh.get("hits").unwrap(), Value::Int(0));
        assert_eq!(fresh.get("name").unwrap(), Value::from(""));
        assert_eq!(fresh.get("body").unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn test_uninjected_class_fails() {
        let class = OverlayClass::new("Spawn");
        assert_eq!(
            Overlay::detached_default(&class).err(),
            Some(CodecError::NotInjected("Spawn".to_string()))
        );
    }

    #[test]
    fn test_self_referential_class() {
        let class = OverlayClass::new("Room");
        let room = forward("Room");
        let body = struct_of([
            ("id", Primitive::Uint16.into_format()),
            ("exit", optional(&room)),
        ]);
        define(&room, with_overlay(&body, &class)).unwrap();

        let mut cache = Cache::new();
        let codec = cache.codec(&room).unwrap();
        let value = Value::Struct(
            Record::new()
                .with("id", 1)
                .with("exit", Record::new().with("id", 2).with("exit", Value::Undefined)),
        );
        let decoded = codec.decode(&codec.encoder().encode_view(&value).unwrap()).unwrap();
        let first: Arc<Overlay> = decoded.into_overlay().unwrap();
        let exit: Arc<Overlay> = first.get("exit").unwrap().into_overlay().unwrap();
        assert_eq!(exit.get("id").unwrap(), Value::Int(2));
        assert_eq!(exit.get("exit").unwrap(), Value::Undefined);
        assert_eq!(first.class().name(), "Room");
    }

    #[test]
    fn test_pointer_member_dereferences() {
        let class = OverlayClass::new("Cell");
        let cell = forward("Cell");
        let body = struct_of([
            ("id", Primitive::Uint16.into_format()),
            ("next", cell.clone()),
        ]);
        define(&cell, with_overlay(&body, &class)).unwrap();

        let mut cache = Cache::new();
        let codec = cache.codec(&cell).unwrap();
        let next = class.table().unwrap().get("next").unwrap();
        assert!(next.pointer);
        assert!(next.memoize);

        let value = Value::Struct(
            Record::new()
                .with("id", 1)
                .with("next", Record::new().with("id", 2).with("next", Value::Undefined)),
        );
        let decoded = codec.decode(&codec.encoder().encode_view(&value).unwrap()).unwrap();
        let first: Arc<Overlay> = decoded.into_overlay().unwrap();
        let second: Arc<Overlay> = first.get("next").unwrap().into_overlay().unwrap();
        assert!(first.is_cached("next"));
        assert_eq!(second.get("id"), Ok(Value::Int(2)));
        assert_eq!(second.get("next"), Ok(Value::Undefined));
    }

    fn reading(class: &Arc<OverlayClass>, humidity: bool) -> FormatRef {
        let mut fields = vec![
            ("id", Primitive::Uint16.into_format()),
            ("temperature", Primitive::Int16.into_format()),
        ];
        if humidity {
            fields.push(("humidity", Primitive::Uint32.into_format()));
        }
        with_overlay(struct_of(fields), class)
    }

    #[test]
    fn test_restored_layout_uses_archived_offsets() {
        let mut old_cache = Cache::new();
        let old_codec = old_cache.codec(&reading(&OverlayClass::new("Reading"), false)).unwrap();
        let text = archive(old_codec.layout()).unwrap();
        let blob = old_codec
            .encoder()
            .encode_view(&Value::Struct(Record::new().with("id", 7).with("temperature", -3)))
            .unwrap();

        let class = OverlayClass::new("Reading");
        let current = reading(&class, true);
        let mut cache = Cache::new();
        cache.codec(&current).unwrap();
        assert_eq!(class.table().unwrap().get("id").unwrap().offset, 4);

        let restored = restore(&text, &current, &mut cache).unwrap();
        let decoded = cache.codec_for(&restored).unwrap().decode(&blob).unwrap();
        let overlay: Arc<Overlay> = decoded.into_overlay().unwrap();
        assert_eq!(overlay.get("id"), Ok(Value::Int(7)));
        assert_eq!(overlay.get("temperature"), Ok(Value::Int(-3)));
        assert!(matches!(overlay.get("humidity"), Err(CodecError::UnknownField(_))));
        assert_eq!(class.table().unwrap().len(), 3);
    }
}
