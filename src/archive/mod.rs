// Mon Jan 19 2026 - Alex

pub mod error;
pub mod render;
pub mod restore;
pub mod writer;

pub use error::ArchiveError;
pub use render::render;
pub use restore::{parse, ArchiveSource, Restorer};
pub use writer::{ArchiveWriter, ARCHIVE_HEADER};

use crate::cache::Cache;
use crate::config::ArchiveConfig;
use crate::format::FormatRef;
use crate::layout::LayoutRef;

/// Archives a resolved layout with the default settings.
pub fn archive(layout: &LayoutRef) -> Result<String, ArchiveError> {
    archive_with(layout, &ArchiveConfig::default())
}

pub fn archive_with(layout: &LayoutRef, config: &ArchiveConfig) -> Result<String, ArchiveError> {
    ArchiveWriter::new(config).write(layout)
}

/// Rebuilds an archived layout, taking interceptors from `template` at matching positions.
///
/// The archived offsets and traits win over whatever the template would resolve to today, so
/// buffers written by an older schema stay readable. The reader and writer for the result are
/// generated right away through `cache`.
pub fn restore(text: &str, template: &FormatRef, cache: &mut Cache) -> Result<LayoutRef, ArchiveError> {
    let source = parse(text)?;
    let layout = Restorer::new(&source, false).restore_root(Some(template))?;
    cache.make_reader_for(&layout)?;
    cache.make_writer_for(&layout)?;
    log::debug!(
        "Restored {} layout from {} declarations",
        layout.kind(),
        source.declarations.len()
    );
    Ok(layout)
}

/// Rebuilds an archived layout with no template. Composed nodes come back without interceptors.
pub fn restore_detached(text: &str) -> Result<LayoutRef, ArchiveError> {
    let source = parse(text)?;
    Restorer::new(&source, true).restore_root(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferView, ViewWriter};
    use crate::codec::CodecError;
    use crate::format::{
        compose_raw, constant, declare, define, enumerated, forward, optional, struct_of, tagged, transform,
        variant, vector, IntoFormat, Primitive, RawCodec,
    };
    use crate::layout::{structural_eq, Layout};
    use crate::value::{Record, Value};
    use std::sync::Arc;

    fn point() -> FormatRef {
        struct_of([
            ("x", Primitive::Int32.into_format()),
            ("y", Primitive::Int16.into_format()),
        ])
    }

    fn tenths() -> FormatRef {
        transform(
            Primitive::Int16,
            |raw| Ok(Value::Float(raw.as_f64().unwrap_or_default() / 10.0)),
            |value| {
                let degrees = value.as_f64().ok_or_else(|| CodecError::Intercept("not a number".to_string()))?;
                Ok(Value::Int((degrees * 10.0).round() as i64))
            },
        )
    }

    fn node() -> FormatRef {
        let node = forward("Node");
        define(
            &node,
            struct_of([
                ("value", Primitive::Int32.into_format()),
                ("children", vector(&node)),
                ("next", node.clone()),
            ]),
        )
        .unwrap();
        node
    }

    #[test]
    fn test_archive_text() {
        let mut cache = Cache::new();
        let layout = cache.resolve(&point()).unwrap();
        let text = archive(&layout).unwrap();
        assert_eq!(
            text,
            "// schema-pack layout archive\n\
             export default {\"struct\":{\"members\":{\
             \"x\":{\"layout\":\"int32\",\"offset\":0,\"pointer\":false},\
             \"y\":{\"layout\":\"int16\",\"offset\":4,\"pointer\":false}}},\
             \"traits\":{\"align\":4,\"size\":6,\"stride\":8}};\n"
        );
    }

    #[test]
    fn test_archive_without_header() {
        let mut cache = Cache::new();
        let layout = cache.resolve(&Primitive::Uint8.into_format()).unwrap();
        let config = ArchiveConfig {
            header: false,
            hoist_shared: true,
        };
        assert_eq!(archive_with(&layout, &config).unwrap(), "export default \"uint8\";\n");
    }

    #[test]
    fn test_restore_is_idempotent() {
        let format = struct_of([
            ("name", Primitive::String.into_format()),
            ("color", enumerated(["red", "green", "blue"])),
            ("version", constant(3)),
            ("scores", vector(Primitive::Double)),
            ("origin", optional(point())),
            ("tint", optional(Primitive::Uint8)),
            (
                "shape",
                variant([
                    tagged("circle", [("radius", Primitive::Uint16.into_format())]),
                    tagged("square", [("side", Primitive::Uint32.into_format())]),
                ]),
            ),
        ]);
        let mut cache = Cache::new();
        let layout = cache.resolve(&format).unwrap();
        let text = archive(&layout).unwrap();

        let restored = restore(&text, &format, &mut cache).unwrap();
        assert_eq!(archive(&restored).unwrap(), text);
        assert!(structural_eq(&layout, &restored));

        let detached = restore_detached(&text).unwrap();
        assert_eq!(archive(&detached).unwrap(), text);
    }

    #[test]
    fn test_shared_layouts_stay_shared() {
        let pair = point();
        let format = struct_of([("left", pair.clone()), ("right", pair)]);
        let mut cache = Cache::new();
        let layout = cache.resolve(&format).unwrap();
        let text = archive(&layout).unwrap();
        assert!(text.contains("const Shared1 = "));
        assert!(text.contains("{\"ref\":\"Shared1\"}"));

        let restored = restore(&text, &format, &mut cache).unwrap();
        let body = restored.as_struct().unwrap();
        let left = &body.member("left").unwrap().layout;
        let right = &body.member("right").unwrap().layout;
        assert!(Arc::ptr_eq(left, right));
    }

    #[test]
    fn test_shared_hoisting_can_be_disabled() {
        let pair = point();
        let format = struct_of([("left", pair.clone()), ("right", pair)]);
        let mut cache = Cache::new();
        let layout = cache.resolve(&format).unwrap();
        let config = ArchiveConfig {
            header: true,
            hoist_shared: false,
        };
        let text = archive_with(&layout, &config).unwrap();
        assert!(!text.contains("const "));
        assert!(structural_eq(&layout, &restore_detached(&text).unwrap()));
    }

    #[test]
    fn test_recursive_named_layout() {
        let format = node();
        let mut cache = Cache::new();
        let original = cache.codec(&format).unwrap();
        let text = archive(original.layout()).unwrap();
        assert!(text.contains("const Node = {\"named\":\"Node\""));
        assert!(text.contains("{\"list\":{\"ref\":\"Node\"}}"));

        let restored = restore(&text, &format, &mut cache).unwrap();
        assert!(matches!(restored.as_ref(), Layout::Named(named) if named.name() == "Node"));
        assert!(structural_eq(original.layout(), &restored));
        assert_eq!(archive(&restored).unwrap(), text);

        let leaf = |n: i64| Value::Struct(Record::new().with("value", n).with("children", Vec::<Value>::new()));
        let tree = Value::Struct(
            Record::new()
                .with("value", 1)
                .with("children", vec![leaf(2), leaf(3)])
                .with("next", leaf(4)),
        );
        let blob = BufferView::new(original.encode(&tree).unwrap());
        let decoded = cache.codec_for(&restored).unwrap().decode(&blob).unwrap();
        assert_eq!(decoded, original.decode(&blob).unwrap());
    }

    #[test]
    fn test_older_blob_reads_with_archived_offsets() {
        let old = struct_of([
            ("id", Primitive::Uint16.into_format()),
            ("temperature", tenths()),
        ]);
        let mut cache = Cache::new();
        let old_codec = cache.codec(&old).unwrap();
        let text = archive(old_codec.layout()).unwrap();
        let blob = BufferView::new(
            old_codec
                .encode(&Value::Struct(Record::new().with("id", 9).with("temperature", 21.5)))
                .unwrap(),
        );

        // Resolved from scratch, the new humidity field would sort first and move every offset.
        let newer = struct_of([
            ("id", Primitive::Uint16.into_format()),
            ("temperature", tenths()),
            ("humidity", Primitive::Uint32.into_format()),
        ]);
        let restored = restore(&text, &newer, &mut cache).unwrap();
        let decoded = cache.codec_for(&restored).unwrap().decode(&blob).unwrap();
        assert_eq!(decoded.field("id"), Some(&Value::Int(9)));
        assert_eq!(decoded.field("temperature"), Some(&Value::Float(21.5)));
        assert_eq!(decoded.field("humidity"), None);
    }

    #[test]
    fn test_detached_restore_drops_interceptors() {
        let format = struct_of([("temperature", tenths())]);
        let mut cache = Cache::new();
        let codec = cache.codec(&format).unwrap();
        let text = archive(codec.layout()).unwrap();
        assert!(text.contains("\"interceptor\":\"transform\""));
        let blob = BufferView::new(
            codec
                .encode(&Value::Struct(Record::new().with("temperature", 21.5)))
                .unwrap(),
        );

        let detached = restore_detached(&text).unwrap();
        let decoded = cache.codec_for(&detached).unwrap().decode(&blob).unwrap();
        assert_eq!(decoded.field("temperature"), Some(&Value::Int(215)));
    }

    struct Packed;

    impl RawCodec for Packed {
        fn read(&self, view: &BufferView, offset: usize) -> Result<Value, CodecError> {
            Ok(Value::Int(view.int16(offset)? as i64))
        }

        fn write(&self, value: &Value, target: &mut ViewWriter, offset: usize) -> Result<(), CodecError> {
            target.set_int16(offset, value.as_i64().unwrap_or_default() as i16)?;
            Ok(())
        }
    }

    #[test]
    fn test_interceptor_mismatch_is_unresolved() {
        let mut cache = Cache::new();
        let layout = cache.resolve(&struct_of([("temperature", tenths())])).unwrap();
        let text = archive(&layout).unwrap();

        let raw = struct_of([("temperature", compose_raw(Primitive::Int16, Packed))]);
        assert!(matches!(
            restore(&text, &raw, &mut cache),
            Err(ArchiveError::Unresolved { path, .. }) if path == "$.temperature"
        ));

        let plain = struct_of([("temperature", Primitive::Int16.into_format())]);
        assert!(matches!(
            restore(&text, &plain, &mut cache),
            Err(ArchiveError::Unresolved { path, .. }) if path == "$.temperature"
        ));
    }

    #[test]
    fn test_missing_template_member_is_unresolved() {
        let mut cache = Cache::new();
        let layout = cache.resolve(&point()).unwrap();
        let text = archive(&layout).unwrap();
        let template = struct_of([
            ("x", Primitive::Int32.into_format()),
            ("z", Primitive::Int16.into_format()),
        ]);
        assert!(matches!(
            restore(&text, &template, &mut cache),
            Err(ArchiveError::Unresolved { path, .. }) if path == "$.y"
        ));
    }

    #[test]
    fn test_named_mismatch_is_unresolved() {
        let mut cache = Cache::new();
        let layout = cache.resolve(&declare("Point", point())).unwrap();
        let text = archive(&layout).unwrap();
        assert!(text.contains("const Point = "));
        assert!(restore(&text, &declare("Point", point()), &mut cache).is_ok());
        assert!(matches!(
            restore(&text, &declare("Vertex", point()), &mut cache),
            Err(ArchiveError::Unresolved { .. })
        ));
    }

    #[test]
    fn test_template_wrapper_is_skipped() {
        let mut cache = Cache::new();
        let layout = cache.resolve(&point()).unwrap();
        let text = archive(&layout).unwrap();
        let restored = restore(&text, &declare("Point", point()), &mut cache).unwrap();
        assert_eq!(restored.kind(), "struct");
    }

    #[test]
    fn test_syntax_errors_report_lines() {
        let text = "// schema-pack layout archive\nconst Broken = {\"array\": ;\nexport default \"int8\";\n";
        assert!(matches!(parse(text), Err(ArchiveError::Syntax { line: 2, .. })));
        assert!(matches!(
            parse("const A = \"int8\";\n"),
            Err(ArchiveError::Syntax { .. })
        ));
        assert!(matches!(
            parse("export default \"int8\"; extra"),
            Err(ArchiveError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_and_duplicate_declarations() {
        assert_eq!(
            restore_detached("export default {\"ref\":\"Missing\"};").err(),
            Some(ArchiveError::UnknownDeclaration("Missing".to_string()))
        );
        assert_eq!(
            parse("const A = \"int8\";\nconst A = \"int16\";\nexport default {\"ref\":\"A\"};").err(),
            Some(ArchiveError::DuplicateDeclaration("A".to_string()))
        );
    }

    #[test]
    fn test_malformed_nodes() {
        assert!(matches!(
            restore_detached("export default \"int64\";"),
            Err(ArchiveError::Malformed { .. })
        ));
        assert!(matches!(
            restore_detached("export default {\"array\":\"int8\"};"),
            Err(ArchiveError::Malformed { path, .. }) if path == "$"
        ));
    }

    fn struct_archive(members: &str, traits: &str) -> String {
        format!("export default {{\"struct\":{{\"members\":{{{}}}}},\"traits\":{{{}}}}};", members, traits)
    }

    fn malformed_at(text: &str) -> Option<String> {
        match restore_detached(text) {
            Err(ArchiveError::Malformed { path, .. }) => Some(path),
            _ => None,
        }
    }

    #[test]
    fn test_archived_traits_are_checked() {
        let empty_list = "export default {\"list\":{\"struct\":{\"members\":{}},\"traits\":{\"align\":0,\"size\":0}}};";
        assert_eq!(malformed_at(empty_list), Some("$[]".to_string()));
        assert_eq!(malformed_at(&struct_archive("", "\"align\":3,\"size\":3")), Some("$".to_string()));
        assert_eq!(
            malformed_at(&struct_archive("", "\"align\":4,\"size\":6,\"stride\":6")),
            Some("$".to_string())
        );
        assert_eq!(
            malformed_at("export default {\"vector\":\"int32\",\"stride\":2};"),
            Some("$".to_string())
        );

        let ok = struct_archive(
            "\"a\":{\"layout\":\"int32\",\"offset\":0,\"pointer\":false}",
            "\"align\":4,\"size\":4,\"stride\":4",
        );
        let layout = restore_detached(&ok).unwrap();
        assert!(Cache::new().make_reader_for(&layout).is_ok());
    }

    #[test]
    fn test_archived_member_offsets_are_checked() {
        let traits = "\"align\":4,\"size\":8,\"stride\":8";
        let overlapping = struct_archive(
            "\"a\":{\"layout\":\"int32\",\"offset\":0,\"pointer\":false},\
             \"b\":{\"layout\":\"int16\",\"offset\":2,\"pointer\":false}",
            traits,
        );
        assert_eq!(malformed_at(&overlapping), Some("$.b".to_string()));

        let misaligned = struct_archive("\"a\":{\"layout\":\"int32\",\"offset\":2,\"pointer\":false}", traits);
        assert_eq!(malformed_at(&misaligned), Some("$.a".to_string()));

        let outside = struct_archive("\"a\":{\"layout\":\"double\",\"offset\":4,\"pointer\":false}", traits);
        assert_eq!(malformed_at(&outside), Some("$.a".to_string()));

        let past_end = struct_archive("\"a\":{\"layout\":\"int32\",\"offset\":8,\"pointer\":false}", traits);
        assert_eq!(malformed_at(&past_end), Some("$".to_string()));
    }
}
