// Tue Jan 20 2026 - Alex

pub mod error;
pub mod exporter;

pub use error::ExportError;
pub use exporter::{snake_case, KaitaiExporter};

use crate::config::KaitaiConfig;
use crate::layout::LayoutRef;

/// Kaitai Struct (`.ksy`) description of `layout`, for inspecting blobs with third-party tools.
pub fn export_declaration(layout: &LayoutRef, version: u32, config: &KaitaiConfig) -> Result<String, ExportError> {
    KaitaiExporter::new(config).export(layout, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::format::{
        array, constant, define, enumerated, forward, optional, struct_of, tagged, variant, vector, FormatRef,
        IntoFormat, Primitive,
    };
    use crate::layout::{Layout, NamedLayout};
    use crate::value::Value;
    use std::sync::Arc;

    fn export(format: &FormatRef) -> String {
        let mut cache = Cache::new();
        let layout = cache.resolve(format).unwrap();
        export_declaration(&layout, 3, &KaitaiConfig::default()).unwrap()
    }

    fn point() -> FormatRef {
        struct_of([
            ("x", Primitive::Int32.into_format()),
            ("y", Primitive::Int16.into_format()),
        ])
    }

    #[test]
    fn test_struct_declaration() {
        assert_eq!(
            export(&point()),
            "meta:\n\
             \x20 id: schema_pack\n\
             \x20 endian: le\n\
             doc: Layout version 3\n\
             seq:\n\
             \x20 - id: root\n\
             \x20   type: struct_1(0)\n\
             types:\n\
             \x20 struct_1:\n\
             \x20   params:\n\
             \x20     - id: ofs\n\
             \x20       type: u4\n\
             \x20   instances:\n\
             \x20     x:\n\
             \x20       pos: ofs\n\
             \x20       type: s4\n\
             \x20     y:\n\
             \x20       pos: ofs + 4\n\
             \x20       type: s2\n"
        );
    }

    #[test]
    fn test_strings_and_vectors() {
        let ksy = export(&struct_of([
            ("name", Primitive::String.into_format()),
            ("scores", vector(Primitive::Double)),
            ("labels", vector(Primitive::String)),
        ]));
        assert!(ksy.contains("  schema_string:\n"));
        assert!(ksy.contains("encoding: UTF-16LE"));
        assert!(ksy.contains("encoding: ISO-8859-1"));
        assert!(ksy.contains("  dense_f8:\n"));
        assert!(ksy.contains("  dense_schema_string:\n"));
        assert!(ksy.contains("type: schema_string(data + _index * 8)"));
        assert!(ksy.contains("repeat-expr: count"));
        assert_eq!(ksy.matches("  schema_string:\n").count(), 1);
    }

    #[test]
    fn test_recursive_list() {
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
        let ksy = export(&node);
        assert!(ksy.contains("    type: node(0)\n"));
        assert!(ksy.contains("  node:\n"));
        assert!(ksy.contains("  list_node:\n"));
        assert!(ksy.contains("type: list_node_node(next)"));
        assert!(ksy.contains("      next_ofs:\n"));
        assert!(ksy.contains("type: node(next_ofs)"));
        assert!(ksy.contains("if: next_ofs != 0"));
    }

    #[test]
    fn test_variant_switch() {
        let ksy = export(&variant([
            tagged("circle", [("radius", Primitive::Uint16.into_format())]),
            tagged("square", [("side", Primitive::Uint32.into_format())]),
        ]));
        assert!(ksy.contains("switch-on: arm"));
        assert!(ksy.contains("0: circle(data)"));
        assert!(ksy.contains("1: square(data)"));
        assert!(ksy.contains("doc: \"tag circle\""));
    }

    #[test]
    fn test_enums_constants_arrays_optionals() {
        let ksy = export(&struct_of([
            ("color", enumerated(["red", "dark green"])),
            ("version", constant("v1")),
            ("grid", array(3, Primitive::Int16)),
            ("origin", optional(point())),
        ]));
        assert!(ksy.contains("enums:\n"));
        assert!(ksy.contains("    0: red\n    1: dark_green\n"));
        assert!(ksy.contains("enum: enum_"));
        assert!(ksy.contains("value: \"'v1'\""));
        assert!(ksy.contains("repeat-expr: 3"));
        assert!(ksy.contains("pos: ofs + 6"));
        assert!(ksy.contains("if: present != 0"));
    }

    #[test]
    fn test_enum_vector_keeps_its_enum() {
        let ksy = export(&struct_of([
            ("bytes", vector(Primitive::Uint8)),
            ("colors", vector(enumerated(["red", "green"]))),
        ]));
        assert!(ksy.contains("  dense_u1:\n"));
        assert!(ksy.contains("  dense_enum_2:\n"));
        assert!(ksy.contains("enum: enum_2"));
        assert!(ksy.contains("type: dense_enum_2(ofs + 8)"));
    }

    #[test]
    fn test_config_and_version() {
        let mut cache = Cache::new();
        let layout = cache.resolve(&Primitive::Uint32.into_format()).unwrap();
        let config = KaitaiConfig {
            id: "sensor_log".to_string(),
            title: Some("Sensor: log".to_string()),
        };
        let ksy = export_declaration(&layout, 7, &config).unwrap();
        assert!(ksy.starts_with("meta:\n  id: sensor_log\n  title: \"Sensor: log\"\n  endian: le\n"));
        assert!(ksy.contains("doc: Layout version 7\n"));
        assert!(ksy.contains("    type: u4\n"));
        assert!(!ksy.contains("types:"));
    }

    #[test]
    fn test_errors() {
        let ghost: LayoutRef = Arc::new(Layout::Named(NamedLayout::new("Ghost")));
        assert_eq!(
            export_declaration(&ghost, 1, &KaitaiConfig::default()),
            Err(ExportError::Unbound("Ghost".to_string()))
        );

        let mut cache = Cache::new();
        let layout = cache.resolve(&constant(Value::Array(vec![]))).unwrap();
        assert!(matches!(
            export_declaration(&layout, 1, &KaitaiConfig::default()),
            Err(ExportError::UnsupportedConstant(_))
        ));
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("HitPoints"), "hit_points");
        assert_eq!(snake_case("hit-points"), "hit_points");
        assert_eq!(snake_case("9lives"), "n_9lives");
        assert_eq!(snake_case(""), "unnamed");
    }
}
