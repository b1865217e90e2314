// Sun Jan 18 2026 - Alex

use crate::layout::{Layout, LayoutRef, OptionalKind, VectorKind};
use ahash::AHashSet;
use std::sync::Arc;

/// Indented tree of a layout with member offsets and traits. Named layouts expand once.
pub fn describe(layout: &LayoutRef) -> String {
    let mut out = String::new();
    let mut expanded = AHashSet::new();
    describe_node(&mut out, layout, 0, &mut expanded);
    out
}

fn describe_node(out: &mut String, layout: &LayoutRef, depth: usize, expanded: &mut AHashSet<usize>) {
    let traits = layout.traits();
    match layout.as_ref() {
        Layout::Named(named) => {
            let first = expanded.insert(Arc::as_ptr(layout) as usize);
            match named.target() {
                Some(target) if first => {
                    out.push_str(&format!("{} = ", named.name()));
                    describe_node(out, target, depth, expanded);
                }
                _ => out.push_str(&format!("{} {}\n", named.name(), traits)),
            }
        }
        Layout::Primitive(primitive) => out.push_str(&format!("{} {}\n", primitive, traits)),
        Layout::Array(array) => {
            out.push_str(&format!("array[{}] {} of ", array.length, traits));
            describe_node(out, &array.element, depth, expanded);
        }
        Layout::Vector(vector) => {
            match vector.kind {
                VectorKind::Dense { stride } => out.push_str(&format!("vector(dense, stride {}) {} of ", stride, traits)),
                VectorKind::List => out.push_str(&format!("vector(list) {} of ", traits)),
            }
            describe_node(out, &vector.element, depth, expanded);
        }
        Layout::Optional(optional) => {
            match optional.kind {
                OptionalKind::Inline { marker } => out.push_str(&format!("optional(marker @{}) {} of ", marker, traits)),
                OptionalKind::Pointer => out.push_str(&format!("optional(pointer) {} of ", traits)),
            }
            describe_node(out, &optional.element, depth, expanded);
        }
        Layout::Enum(values) => out.push_str(&format!("enum({} values) {}\n", values.len(), traits)),
        Layout::Constant(value) => out.push_str(&format!("constant {:?}\n", value)),
        Layout::Struct(body) => {
            match body.effective_tag() {
                Some(tag) => out.push_str(&format!("struct '{}' {}\n", tag, traits)),
                None => out.push_str(&format!("struct {}\n", traits)),
            }
            let pad = "  ".repeat(depth + 1);
            for member in body.all_members() {
                let marker = if member.pointer { "*" } else { "" };
                out.push_str(&format!("{}@{} {}{}: ", pad, member.offset, marker, member.name));
                describe_node(out, &member.layout, depth + 1, expanded);
            }
        }
        Layout::Variant(variant) => {
            out.push_str(&format!("variant {}\n", traits));
            let pad = "  ".repeat(depth + 1);
            for (index, arm) in variant.arms.iter().enumerate() {
                out.push_str(&format!("{}#{} ", pad, index));
                describe_node(out, arm, depth + 1, expanded);
            }
        }
        Layout::Composed(composed) => {
            let label = composed
                .interceptor
                .as_ref()
                .map_or_else(|| "detached".to_string(), |interceptor| interceptor.label());
            out.push_str(&format!("composed({}) ", label));
            describe_node(out, &composed.layout, depth, expanded);
        }
    }
}
