// Sat Jan 17 2026 - Alex

use crate::codec::CodecError;
use crate::format::{
    Format, FormatRef, FnTransform, Interceptor, IntoFormat, NamedFormat, Primitive, RawCodec, StructFormat,
    Transform,
};
use crate::layout::LayoutError;
use crate::overlay::OverlayClass;
use crate::value::Value;
use std::sync::Arc;

pub fn primitive(kind: Primitive) -> FormatRef {
    Arc::new(Format::Primitive(kind))
}

pub fn array(length: usize, element: impl IntoFormat) -> FormatRef {
    Arc::new(Format::Array {
        length,
        element: element.into_format(),
    })
}

pub fn vector(element: impl IntoFormat) -> FormatRef {
    Arc::new(Format::Vector(element.into_format()))
}

pub fn optional(element: impl IntoFormat) -> FormatRef {
    Arc::new(Format::Optional(element.into_format()))
}

pub fn enumerated<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> FormatRef {
    Arc::new(Format::Enum(values.into_iter().map(Into::into).collect()))
}

pub fn constant(value: impl Into<Value>) -> FormatRef {
    Arc::new(Format::Constant(value.into()))
}

/// Untagged struct without a base.
pub fn struct_of<F: IntoFormat>(fields: impl IntoIterator<Item = (&'static str, F)>) -> FormatRef {
    fields
        .into_iter()
        .fold(StructBuilder::new(), |builder, (name, format)| builder.field(name, format))
        .build()
}

/// Struct that starts with all members of `base`.
pub fn struct_extends<F: IntoFormat>(
    base: impl IntoFormat,
    fields: impl IntoIterator<Item = (&'static str, F)>,
) -> FormatRef {
    fields
        .into_iter()
        .fold(StructBuilder::new().extends(base), |builder, (name, format)| builder.field(name, format))
        .build()
}

/// Tagged struct, usable as a variant arm.
pub fn tagged<F: IntoFormat>(tag: &str, fields: impl IntoIterator<Item = (&'static str, F)>) -> FormatRef {
    fields
        .into_iter()
        .fold(StructBuilder::new().tag(tag), |builder, (name, format)| builder.field(name, format))
        .build()
}

pub fn variant(arms: impl IntoIterator<Item = FormatRef>) -> FormatRef {
    Arc::new(Format::Variant(arms.into_iter().collect()))
}

pub fn compose(base: impl IntoFormat, transform: impl Transform + 'static) -> FormatRef {
    Arc::new(Format::Composed {
        base: base.into_format(),
        interceptor: Interceptor::Transform(Arc::new(transform)),
    })
}

/// `compose` with a pair of closures.
pub fn transform<C, D>(base: impl IntoFormat, compose_fn: C, decompose_fn: D) -> FormatRef
where
    C: Fn(Value) -> Result<Value, CodecError> + Send + Sync + 'static,
    D: Fn(&Value) -> Result<Value, CodecError> + Send + Sync + 'static,
{
    compose(base, FnTransform::new(compose_fn, decompose_fn))
}

pub fn compose_raw(base: impl IntoFormat, codec: impl RawCodec + 'static) -> FormatRef {
    Arc::new(Format::Composed {
        base: base.into_format(),
        interceptor: Interceptor::Raw(Arc::new(codec)),
    })
}

/// Tags `class` with the shape of `base`: reads yield instances of the class over the buffer.
pub fn with_overlay(base: impl IntoFormat, class: &Arc<OverlayClass>) -> FormatRef {
    Arc::new(Format::Composed {
        base: base.into_format(),
        interceptor: Interceptor::Overlay(class.clone()),
    })
}

pub fn declare(name: &str, format: impl IntoFormat) -> FormatRef {
    let named = NamedFormat::new(name);
    named.bind(format.into_format());
    Arc::new(Format::Named(named))
}

/// Named placeholder to be bound later with `define`, for self-referential formats.
pub fn forward(name: &str) -> FormatRef {
    Arc::new(Format::Named(NamedFormat::new(name)))
}

pub fn define(declaration: &FormatRef, format: impl IntoFormat) -> Result<(), LayoutError> {
    match declaration.as_ref() {
        Format::Named(named) => {
            if named.bind(format.into_format()) {
                Ok(())
            } else {
                Err(LayoutError::AlreadyDefined(named.name().to_string()))
            }
        }
        other => Err(LayoutError::NotNamed(other.kind())),
    }
}

/// Builder for structs with a base or a tag.
#[derive(Default)]
pub struct StructBuilder {
    format: StructFormat,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, format: impl IntoFormat) -> Self {
        self.format.fields.push((name.to_string(), format.into_format()));
        self
    }

    pub fn extends(mut self, base: impl IntoFormat) -> Self {
        self.format.base = Some(base.into_format());
        self
    }

    /// Marks this struct as one arm of a variant.
    pub fn tag(mut self, tag: &str) -> Self {
        self.format.tag = Some(tag.to_string());
        self
    }

    pub fn build(self) -> FormatRef {
        Arc::new(Format::Struct(self.format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_binds_once() {
        let node = forward("Node");
        define(&node, struct_of([("value", Primitive::Int32)])).unwrap();
        assert_eq!(
            define(&node, Primitive::Int8),
            Err(LayoutError::AlreadyDefined("Node".to_string()))
        );
        assert_eq!(node.name(), Some("Node"));
        assert!(node.as_struct().is_some());
    }

    #[test]
    fn test_tag_is_inherited() {
        let base = StructBuilder::new().tag("creep").field("id", Primitive::String).build();
        let derived = StructBuilder::new().extends(&base).field("hits", Primitive::Int32).build();
        assert_eq!(derived.tag(), Some("creep"));
    }
}
