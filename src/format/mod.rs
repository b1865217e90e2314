// Fri Jan 16 2026 - Alex

pub mod builder;
pub mod interceptor;
pub mod primitive;
pub mod typed;

pub use builder::{
    array, compose, compose_raw, constant, declare, define, enumerated, forward, optional, primitive,
    struct_extends, struct_of, tagged, transform, variant, vector, with_overlay, StructBuilder,
};
pub use interceptor::{FnTransform, Interceptor, RawCodec, Transform};
pub use primitive::Primitive;
pub use typed::{with_type, Typed};

use crate::value::Value;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

pub type FormatRef = Arc<Format>;

/// Declarative, unresolved description of a data shape. Immutable once built.
#[derive(Debug)]
pub enum Format {
    Primitive(Primitive),
    /// Fixed multiplicity known when the schema is written.
    Array { length: usize, element: FormatRef },
    /// Multiplicity decided at runtime.
    Vector(FormatRef),
    Optional(FormatRef),
    /// Index into at most 256 allowed values.
    Enum(Vec<Value>),
    /// Zero storage, always reproduces the value.
    Constant(Value),
    Struct(StructFormat),
    /// Tagged union over struct formats.
    Variant(Vec<FormatRef>),
    Composed { base: FormatRef, interceptor: Interceptor },
    Named(NamedFormat),
}

#[derive(Debug, Default)]
pub struct StructFormat {
    pub fields: Vec<(String, FormatRef)>,
    pub base: Option<FormatRef>,
    pub tag: Option<String>,
}

/// Stable identity for reuse and archival. Bound once; forward declarations bind later.
pub struct NamedFormat {
    name: String,
    target: OnceCell<FormatRef>,
}

impl NamedFormat {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            target: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Option<&FormatRef> {
        self.target.get()
    }

    pub(crate) fn bind(&self, format: FormatRef) -> bool {
        self.target.set(format).is_ok()
    }
}

impl fmt::Debug for NamedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Named({})", self.name)
    }
}

impl Format {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Array { .. } => "array",
            Self::Vector(_) => "vector",
            Self::Optional(_) => "optional",
            Self::Enum(_) => "enum",
            Self::Constant(_) => "constant",
            Self::Struct(_) => "struct",
            Self::Variant(_) => "variant",
            Self::Composed { .. } => "composed",
            Self::Named(_) => "named",
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(named) => Some(named.name()),
            _ => None,
        }
    }

    /// The struct behind any named or composed wrappers.
    pub fn as_struct(&self) -> Option<&StructFormat> {
        match self {
            Self::Struct(format) => Some(format),
            Self::Named(named) => named.target().and_then(|target| target.as_struct()),
            Self::Composed { base, .. } => base.as_struct(),
            _ => None,
        }
    }

    /// Tag carried by a struct (or inherited from its base).
    pub fn tag(&self) -> Option<&str> {
        let format = self.as_struct()?;
        match &format.tag {
            Some(tag) => Some(tag),
            None => format.base.as_ref().and_then(|base| base.tag()),
        }
    }
}

/// Anything usable where a format is expected.
pub trait IntoFormat {
    fn into_format(self) -> FormatRef;
}

impl IntoFormat for FormatRef {
    fn into_format(self) -> FormatRef {
        self
    }
}

impl IntoFormat for &FormatRef {
    fn into_format(self) -> FormatRef {
        self.clone()
    }
}

impl IntoFormat for Primitive {
    fn into_format(self) -> FormatRef {
        Arc::new(Format::Primitive(self))
    }
}

impl IntoFormat for Format {
    fn into_format(self) -> FormatRef {
        Arc::new(self)
    }
}
