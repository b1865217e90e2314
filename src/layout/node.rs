// Sat Jan 17 2026 - Alex

use crate::format::{Interceptor, Primitive};
use crate::layout::{align_to, LayoutError, Traits, POINTER_WIDTH};
use crate::value::Value;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

pub type LayoutRef = Arc<Layout>;

/// Resolved, physical counterpart of a format node.
#[derive(Debug)]
pub enum Layout {
    Primitive(Primitive),
    Array(ArrayLayout),
    Vector(VectorLayout),
    Optional(OptionalLayout),
    Enum(Vec<Value>),
    Constant(Value),
    Struct(StructLayout),
    Variant(VariantLayout),
    Composed(ComposedLayout),
    Named(NamedLayout),
}

#[derive(Debug)]
pub struct ArrayLayout {
    pub length: usize,
    pub element: LayoutRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorKind {
    /// `u32 count`, `u32 data`; elements `stride` apart.
    Dense { stride: usize },
    /// `u32 head`; forward-chained nodes, each `u32 next` then the payload.
    List,
}

#[derive(Debug)]
pub struct VectorLayout {
    pub kind: VectorKind,
    pub element: LayoutRef,
}

impl VectorLayout {
    /// Offset of the payload inside a list node.
    pub fn node_payload(&self) -> usize {
        align_to(POINTER_WIDTH, self.element.traits().align)
    }

    pub fn node_align(&self) -> usize {
        self.element.traits().align.max(POINTER_WIDTH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalKind {
    /// Payload at the slot start, presence marker byte right after it.
    Inline { marker: usize },
    /// `u32` payload offset, zero when absent.
    Pointer,
}

#[derive(Debug)]
pub struct OptionalLayout {
    pub kind: OptionalKind,
    pub element: LayoutRef,
}

#[derive(Debug)]
pub struct MemberLayout {
    pub name: String,
    pub offset: usize,
    /// The slot holds a `u32` offset to the payload instead of the payload itself.
    pub pointer: bool,
    pub layout: LayoutRef,
}

impl MemberLayout {
    pub fn slot_traits(&self) -> Traits {
        if self.pointer {
            Traits::variable(POINTER_WIDTH, POINTER_WIDTH)
        } else {
            self.layout.traits()
        }
    }
}

#[derive(Debug)]
pub struct StructLayout {
    pub base: Option<LayoutRef>,
    /// Own members in physical order. Inherited members live in `base`.
    pub members: Vec<MemberLayout>,
    pub tag: Option<String>,
    pub traits: Traits,
}

impl StructLayout {
    pub fn member(&self, name: &str) -> Option<&MemberLayout> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn base_struct(&self) -> Option<&StructLayout> {
        self.base.as_deref().and_then(Layout::as_struct)
    }

    /// Tag of this struct, falling back to the base chain.
    pub fn effective_tag(&self) -> Option<&str> {
        match &self.tag {
            Some(tag) => Some(tag),
            None => self.base_struct().and_then(StructLayout::effective_tag),
        }
    }

    /// Inherited members first, then own members.
    pub fn all_members(&self) -> Vec<&MemberLayout> {
        let mut members = self.base_struct().map(StructLayout::all_members).unwrap_or_default();
        members.extend(self.members.iter());
        members
    }
}

#[derive(Debug)]
pub struct VariantLayout {
    pub arms: Vec<LayoutRef>,
}

impl VariantLayout {
    /// Header: `u32` payload offset then `u8` arm index.
    pub const HEADER_SIZE: usize = POINTER_WIDTH + 1;

    pub fn arm_tag(&self, index: usize) -> Option<&str> {
        self.arms
            .get(index)
            .and_then(|arm| arm.as_struct())
            .and_then(StructLayout::effective_tag)
    }
}

#[derive(Debug)]
pub struct ComposedLayout {
    pub layout: LayoutRef,
    /// Absent only for layouts restored without a template.
    pub interceptor: Option<Interceptor>,
}

/// Named identity. The target is bound right after resolution, which lets a named layout
/// appear inside its own definition.
pub struct NamedLayout {
    name: String,
    target: OnceCell<LayoutRef>,
}

impl NamedLayout {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            target: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Option<&LayoutRef> {
        self.target.get()
    }

    pub fn is_bound(&self) -> bool {
        self.target.get().is_some()
    }

    pub(crate) fn bind(&self, layout: LayoutRef) -> Result<(), LayoutError> {
        self.target
            .set(layout)
            .map_err(|_| LayoutError::AlreadyDefined(self.name.clone()))
    }
}

impl fmt::Debug for NamedLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Named({})", self.name)
    }
}

impl Layout {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Array(_) => "array",
            Self::Vector(_) => "vector",
            Self::Optional(_) => "optional",
            Self::Enum(_) => "enum",
            Self::Constant(_) => "constant",
            Self::Struct(_) => "struct",
            Self::Variant(_) => "variant",
            Self::Composed(_) => "composed",
            Self::Named(_) => "named",
        }
    }

    pub fn traits(&self) -> Traits {
        match self {
            Self::Primitive(primitive) => primitive.traits(),
            Self::Array(array) => {
                let element = array.element.traits();
                let stride = element.stride.unwrap_or(element.size);
                if array.length == 0 {
                    Traits::new(element.align, 0, Some(0))
                } else {
                    Traits::dense(element.align, (array.length - 1) * stride + element.size)
                }
            }
            Self::Vector(vector) => match vector.kind {
                VectorKind::Dense { .. } => Traits::variable(POINTER_WIDTH, POINTER_WIDTH * 2),
                VectorKind::List => Traits::variable(POINTER_WIDTH, POINTER_WIDTH),
            },
            Self::Optional(optional) => match optional.kind {
                OptionalKind::Inline { marker } => {
                    let element = optional.element.traits();
                    let size = marker + 1;
                    match element.stride {
                        Some(_) => Traits::dense(element.align, size),
                        None => Traits::variable(element.align, size),
                    }
                }
                OptionalKind::Pointer => Traits::variable(POINTER_WIDTH, POINTER_WIDTH),
            },
            Self::Enum(_) => Traits::fixed(1),
            Self::Constant(_) => Traits::new(1, 0, Some(0)),
            Self::Struct(layout) => layout.traits,
            Self::Variant(_) => Traits::variable(POINTER_WIDTH, VariantLayout::HEADER_SIZE),
            Self::Composed(composed) => composed.layout.traits(),
            // An unbound name only exists mid-resolution, where it is always stored behind a pointer.
            Self::Named(named) => named
                .target()
                .map(|target| target.traits())
                .unwrap_or_else(|| Traits::variable(POINTER_WIDTH, POINTER_WIDTH)),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(named) => Some(named.name()),
            _ => None,
        }
    }

    /// Follows named wrappers to the first structural node.
    pub fn unnamed(&self) -> &Layout {
        match self {
            Self::Named(named) => named.target().map_or(self, |target| target.unnamed()),
            other => other,
        }
    }

    /// The struct behind any named or composed wrappers.
    pub fn as_struct(&self) -> Option<&StructLayout> {
        match self {
            Self::Struct(layout) => Some(layout),
            Self::Named(named) => named.target().and_then(|target| target.as_struct()),
            Self::Composed(composed) => composed.layout.as_struct(),
            _ => None,
        }
    }

    /// Plain integer slots are cheap enough to re-read on every access.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Primitive(primitive) if primitive.is_integer())
    }

    /// True for a named layout whose definition is still being resolved.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Named(named) if !named.is_bound())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(primitive: Primitive) -> LayoutRef {
        Arc::new(Layout::Primitive(primitive))
    }

    #[test]
    fn test_array_traits_truncate_last_element() {
        let element = Arc::new(Layout::Struct(StructLayout {
            base: None,
            members: vec![],
            tag: None,
            traits: Traits::dense(4, 7),
        }));
        let array = Layout::Array(ArrayLayout { length: 3, element });
        assert_eq!(array.traits(), Traits::new(4, 23, Some(24)));
    }

    #[test]
    fn test_inline_optional_traits() {
        let optional = Layout::Optional(OptionalLayout {
            kind: OptionalKind::Inline { marker: 2 },
            element: int(Primitive::Uint16),
        });
        assert_eq!(optional.traits(), Traits::new(2, 3, Some(4)));
    }

    #[test]
    fn test_list_node_geometry() {
        let vector = VectorLayout {
            kind: VectorKind::List,
            element: int(Primitive::Double),
        };
        assert_eq!(vector.node_payload(), 8);
        assert_eq!(vector.node_align(), 8);
    }
}
