// Tue Jan 13 2026 - Alex

pub mod alignment;
pub mod compare;
pub mod describe;
pub mod error;
pub mod node;
pub mod resolver;
pub mod traits;

pub use alignment::{align_to, is_aligned, POINTER_WIDTH};
pub use compare::structural_eq;
pub use describe::describe;
pub use error::LayoutError;
pub use node::{
    ArrayLayout, ComposedLayout, Layout, LayoutRef, MemberLayout, NamedLayout, OptionalKind, OptionalLayout,
    StructLayout, VariantLayout, VectorKind, VectorLayout,
};
pub use resolver::{Resolver, INLINE_OPTIONAL_LIMIT};
pub use traits::Traits;
