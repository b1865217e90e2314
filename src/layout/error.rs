// Tue Jan 13 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Array elements must have a fixed stride, got {0}")]
    UnsupportedArrayElement(String),
    #[error("Enum must have between 1 and 256 values, got {0}")]
    EnumArity(usize),
    #[error("Variant must have between 1 and 256 arms, got {0}")]
    VariantArity(usize),
    #[error("Variant arm {0} is not a tagged struct")]
    UntaggedArm(usize),
    #[error("Variant tag declared twice: {0}")]
    DuplicateTag(String),
    #[error("Struct base is not a struct: {0}")]
    InvalidBase(String),
    #[error("Struct member declared twice: {0}")]
    DuplicateMember(String),
    #[error("Named format {0} is used before it is defined")]
    Unbound(String),
    #[error("Named format {0} was already defined")]
    AlreadyDefined(String),
    #[error("Only named formats can be defined, got {0}")]
    NotNamed(&'static str),
    #[error("Named format {0} contains itself without indirection")]
    UnboundedRecursion(String),
    #[error("Overlay class {0} must wrap a struct")]
    OverlayTarget(String),
}
