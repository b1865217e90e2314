// Sat Jan 17 2026 - Alex

use crate::buffer::BufferError;
use crate::layout::LayoutError;
use thiserror::Error;

/// Failures while generating or running readers and writers.
///
/// Apart from `Layout`, `Unbound` and `NotInjected`, these are data errors: they describe one
/// blob or one value and never a broken schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },
    #[error("Value {value} does not fit in {kind}")]
    ValueOutOfRange { kind: &'static str, value: String },
    #[error("Expected {expected} elements, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Value is not one of the enum values: {0}")]
    UnknownEnumValue(String),
    #[error("No variant arm is tagged {0}")]
    UnknownVariantTag(String),
    #[error("Enum index {index} out of range for {count} values")]
    EnumIndexOutOfRange { index: usize, count: usize },
    #[error("Variant index {index} out of range for {count} arms")]
    VariantIndexOutOfRange { index: usize, count: usize },
    #[error("Malformed {detail} at offset {offset}")]
    MalformedLength { offset: usize, detail: &'static str },
    #[error("Invalid UTF-16 string data at offset {offset}")]
    InvalidUtf16 { offset: usize },
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
    #[error("Interceptor failed: {0}")]
    Intercept(String),
    #[error("Named layout {0} has no target")]
    Unbound(String),
    #[error("Overlay class {0} has not been injected")]
    NotInjected(String),
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
}
