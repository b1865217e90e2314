// Fri Jan 16 2026 - Alex

use crate::buffer::{BufferView, ViewWriter};
use crate::codec::CodecError;
use crate::overlay::OverlayClass;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Logical value transform applied after a generic read and before a generic write.
pub trait Transform: Send + Sync {
    fn compose(&self, value: Value) -> Result<Value, CodecError>;
    fn decompose(&self, value: &Value) -> Result<Value, CodecError>;
}

/// Raw hook that owns the slot of its base format and bypasses the generic machinery.
pub trait RawCodec: Send + Sync {
    fn read(&self, view: &BufferView, offset: usize) -> Result<Value, CodecError>;
    fn write(&self, value: &Value, target: &mut ViewWriter, offset: usize) -> Result<(), CodecError>;
}

#[derive(Clone)]
pub enum Interceptor {
    Transform(Arc<dyn Transform>),
    Raw(Arc<dyn RawCodec>),
    /// Read produces an overlay instance of this class instead of a plain record.
    Overlay(Arc<OverlayClass>),
}

impl Interceptor {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transform(_) => "transform",
            Self::Raw(_) => "raw",
            Self::Overlay(_) => "overlay",
        }
    }

    /// Short label written into archives; the behavior itself is never serialized.
    pub fn label(&self) -> String {
        match self {
            Self::Overlay(class) => format!("overlay:{}", class.name()),
            other => other.kind().to_string(),
        }
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interceptor({})", self.label())
    }
}

/// `Transform` built from a pair of closures.
pub struct FnTransform<C, D> {
    compose: C,
    decompose: D,
}

impl<C, D> FnTransform<C, D>
where
    C: Fn(Value) -> Result<Value, CodecError> + Send + Sync,
    D: Fn(&Value) -> Result<Value, CodecError> + Send + Sync,
{
    pub fn new(compose: C, decompose: D) -> Self {
        Self { compose, decompose }
    }
}

impl<C, D> Transform for FnTransform<C, D>
where
    C: Fn(Value) -> Result<Value, CodecError> + Send + Sync,
    D: Fn(&Value) -> Result<Value, CodecError> + Send + Sync,
{
    fn compose(&self, value: Value) -> Result<Value, CodecError> {
        (self.compose)(value)
    }

    fn decompose(&self, value: &Value) -> Result<Value, CodecError> {
        (self.decompose)(value)
    }
}
