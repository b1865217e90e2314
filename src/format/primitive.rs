// Fri Jan 16 2026 - Alex

use crate::layout::{Traits, POINTER_WIDTH};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Double,
    Bool,
    /// Length-prefixed opaque byte blob.
    Buffer,
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 10] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Double,
        Self::Bool,
        Self::Buffer,
        Self::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Buffer => "buffer",
            Self::String => "string",
        }
    }

    pub fn traits(self) -> Traits {
        match self {
            Self::Int8 | Self::Uint8 | Self::Bool => Traits::fixed(1),
            Self::Int16 | Self::Uint16 => Traits::fixed(2),
            Self::Int32 | Self::Uint32 => Traits::fixed(4),
            Self::Double => Traits::fixed(8),
            Self::Buffer | Self::String => Traits::variable(POINTER_WIDTH, POINTER_WIDTH * 2),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Uint8 | Self::Uint16 | Self::Uint32
        )
    }

    /// Inclusive value range of integer kinds.
    pub fn range(self) -> Option<(i64, i64)> {
        match self {
            Self::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Uint8 => Some((0, u8::MAX as i64)),
            Self::Uint16 => Some((0, u16::MAX as i64)),
            Self::Uint32 => Some((0, u32::MAX as i64)),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Primitive {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("Unknown primitive: {}", s))
    }
}
