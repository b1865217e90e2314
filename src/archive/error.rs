// Mon Jan 19 2026 - Alex

use crate::codec::CodecError;
use crate::layout::LayoutError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArchiveError {
    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("Unknown declaration: {0}")]
    UnknownDeclaration(String),
    #[error("Declaration {0} appears twice")]
    DuplicateDeclaration(String),
    #[error("Layout name {0} is not a valid identifier")]
    InvalidName(String),
    #[error("Malformed layout at {path}: {reason}")]
    Malformed { path: String, reason: String },
    #[error("Cannot resolve {path} against the template: {reason}")]
    Unresolved { path: String, reason: String },
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}
