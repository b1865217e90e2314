// Tue Jan 20 2026 - Alex

use crate::archive::ArchiveError;
use crate::buffer::BufferError;
use crate::codec::CodecError;
use crate::config::ConfigError;
use crate::kaitai::ExportError;
use crate::layout::LayoutError;
use thiserror::Error;

/// Any failure surfaced by the library, for callers that do not care which stage failed.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn fails() -> Result<()> {
        Err(LayoutError::Unbound("Node".to_string()).into())
    }

    #[test]
    fn test_conversion_keeps_message() {
        let err = fails().unwrap_err();
        assert!(matches!(err, Error::Layout(_)));
        assert_eq!(err.to_string(), "Named format Node is used before it is defined");
    }

    #[test]
    fn test_nested_codec_error() {
        let err: Error = CodecError::from(BufferError::Detached).into();
        assert!(matches!(err, Error::Codec(CodecError::Buffer(BufferError::Detached))));
    }
}
