// Sat Jan 17 2026 - Alex

pub mod error;
pub mod handle;
pub mod reader;
pub mod string;
pub mod writer;

pub use error::CodecError;
pub use handle::{Codec, Decoder, Encoder, TypedCodec};
pub use reader::{Reader, ReaderSet};
pub use string::{read_string, write_string};
pub use writer::{Writer, WriterSet};
