// Tue Jan 20 2026 - Alex

pub mod archive;
pub mod buffer;
pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod kaitai;
pub mod layout;
pub mod overlay;
pub mod value;

pub use archive::{archive, archive_with, restore, restore_detached, ArchiveError};
pub use buffer::{BufferError, BufferObject, BufferView, ViewWriter};
pub use cache::{Cache, CacheStats};
pub use codec::{Codec, CodecError, Decoder, Encoder, TypedCodec};
pub use config::Config;
pub use error::{Error, Result};
pub use format::{Format, FormatRef, IntoFormat, Primitive};
pub use kaitai::{export_declaration, ExportError};
pub use layout::{Layout, LayoutError, LayoutRef, Traits};
pub use overlay::{Overlay, OverlayClass, OverlayType};
pub use value::{FromValue, Record, ToValue, Value};
