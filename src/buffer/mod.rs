// Fri Jan 16 2026 - Alex

pub mod error;
pub mod object;
pub mod view;
pub mod writer;

pub use error::BufferError;
pub use object::BufferObject;
pub use view::{BufferView, ViewState};
pub use writer::ViewWriter;
