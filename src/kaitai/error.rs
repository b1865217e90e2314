// Tue Jan 20 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("Named layout {0} is not bound")]
    Unbound(String),
    #[error("Constant {0} has no Kaitai literal form")]
    UnsupportedConstant(String),
}
