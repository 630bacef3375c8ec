//! Clipboard launcher errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("no bundled uniclip for {os}/{arch}")]
    Unsupported { os: String, arch: String },

    #[error("uniclip executable not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to start uniclip: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("invalid server address {0:?} (expected IP:port)")]
    InvalidAddress(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
