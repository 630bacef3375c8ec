//! HID transport errors.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no bundled HID transport for {os}/{arch}")]
    Unsupported { os: String, arch: String },

    #[error("HID transport executable not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to start HID transport: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("HID transport produced no output")]
    NoOutput,

    #[error("HID transport timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TransportError {
    /// Whether no transport can ever be started on this host.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unsupported { .. } | Self::NotFound(_))
    }
}
