//! Input subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open display: {0}")]
    DisplayOpen(String),

    #[error("failed to query cursor: {0}")]
    Query(String),

    #[error("failed to move cursor: {0}")]
    Warp(String),

    #[error("failed to inject key: {0}")]
    Inject(String),

    #[error("no monitors reported")]
    NoMonitors,

    #[error("backend not available on this platform")]
    Unavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
