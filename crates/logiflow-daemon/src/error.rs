//! Daemon errors.

use std::path::PathBuf;

use logiflow_types::Channel;
use thiserror::Error;

/// A settings file that could not be read, parsed, or written.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("at most 3 targets may be configured, found {0}")]
    TooManyTargets(usize),

    #[error("channel {0} is assigned to more than one target")]
    DuplicateChannel(Channel),

    #[error("target for channel {0} has a zero zone size")]
    ZeroZoneSize(Channel),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HID transport unavailable: {0}")]
    Transport(#[from] logiflow_hidpp::TransportError),

    #[error("input error: {0}")]
    Input(#[from] logiflow_input::InputError),

    #[error("clipboard error: {0}")]
    Clipboard(#[from] logiflow_clipboard::ClipboardError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
