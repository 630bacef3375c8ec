//! Core daemon for logiflow.
//!
//! Owns the edge-switching coordinator, the keep-awake task, and the
//! clipboard launcher, and wires them to the configuration file.

pub mod config;
pub mod daemon;
pub mod error;
pub mod flow;
pub mod keepawake;
pub mod setup;
pub mod state;

pub use config::Config;
pub use daemon::{ClipboardMode, Daemon, DaemonEvent, Services};
pub use error::{ConfigError, DaemonError};
pub use flow::{FlowSettings, SwitchCompletion, SwitchCoordinator};
pub use keepawake::{KeepAwake, KeepAwakeTiming};
pub use state::SwitchState;
