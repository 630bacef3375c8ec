//! Daemon configuration loaded from TOML.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use logiflow_hidpp::RetryPolicy;
use logiflow_input::Modifier;
use logiflow_types::{Channel, EdgePosition, EdgeTarget, ReceiverProfile};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub receiver: ReceiverProfile,
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub keep_awake: KeepAwakeConfig,
    #[serde(default)]
    pub clipboard: ClipboardConfig,
    /// Evaluated by channel, lowest first; the first matching target wins.
    #[serde(default = "default_targets")]
    pub targets: Vec<EdgeTarget>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon: DaemonConfig::default(),
            receiver: ReceiverProfile::default(),
            flow: FlowConfig::default(),
            keep_awake: KeepAwakeConfig::default(),
            clipboard: ClipboardConfig::default(),
            targets: default_targets(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that parse but cannot be acted on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.len() > Channel::all().len() {
            return Err(ConfigError::TooManyTargets(self.targets.len()));
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.channel) {
                return Err(ConfigError::DuplicateChannel(target.channel));
            }
            if target.zone_size == 0 {
                return Err(ConfigError::ZeroZoneSize(target.channel));
            }
        }
        if self.daemon.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("daemon.poll_interval_ms"));
        }
        if self.daemon.transport_timeout_ms == 0 {
            return Err(ConfigError::ZeroInterval("daemon.transport_timeout_ms"));
        }
        if self.keep_awake.check_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("keep_awake.check_interval_secs"));
        }
        if self.keep_awake.keypress_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("keep_awake.keypress_interval_secs"));
        }
        Ok(())
    }

    /// Settings in `next` that differ from `self` but are only read at
    /// startup. A running daemon ignores changes to them.
    pub fn restart_required(&self, next: &Config) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if next.flow.enabled != self.flow.enabled {
            changed.push("flow.enabled");
        }
        if next.daemon.poll_interval_ms != self.daemon.poll_interval_ms {
            changed.push("daemon.poll_interval_ms");
        }
        if next.daemon.transport_timeout_ms != self.daemon.transport_timeout_ms {
            changed.push("daemon.transport_timeout_ms");
        }
        if next.daemon.hidapitester != self.daemon.hidapitester {
            changed.push("daemon.hidapitester");
        }
        if next.daemon.log_level != self.daemon.log_level {
            changed.push("daemon.log_level");
        }
        if next.keep_awake != self.keep_awake {
            changed.push("keep_awake");
        }
        if next.clipboard != self.clipboard {
            changed.push("clipboard");
        }
        changed
    }

    /// Targets that refer to an actual edge, in file order.
    pub fn enabled_targets(&self) -> impl Iterator<Item = &EdgeTarget> {
        self.targets.iter().filter(|t| t.is_enabled())
    }
}

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Explicit `hidapitester` path; the bundled build is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidapitester: Option<PathBuf>,
    /// Upper bound on one transport invocation.
    #[serde(default = "default_transport_timeout_ms")]
    pub transport_timeout_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_ms: default_poll_interval_ms(),
            hidapitester: None,
            transport_timeout_ms: default_transport_timeout_ms(),
        }
    }
}

impl DaemonConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.transport_timeout_ms),
            ..RetryPolicy::default()
        }
    }
}

/// Edge-switching behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Only switch while `modifier` is held.
    #[serde(default)]
    pub require_modifier: bool,
    #[serde(default)]
    pub modifier: Modifier,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_modifier: false,
            modifier: Modifier::default(),
        }
    }
}

impl FlowConfig {
    /// The modifier that must be held, if gating is on.
    pub fn gate(&self) -> Option<Modifier> {
        self.require_modifier.then_some(self.modifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepAwakeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_idle_threshold_secs")]
    pub idle_threshold_secs: u64,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_keypress_interval_secs")]
    pub keypress_interval_secs: u64,
}

impl Default for KeepAwakeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_threshold_secs: default_idle_threshold_secs(),
            check_interval_secs: default_check_interval_secs(),
            keypress_interval_secs: default_keypress_interval_secs(),
        }
    }
}

/// Uniclip launcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// Explicit `uniclip` path; the bundled build is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    /// Last server a client connected to, `IP:port`.
    #[serde(default = "default_server_address")]
    pub server_address: String,
    #[serde(default = "default_password")]
    pub password: String,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            executable: None,
            server_address: default_server_address(),
            password: default_password(),
        }
    }
}

fn default_targets() -> Vec<EdgeTarget> {
    Channel::all()
        .into_iter()
        .map(|channel| {
            if channel.get() == 1 {
                EdgeTarget::full(EdgePosition::Right, channel)
            } else {
                EdgeTarget::disabled(channel)
            }
        })
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_transport_timeout_ms() -> u64 {
    3000
}

fn default_idle_threshold_secs() -> u64 {
    45
}

fn default_check_interval_secs() -> u64 {
    10
}

fn default_keypress_interval_secs() -> u64 {
    30
}

fn default_server_address() -> String {
    "192.168.50.50".to_string()
}

fn default_password() -> String {
    "lcs1234".to_string()
}
