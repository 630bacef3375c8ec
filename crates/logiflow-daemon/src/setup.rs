//! Config persistence and resolution of bundled executables.

use std::path::{Path, PathBuf};

use logiflow_clipboard::{ClipboardError, Uniclip};
use logiflow_hidpp::{HidapiTester, TransportError};
use logiflow_input::{Displays, InputError};
use logiflow_types::ScreenBounds;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ConfigError;

/// How [`open_config`] obtained its configuration.
#[derive(Debug)]
pub enum ConfigSource {
    /// Read from an existing file.
    Loaded,
    /// The file was missing and the defaults were written to it.
    Created,
    /// The file was missing and writing the defaults failed.
    Defaults(ConfigError),
}

impl ConfigSource {
    /// Log the outcome. Callers that set up logging from the loaded config
    /// call this once the subscriber is installed.
    pub fn report(&self, path: &Path) {
        match self {
            Self::Loaded => info!(path = %path.display(), "loaded config"),
            Self::Created => info!(path = %path.display(), "wrote default config"),
            Self::Defaults(e) => warn!(error = %e, "no config file found, using defaults"),
        }
    }
}

/// Read the config at `path` without logging.
///
/// A missing file yields the defaults, which are written back so the user
/// has something to edit.
pub fn open_config(path: &Path) -> Result<(Config, ConfigSource), ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok((Config::from_toml(&content)?, ConfigSource::Loaded));
    }

    let config = Config::default();
    let source = match save_config(&config, path) {
        Ok(()) => ConfigSource::Created,
        Err(e) => ConfigSource::Defaults(e),
    };
    Ok((config, source))
}

/// Load configuration from the given path, or the default location, and
/// log where it came from.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path.map_or_else(default_config_path, Path::to_path_buf);
    let (config, source) = open_config(&config_path)?;
    source.report(&config_path);
    Ok(config)
}

/// Write `config` to `path`, readable only by the owner on Unix.
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text).map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(write_err)?;
    }
    Ok(())
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("logiflow")
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Directory holding the bundled `hidapitester/` and `uniclip/` builds,
/// next to the running executable.
pub fn data_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default()
        .join("data")
}

/// Find the HID transport: the configured override, else the bundled build.
pub fn resolve_transport(config: &Config) -> Result<HidapiTester, TransportError> {
    let tester = match &config.daemon.hidapitester {
        Some(path) => HidapiTester::from_path(path)?,
        None => HidapiTester::locate(&data_dir().join("hidapitester"))?,
    };
    info!(path = %tester.executable().display(), "using hidapitester");
    Ok(tester)
}

/// Find the uniclip launcher: the configured override, else the bundled build.
pub fn resolve_uniclip(config: &Config) -> Result<Uniclip, ClipboardError> {
    match &config.clipboard.executable {
        Some(path) => Uniclip::from_path(path),
        None => Uniclip::locate(&data_dir().join("uniclip")),
    }
}

/// Envelope of every monitor `displays` reports.
pub fn screen_bounds(displays: &dyn Displays) -> Result<ScreenBounds, InputError> {
    let monitors = displays.monitors()?;
    let bounds = ScreenBounds::from_monitors(&monitors).ok_or(InputError::NoMonitors)?;
    info!(
        monitors = monitors.len(),
        left = bounds.left,
        right = bounds.right,
        top = bounds.top,
        bottom = bounds.bottom,
        "desktop bounds"
    );
    Ok(bounds)
}
