//! logiflow CLI: move a Logitech receiver between computers by pushing the
//! cursor against a screen edge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use logiflow_daemon::{setup, ClipboardMode, Config, Daemon, DaemonEvent, Services};
use logiflow_hidpp::{encode_switch, CommandRunner};
use logiflow_types::{Channel, DeviceKind};
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "logiflow",
    about = "Switch a Logitech receiver between computers at the screen edge",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon in the foreground.
    Run {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not switch channels at screen edges.
        #[arg(long)]
        no_flow: bool,

        /// Keep the session awake with synthetic input.
        #[arg(long)]
        keep_awake: bool,

        /// Start a uniclip server and print its address.
        #[arg(long, conflicts_with = "clipboard_connect")]
        clipboard_server: bool,

        /// Join a uniclip server (IP:port). Uses the last address when omitted.
        #[arg(long, value_name = "ADDR", num_args = 0..=1)]
        clipboard_connect: Option<Option<String>>,
    },

    /// Switch keyboard and mouse to a channel once and exit.
    Switch {
        #[arg(value_parser = parse_channel)]
        channel: Channel,

        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the HID++ report that switches to a channel.
    Encode {
        #[arg(value_parser = parse_channel)]
        channel: Channel,

        /// Only print the report for one device.
        #[arg(long, value_enum)]
        device: Option<Device>,

        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file.
    Init {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration.
    Show {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration file path.
    Path,
}

#[derive(Clone, Copy, ValueEnum)]
enum Device {
    Keyboard,
    Mouse,
}

impl From<Device> for DeviceKind {
    fn from(device: Device) -> Self {
        match device {
            Device::Keyboard => Self::Keyboard,
            Device::Mouse => Self::Mouse,
        }
    }
}

fn parse_channel(text: &str) -> Result<Channel, String> {
    let number: u8 = text
        .parse()
        .map_err(|_| format!("{text:?} is not a channel number"))?;
    Channel::new(number).map_err(|e| e.to_string())
}

fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            no_flow,
            keep_awake,
            clipboard_server,
            clipboard_connect,
        } => {
            let path = config.unwrap_or_else(setup::default_config_path);
            let (mut config, source) = setup::open_config(&path)?;
            init_logging(&config.daemon.log_level);
            source.report(&path);

            let mut services = Services::from_config(&config);
            services.flow &= !no_flow;
            services.keep_awake |= keep_awake;
            services.clipboard = if clipboard_server {
                ClipboardMode::Server
            } else if let Some(address) = clipboard_connect {
                let address = address.unwrap_or_else(|| config.clipboard.server_address.clone());
                logiflow_clipboard::validate_address(&address)?;
                remember_server(&mut config, &path, &address);
                ClipboardMode::Client(address)
            } else {
                ClipboardMode::Off
            };

            run(config, path, services).await?;
        }
        Commands::Switch { channel, config } => {
            let path = config.unwrap_or_else(setup::default_config_path);
            let (config, source) = setup::open_config(&path)?;
            init_logging(&config.daemon.log_level);
            source.report(&path);

            let transport = setup::resolve_transport(&config)?;
            let runner = CommandRunner::with_policy(Arc::new(transport), config.daemon.retry_policy());
            let outcome = runner.switch_channel(&config.receiver, channel).await;
            if !outcome.is_success() {
                anyhow::bail!(
                    "switch to channel {channel} incomplete (keyboard: {}, mouse: {})",
                    outcome.keyboard,
                    outcome.mouse
                );
            }
            println!("Switched to channel {channel}");
        }
        Commands::Encode {
            channel,
            device,
            config,
        } => {
            init_logging("warn");
            let config = setup::load_config(config.as_deref())?;
            let devices = match device {
                Some(device) => vec![DeviceKind::from(device)],
                None => vec![DeviceKind::Keyboard, DeviceKind::Mouse],
            };
            for device in devices {
                let command = encode_switch(&config.receiver, device, channel);
                println!("{device}: {}", command.hex_list());
            }
        }
        Commands::Config { action } => {
            init_logging("warn");
            config_command(action)?;
        }
    }

    Ok(())
}

async fn run(config: Config, path: PathBuf, services: Services) -> anyhow::Result<()> {
    let runner = if services.flow {
        let transport = setup::resolve_transport(&config)?;
        Some(CommandRunner::with_policy(
            Arc::new(transport),
            config.daemon.retry_policy(),
        ))
    } else {
        None
    };

    let uniclip = if services.clipboard == ClipboardMode::Off {
        None
    } else {
        Some(setup::resolve_uniclip(&config)?)
    };

    let desktop = logiflow_input::open_native().context("no cursor backend for this platform")?;

    info!(config = %path.display(), "starting logiflow daemon");
    let mut daemon = Daemon::new(config, desktop, runner, uniclip, services);
    let events = daemon.event_sender();

    let shutdown = events.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            let _ = shutdown.send(DaemonEvent::Shutdown).await;
        }
    });

    #[cfg(unix)]
    spawn_reload_on_hangup(path, events);

    daemon.run().await?;
    Ok(())
}

/// Re-read the config file whenever SIGHUP arrives.
#[cfg(unix)]
fn spawn_reload_on_hangup(path: PathBuf, events: tokio::sync::mpsc::Sender<DaemonEvent>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "config reload on SIGHUP unavailable");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            match setup::load_config(Some(&path)) {
                Ok(config) => {
                    if events.send(DaemonEvent::ApplyConfig(Box::new(config))).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "config reload failed"),
            }
        }
    });
}

/// Persist the last server a client joined so it becomes the default.
fn remember_server(config: &mut Config, path: &Path, address: &str) {
    if config.clipboard.server_address == address {
        return;
    }
    config.clipboard.server_address = address.to_string();
    if let Err(e) = setup::save_config(config, path) {
        warn!(error = %e, "failed to remember clipboard server");
    }
}

fn config_command(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init { config, force } => {
            let path = config.unwrap_or_else(setup::default_config_path);
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            setup::save_config(&Config::default(), &path)?;
            println!("Wrote {}", path.display());
        }
        ConfigAction::Show { config } => {
            let config = setup::load_config(config.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", setup::default_config_path().display());
        }
    }
    Ok(())
}
