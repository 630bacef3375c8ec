//! Core daemon orchestration.

use std::sync::Arc;
use std::time::Duration;

use logiflow_clipboard::Uniclip;
use logiflow_hidpp::CommandRunner;
use logiflow_input::Desktop;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::DaemonError;
use crate::flow::{FlowSettings, SwitchCoordinator, SHUTDOWN_GRACE};
use crate::keepawake::{KeepAwake, KeepAwakeTiming};
use crate::setup;

/// Events processed by the daemon's main loop.
#[derive(Debug)]
pub enum DaemonEvent {
    /// Replace the running configuration. Flow picks it up on its next tick.
    ApplyConfig(Box<Config>),
    /// Shutdown signal.
    Shutdown,
}

/// What the clipboard launcher should do at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClipboardMode {
    #[default]
    Off,
    Server,
    /// Connect to the server at this `IP:port`.
    Client(String),
}

/// Which services `run` starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Services {
    pub flow: bool,
    pub keep_awake: bool,
    pub clipboard: ClipboardMode,
}

impl Services {
    /// Services enabled by the config file alone.
    pub fn from_config(config: &Config) -> Self {
        Self {
            flow: config.flow.enabled,
            keep_awake: config.keep_awake.enabled,
            clipboard: ClipboardMode::Off,
        }
    }
}

/// The logiflow daemon.
pub struct Daemon {
    config: Config,
    desktop: Desktop,
    runner: Option<CommandRunner>,
    uniclip: Option<Uniclip>,
    services: Services,
    settings_tx: watch::Sender<Arc<FlowSettings>>,
    event_tx: mpsc::Sender<DaemonEvent>,
    event_rx: mpsc::Receiver<DaemonEvent>,
}

impl Daemon {
    /// Create a new daemon instance.
    ///
    /// `runner` is only needed when flow is enabled, and `uniclip` only
    /// when a clipboard service was requested.
    pub fn new(
        config: Config,
        desktop: Desktop,
        runner: Option<CommandRunner>,
        uniclip: Option<Uniclip>,
        services: Services,
    ) -> Self {
        let (settings_tx, _) = watch::channel(Arc::new(FlowSettings::from_config(&config)));
        let (event_tx, event_rx) = mpsc::channel(16);
        Self {
            config,
            desktop,
            runner,
            uniclip,
            services,
            settings_tx,
            event_tx,
            event_rx,
        }
    }

    /// Get a clone of the event sender for feeding events into the daemon.
    pub fn event_sender(&self) -> mpsc::Sender<DaemonEvent> {
        self.event_tx.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run until a [`DaemonEvent::Shutdown`] arrives.
    ///
    /// Fails only if the desktop geometry cannot be read, or flow was
    /// requested without a HID transport.
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        let bounds = setup::screen_bounds(self.desktop.displays.as_ref())?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();

        if self.services.flow {
            let runner = self
                .runner
                .clone()
                .ok_or_else(|| anyhow::anyhow!("flow requires a HID transport"))?;
            let coordinator = SwitchCoordinator::new(
                bounds,
                Arc::clone(&self.desktop.pointer),
                runner,
                self.settings_tx.subscribe(),
            )
            .with_poll_interval(self.config.daemon.poll_interval());
            tasks.push(("flow", tokio::spawn(coordinator.run(shutdown_rx.clone()))));
        }

        if self.services.keep_awake {
            let keep_awake = KeepAwake::new(
                Arc::clone(&self.desktop.pointer),
                Arc::clone(&self.desktop.keys),
                bounds,
                KeepAwakeTiming::from(&self.config.keep_awake),
            );
            tasks.push(("keep-awake", tokio::spawn(keep_awake.run(shutdown_rx.clone()))));
        }

        self.start_clipboard().await;

        info!(
            flow = self.services.flow,
            keep_awake = self.services.keep_awake,
            clipboard = ?self.services.clipboard,
            "daemon running"
        );

        while let Some(event) = self.event_rx.recv().await {
            match event {
                DaemonEvent::ApplyConfig(config) => self.apply_config(*config),
                DaemonEvent::Shutdown => {
                    info!("shutting down");
                    break;
                }
            }
        }

        self.shutdown(&shutdown_tx, tasks).await;
        Ok(())
    }

    fn apply_config(&mut self, config: Config) {
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejected configuration update");
            return;
        }
        self.settings_tx
            .send_replace(Arc::new(FlowSettings::from_config(&config)));
        let pending = self.config.restart_required(&config);
        if !pending.is_empty() {
            warn!(settings = ?pending, "changes take effect after restart");
        }
        self.config = config;
        info!("configuration applied");
    }

    async fn start_clipboard(&mut self) {
        let Some(uniclip) = self.uniclip.as_mut() else {
            if self.services.clipboard != ClipboardMode::Off {
                warn!("clipboard requested but uniclip is unavailable");
            }
            return;
        };

        match &self.services.clipboard {
            ClipboardMode::Off => {}
            ClipboardMode::Server => match uniclip.start_server().await {
                Ok(Some(address)) => info!(address = %address, "peers can join the clipboard"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to start clipboard server"),
            },
            ClipboardMode::Client(address) => {
                if let Err(e) = uniclip
                    .start_client(address, &self.config.clipboard.password)
                    .await
                {
                    warn!(address = %address, error = %e, "failed to start clipboard client");
                }
            }
        }
    }

    async fn shutdown(
        &mut self,
        shutdown_tx: &watch::Sender<bool>,
        tasks: Vec<(&'static str, JoinHandle<()>)>,
    ) {
        info!("daemon shutting down");
        let _ = shutdown_tx.send(true);

        // Flow waits up to its own grace period for an in-flight switch.
        let deadline = SHUTDOWN_GRACE + Duration::from_secs(1);
        for (name, handle) in tasks {
            match tokio::time::timeout(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(task = name, error = %e, "task ended abnormally"),
                Err(_) => warn!(task = name, "task did not stop in time"),
            }
        }

        if let Some(uniclip) = self.uniclip.as_mut() {
            uniclip.stop_all().await;
        }
        info!("daemon shut down complete");
    }
}
