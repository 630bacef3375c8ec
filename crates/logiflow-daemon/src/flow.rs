//! Edge-triggered channel switching.
//!
//! The [`SwitchCoordinator`] polls the cursor, classifies it against the
//! desktop envelope and the configured targets, and hands a matching
//! target to a spawned task that drives the [`CommandRunner`]. The task
//! reports back over an mpsc channel into the same loop that owns the
//! [`SwitchState`], so the state is never shared.

use std::sync::Arc;
use std::time::Duration;

use logiflow_hidpp::{CommandRunner, SwitchOutcome};
use logiflow_input::{Modifier, Pointer};
use logiflow_types::{Channel, EdgePosition, EdgeTarget, ReceiverProfile, ScreenBounds};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::state::SwitchState;

/// Default time between cursor samples.
pub const POLL_INTERVAL: Duration = Duration::from_millis(300);

/// How long shutdown waits for an in-flight switch before abandoning it.
///
/// An abandoned switch is detached, not cancelled.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// The part of the configuration the coordinator reads on every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSettings {
    pub profile: ReceiverProfile,
    pub targets: Vec<EdgeTarget>,
    /// Modifier that must be held for any target to fire.
    pub gate: Option<Modifier>,
}

impl FlowSettings {
    /// Targets are ordered by channel, so channel 1 wins over 2 and 3
    /// whatever order the file lists them in.
    pub fn from_config(config: &Config) -> Self {
        let mut targets: Vec<EdgeTarget> = config.enabled_targets().copied().collect();
        targets.sort_by_key(|t| t.channel);
        Self {
            profile: config.receiver,
            targets,
            gate: config.flow.gate(),
        }
    }
}

/// Message sent by a switch task when both sends have finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchCompletion {
    pub position: EdgePosition,
    pub channel: Channel,
    pub outcome: SwitchOutcome,
}

pub struct SwitchCoordinator {
    bounds: ScreenBounds,
    pointer: Arc<dyn Pointer>,
    runner: CommandRunner,
    settings: watch::Receiver<Arc<FlowSettings>>,
    poll_interval: Duration,
    state: SwitchState,
    in_flight: Option<JoinHandle<()>>,
    completion_tx: mpsc::Sender<SwitchCompletion>,
    completion_rx: mpsc::Receiver<SwitchCompletion>,
}

impl SwitchCoordinator {
    /// Create a coordinator for a desktop whose envelope is `bounds`.
    ///
    /// Monitor geometry is fixed for the coordinator's lifetime.
    pub fn new(
        bounds: ScreenBounds,
        pointer: Arc<dyn Pointer>,
        runner: CommandRunner,
        settings: watch::Receiver<Arc<FlowSettings>>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel(1);
        Self {
            bounds,
            pointer,
            runner,
            settings,
            poll_interval: POLL_INTERVAL,
            state: SwitchState::Idle,
            in_flight: None,
            completion_tx,
            completion_rx,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> SwitchState {
        self.state
    }

    pub fn bounds(&self) -> ScreenBounds {
        self.bounds
    }

    /// Sample the cursor once and start a switch if a target fires.
    ///
    /// Returns the target that fired. Does nothing while a switch is in
    /// flight. Must be called from within a tokio runtime.
    pub fn tick(&mut self) -> Option<EdgeTarget> {
        if !self.state.can_start_switch() {
            trace!(state = %self.state, "tick skipped");
            return None;
        }

        let settings = self.settings.borrow().clone();

        if let Some(modifier) = settings.gate {
            match self.pointer.is_modifier_held(modifier) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    debug!(error = %e, "modifier query failed");
                    return None;
                }
            }
        }

        let cursor = match self.pointer.position() {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "cursor query failed");
                return None;
            }
        };

        let target = *settings
            .targets
            .iter()
            .find(|t| t.is_enabled() && t.matches(&self.bounds, cursor))?;

        info!(
            position = %target.position,
            channel = %target.channel,
            x = cursor.x,
            y = cursor.y,
            "edge reached, switching receiver"
        );
        self.begin_switch(settings.profile, target);
        Some(target)
    }

    fn begin_switch(&mut self, profile: ReceiverProfile, target: EdgeTarget) {
        let runner = self.runner.clone();
        let tx = self.completion_tx.clone();
        let EdgeTarget {
            position, channel, ..
        } = target;

        self.in_flight = Some(tokio::spawn(async move {
            let outcome = runner.switch_channel(&profile, channel).await;
            let _ = tx
                .send(SwitchCompletion {
                    position,
                    channel,
                    outcome,
                })
                .await;
        }));
        self.state = SwitchState::SwitchInFlight { position, channel };
    }

    /// Apply a finished switch: return to idle and, if both devices moved,
    /// nudge the cursor off the edge it was pushed against.
    pub fn on_completion(&mut self, done: SwitchCompletion) {
        self.state = SwitchState::Idle;
        self.in_flight = None;

        if !done.outcome.is_success() {
            warn!(
                channel = %done.channel,
                keyboard = done.outcome.keyboard,
                mouse = done.outcome.mouse,
                "switch failed, cursor left in place"
            );
            return;
        }

        let cursor = match self.pointer.position() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "cursor query failed after switch");
                return;
            }
        };
        let to = cursor.offset(done.position.nudge());
        match self.pointer.warp(to) {
            Ok(()) => debug!(x = to.x, y = to.y, "cursor nudged off edge"),
            Err(e) => warn!(error = %e, "failed to nudge cursor"),
        }
    }

    /// Wait for the in-flight switch, if any, and apply its completion.
    ///
    /// Returns the outcome, or `None` if nothing was in flight.
    pub async fn settle(&mut self) -> Option<SwitchOutcome> {
        if !self.state.is_in_flight() {
            return None;
        }
        let done = self.completion_rx.recv().await?;
        self.on_completion(done);
        Some(done.outcome)
    }

    /// Poll until `shutdown` flips or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
            left = self.bounds.left,
            right = self.bounds.right,
            top = self.bounds.top,
            bottom = self.bounds.bottom,
            "flow started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                Some(done) = self.completion_rx.recv() => self.on_completion(done),
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }

        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        if self.state.is_in_flight() {
            info!(state = %self.state, "waiting for in-flight switch");
            if tokio::time::timeout(SHUTDOWN_GRACE, self.settle()).await.is_err() {
                // Dropping the handle detaches the task; the transport call
                // runs to completion and its result is discarded.
                drop(self.in_flight.take());
                warn!(state = %self.state, "abandoned in-flight switch");
                self.state = SwitchState::Idle;
            }
        }
        info!("flow stopped");
    }
}

impl std::fmt::Debug for SwitchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchCoordinator")
            .field("bounds", &self.bounds)
            .field("state", &self.state)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logiflow_types::ZoneAnchor;

    #[test]
    fn settings_keep_enabled_targets_in_channel_order() {
        let mut config = Config::default();
        config.targets = vec![
            EdgeTarget::disabled(Channel::new(1).unwrap()),
            EdgeTarget::zone(EdgePosition::Top, Channel::new(3).unwrap(), 100, ZoneAnchor::End),
            EdgeTarget::full(EdgePosition::Left, Channel::new(2).unwrap()),
        ];
        config.flow.require_modifier = true;

        let settings = FlowSettings::from_config(&config);

        let channels: Vec<u8> = settings.targets.iter().map(|t| t.channel.get()).collect();
        assert_eq!(channels, [2, 3]);
        assert_eq!(settings.gate, Some(Modifier::Ctrl));
        assert_eq!(settings.profile, ReceiverProfile::default());
    }
}
