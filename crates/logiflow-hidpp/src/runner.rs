//! Bounded-retry delivery of switch commands.

use std::sync::Arc;
use std::time::Duration;

use logiflow_types::{Channel, DeviceKind, ReceiverProfile};
use tracing::{debug, info, warn};

use crate::encode::{encode_switch, SwitchCommand};
use crate::error::TransportError;
use crate::transport::{HidTransport, WriteRequest};

/// Attempts per `send`, including the first.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Pause between failed attempts.
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Upper bound on a single transport invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Per-device result of one channel switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchOutcome {
    pub keyboard: bool,
    pub mouse: bool,
}

impl SwitchOutcome {
    /// Both halves landed. A partial switch is a failure.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.keyboard && self.mouse
    }
}

/// Sends encoded commands to the receiver, retrying transient failures.
///
/// Failures never escape as errors: every attempt is logged and the caller
/// only sees whether the write was acknowledged.
#[derive(Clone)]
pub struct CommandRunner {
    transport: Arc<dyn HidTransport>,
    policy: RetryPolicy,
}

impl CommandRunner {
    pub fn new(transport: Arc<dyn HidTransport>) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    pub fn with_policy(transport: Arc<dyn HidTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Write `command` to the receiver described by `profile`.
    ///
    /// Returns `true` as soon as one attempt is acknowledged.
    pub async fn send(&self, profile: &ReceiverProfile, command: SwitchCommand) -> bool {
        let request = WriteRequest::new(profile, command);
        let ack = request.acknowledgement();
        let device = request.command.device;
        debug!(%device, vidpid = %request.vidpid, payload = %request.command.hex_list(), "writing command");

        for attempt in 1..=self.policy.attempts {
            match self.attempt(&request).await {
                Ok(output) if output.contains(&ack) => {
                    debug!(%device, attempt, "command acknowledged");
                    return true;
                }
                Ok(output) => {
                    warn!(%device, attempt, output = %output.trim(), "write not acknowledged");
                }
                Err(e) => {
                    warn!(%device, attempt, error = %e, "transport invocation failed");
                }
            }
            if attempt < self.policy.attempts {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        warn!(%device, attempts = self.policy.attempts, "giving up on command");
        false
    }

    async fn attempt(&self, request: &WriteRequest) -> Result<String, TransportError> {
        tokio::time::timeout(self.policy.timeout, self.transport.write(request))
            .await
            .map_err(|_| TransportError::Timeout(self.policy.timeout))?
    }

    /// Move both keyboard and mouse to `channel`, keyboard first.
    pub async fn switch_channel(&self, profile: &ReceiverProfile, channel: Channel) -> SwitchOutcome {
        let keyboard = self
            .send(profile, encode_switch(profile, DeviceKind::Keyboard, channel))
            .await;
        let mouse = self
            .send(profile, encode_switch(profile, DeviceKind::Mouse, channel))
            .await;
        let outcome = SwitchOutcome { keyboard, mouse };
        if outcome.is_success() {
            info!(%channel, protocol = %profile.protocol, "switched receiver channel");
        } else {
            warn!(%channel, keyboard, mouse, "channel switch incomplete");
        }
        outcome
    }
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
