//! Switch state machine.

use logiflow_types::{Channel, EdgePosition};

/// Whether a channel switch is currently being delivered.
///
/// At most one switch is outstanding. Ticks that arrive while one is in
/// flight are ignored rather than queued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SwitchState {
    /// Polling for edge contact.
    #[default]
    Idle,
    /// Commands for `channel` are being sent; `position` is the edge that
    /// fired and decides the post-switch nudge.
    SwitchInFlight {
        position: EdgePosition,
        channel: Channel,
    },
}

impl SwitchState {
    /// Whether a new switch may start.
    pub fn can_start_switch(self) -> bool {
        self == Self::Idle
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::SwitchInFlight { .. })
    }
}

impl std::fmt::Display for SwitchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::SwitchInFlight { position, channel } => {
                write!(f, "SwitchInFlight({position} -> channel {channel})")
            }
        }
    }
}
