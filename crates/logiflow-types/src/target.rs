//! Edge targets and receiver channels.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::screen::{EdgePosition, Point, ScreenBounds};

/// A receiver channel number was outside `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("channel {0} out of range (expected 1..=3)")]
pub struct InvalidChannel(pub u8);

/// One of the three host channels a receiver can be paired with.
///
/// Numbered from 1 externally; the wire uses the zero-based index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Channel(u8);

impl Channel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 3;

    pub fn new(number: u8) -> Result<Self, InvalidChannel> {
        if (Self::MIN..=Self::MAX).contains(&number) {
            Ok(Self(number))
        } else {
            Err(InvalidChannel(number))
        }
    }

    /// The one-based channel number.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// The zero-based index sent on the wire.
    #[must_use]
    pub fn wire_index(self) -> u8 {
        self.0 - 1
    }

    /// All channels in ascending order.
    #[must_use]
    pub fn all() -> [Self; 3] {
        [Self(1), Self(2), Self(3)]
    }
}

impl TryFrom<u8> for Channel {
    type Error = InvalidChannel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a target triggers along the whole edge or only part of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    #[default]
    Full,
    Zone,
}

/// Which end of the edge a zone is measured from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneAnchor {
    /// Top of a vertical edge, left of a horizontal edge.
    #[default]
    Start,
    /// Bottom of a vertical edge, right of a horizontal edge.
    End,
}

/// A screen edge that switches the receiver to `channel` when the cursor
/// is pushed against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTarget {
    #[serde(default)]
    pub position: EdgePosition,
    pub channel: Channel,
    #[serde(default)]
    pub mode: TriggerMode,
    #[serde(default = "default_zone_size")]
    pub zone_size: u32,
    #[serde(default)]
    pub zone_anchor: ZoneAnchor,
}

impl EdgeTarget {
    pub const DEFAULT_ZONE_SIZE: u32 = 200;

    /// A target that fires anywhere along `position`.
    #[must_use]
    pub fn full(position: EdgePosition, channel: Channel) -> Self {
        Self {
            position,
            channel,
            mode: TriggerMode::Full,
            zone_size: Self::DEFAULT_ZONE_SIZE,
            zone_anchor: ZoneAnchor::Start,
        }
    }

    /// A target restricted to `zone_size` pixels measured from `anchor`.
    #[must_use]
    pub fn zone(position: EdgePosition, channel: Channel, zone_size: u32, anchor: ZoneAnchor) -> Self {
        Self {
            position,
            channel,
            mode: TriggerMode::Zone,
            zone_size,
            zone_anchor: anchor,
        }
    }

    /// A disabled placeholder for `channel`.
    #[must_use]
    pub fn disabled(channel: Channel) -> Self {
        Self::full(EdgePosition::None, channel)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.position.is_enabled()
    }

    /// Whether the cursor satisfies both the edge and the zone condition.
    #[must_use]
    pub fn matches(&self, bounds: &ScreenBounds, cursor: Point) -> bool {
        if !bounds.is_at_edge(cursor, self.position) {
            return false;
        }
        match self.mode {
            TriggerMode::Full => true,
            TriggerMode::Zone => {
                bounds.is_in_zone(cursor, self.position, self.zone_size, self.zone_anchor)
            }
        }
    }
}

fn default_zone_size() -> u32 {
    EdgeTarget::DEFAULT_ZONE_SIZE
}
