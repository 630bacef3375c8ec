//! Desktop geometry and edge classification.

use serde::{Deserialize, Serialize};

use crate::target::ZoneAnchor;

/// Slack, in pixels, when deciding whether the cursor sits on a bound.
///
/// Cursor sampling can land on the bound or one pixel short of it depending
/// on how the OS clamps the pointer.
pub const EDGE_MARGIN: i32 = 1;

/// A cursor position in global desktop coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Return this point shifted by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, (dx, dy): (i32, i32)) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single monitor's rectangle in global desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// X offset of the top-left corner (may be negative).
    pub x: i32,
    /// Y offset of the top-left corner (may be negative).
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the rightmost column.
    #[must_use]
    pub fn right(&self) -> i32 {
        self.x
            .saturating_add(i32::try_from(self.width).unwrap_or(i32::MAX))
    }

    /// One past the bottom row.
    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y
            .saturating_add(i32::try_from(self.height).unwrap_or(i32::MAX))
    }
}

/// Which edge of the desktop a target is attached to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePosition {
    Left,
    Right,
    Top,
    Bottom,
    /// Target disabled.
    #[default]
    None,
}

impl EdgePosition {
    /// Whether this position refers to an actual edge.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }

    /// Cursor offset applied after a successful switch so the pointer leaves
    /// the boundary it was pushed against.
    #[must_use]
    pub fn nudge(self) -> (i32, i32) {
        match self {
            Self::Left => (1, 0),
            Self::Right => (-1, 0),
            Self::Top => (0, 1),
            Self::Bottom => (0, -1),
            Self::None => (0, 0),
        }
    }
}

impl std::fmt::Display for EdgePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Envelope of every monitor on the desktop.
///
/// `right` and `bottom` are exclusive, matching [`Rect::right`] and
/// [`Rect::bottom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl ScreenBounds {
    /// Combine a set of monitors into one envelope.
    ///
    /// Returns `None` for an empty set. Flow triggers at the outer boundary
    /// of the whole desktop, never between two adjacent monitors.
    #[must_use]
    pub fn from_monitors(monitors: &[Rect]) -> Option<Self> {
        let (first, rest) = monitors.split_first()?;
        Some(rest.iter().fold(Self::from(*first), |acc, rect| Self {
            left: acc.left.min(rect.x),
            right: acc.right.max(rect.right()),
            top: acc.top.min(rect.y),
            bottom: acc.bottom.max(rect.bottom()),
        }))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.right.abs_diff(self.left)
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom.abs_diff(self.top)
    }

    /// Whether `point` lies within [`EDGE_MARGIN`] of the bound for `position`.
    #[must_use]
    pub fn is_at_edge(&self, point: Point, position: EdgePosition) -> bool {
        match position {
            EdgePosition::Left => point.x <= self.left.saturating_add(EDGE_MARGIN),
            EdgePosition::Right => point.x >= self.right.saturating_sub(EDGE_MARGIN),
            EdgePosition::Top => point.y <= self.top.saturating_add(EDGE_MARGIN),
            EdgePosition::Bottom => point.y >= self.bottom.saturating_sub(EDGE_MARGIN),
            EdgePosition::None => false,
        }
    }

    /// Whether `point` falls inside the zone of `zone_size` pixels along the
    /// edge for `position`.
    ///
    /// Left/right edges measure along Y, top/bottom along X. `Start` counts
    /// from the top/left bound, `End` counts back from the bottom/right bound.
    #[must_use]
    pub fn is_in_zone(
        &self,
        point: Point,
        position: EdgePosition,
        zone_size: u32,
        anchor: ZoneAnchor,
    ) -> bool {
        let size = i32::try_from(zone_size).unwrap_or(i32::MAX);
        let (coord, start, end) = match position {
            EdgePosition::Left | EdgePosition::Right => (point.y, self.top, self.bottom),
            EdgePosition::Top | EdgePosition::Bottom => (point.x, self.left, self.right),
            EdgePosition::None => return false,
        };
        match anchor {
            ZoneAnchor::Start => coord <= start.saturating_add(size),
            ZoneAnchor::End => coord >= end.saturating_sub(size),
        }
    }

    /// Clamp `point` so it lies on a pixel inside the envelope.
    #[must_use]
    pub fn clamp(&self, point: Point) -> Point {
        Point {
            x: point.x.clamp(self.left, (self.right - 1).max(self.left)),
            y: point.y.clamp(self.top, (self.bottom - 1).max(self.top)),
        }
    }
}

impl From<Rect> for ScreenBounds {
    fn from(rect: Rect) -> Self {
        Self {
            left: rect.x,
            right: rect.right(),
            top: rect.y,
            bottom: rect.bottom(),
        }
    }
}
