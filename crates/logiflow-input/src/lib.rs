//! Cursor, monitor, and key injection backends for logiflow.
//!
//! This crate defines the [`Pointer`], [`Displays`], and [`KeyTap`] traits
//! the daemon consumes as plain coordinate values and key taps. An X11
//! backend is available behind the `x11` feature; the `mock` feature
//! provides an in-memory desktop for tests.

use std::sync::Arc;

use logiflow_types::{Point, Rect};
use serde::{Deserialize, Serialize};

pub mod error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(all(target_os = "linux", feature = "x11"))]
pub mod xserver;

pub use error::InputError;

/// Keyboard modifier that can gate edge switching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    #[default]
    Ctrl,
    Shift,
    Alt,
    Super,
}

/// Keys the daemon knows how to tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Unbound on nearly every system, so tapping it only resets idle timers.
    F15,
}

/// Reads and moves the system cursor.
pub trait Pointer: Send + Sync + 'static {
    /// Current cursor position in global desktop coordinates.
    fn position(&self) -> Result<Point, InputError>;

    /// Move the cursor to an absolute position.
    fn warp(&self, to: Point) -> Result<(), InputError>;

    /// Whether `modifier` is held right now.
    fn is_modifier_held(&self, modifier: Modifier) -> Result<bool, InputError>;
}

/// Enumerates monitor rectangles.
pub trait Displays: Send + Sync + 'static {
    fn monitors(&self) -> Result<Vec<Rect>, InputError>;
}

/// Injects synthetic key taps.
pub trait KeyTap: Send + Sync + 'static {
    /// Press and release `key`.
    fn tap(&self, key: Key) -> Result<(), InputError>;
}

/// One backend viewed through each of its capabilities.
#[derive(Clone)]
pub struct Desktop {
    pub pointer: Arc<dyn Pointer>,
    pub displays: Arc<dyn Displays>,
    pub keys: Arc<dyn KeyTap>,
}

impl Desktop {
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: Pointer + Displays + KeyTap,
    {
        let backend = Arc::new(backend);
        Self {
            pointer: backend.clone(),
            displays: backend.clone(),
            keys: backend,
        }
    }
}

impl std::fmt::Debug for Desktop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desktop").finish_non_exhaustive()
    }
}

/// Open the native backend for this platform.
#[cfg(all(target_os = "linux", feature = "x11"))]
pub fn open_native() -> Result<Desktop, InputError> {
    Ok(Desktop::from_backend(xserver::X11Desktop::open()?))
}

/// Open the native backend for this platform.
#[cfg(not(all(target_os = "linux", feature = "x11")))]
pub fn open_native() -> Result<Desktop, InputError> {
    Err(InputError::Unavailable)
}
