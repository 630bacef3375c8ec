//! In-memory desktop for testing.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use logiflow_types::{Point, Rect};

use crate::error::InputError;
use crate::{Displays, Key, KeyTap, Modifier, Pointer};

#[derive(Debug, Default)]
struct MockDesktopState {
    position: Point,
    monitors: Vec<Rect>,
    held: HashSet<Modifier>,
    warps: Vec<Point>,
    taps: Vec<Key>,
    fail_queries: bool,
}

/// Mock desktop backend.
///
/// The cursor only moves when told to, either through [`Pointer::warp`] or
/// through a [`MockDesktopHandle`].
pub struct MockDesktop {
    state: Arc<Mutex<MockDesktopState>>,
}

impl MockDesktop {
    /// Create a desktop made of `monitors`, cursor at the origin.
    pub fn new(monitors: Vec<Rect>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockDesktopState {
                monitors,
                ..MockDesktopState::default()
            })),
        }
    }

    /// Get a clonable handle for driving and observing the desktop from tests.
    pub fn handle(&self) -> MockDesktopHandle {
        MockDesktopHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable controller for `MockDesktop`.
#[derive(Clone)]
pub struct MockDesktopHandle {
    state: Arc<Mutex<MockDesktopState>>,
}

impl MockDesktopHandle {
    /// Place the cursor as if the user moved it.
    pub fn move_to(&self, to: Point) {
        self.state.lock().unwrap().position = to;
    }

    pub fn set_held(&self, modifier: Modifier, held: bool) {
        let mut state = self.state.lock().unwrap();
        if held {
            state.held.insert(modifier);
        } else {
            state.held.remove(&modifier);
        }
    }

    /// Make cursor queries fail until cleared.
    pub fn set_fail_queries(&self, fail: bool) {
        self.state.lock().unwrap().fail_queries = fail;
    }

    pub fn position(&self) -> Point {
        self.state.lock().unwrap().position
    }

    /// Every position passed to [`Pointer::warp`], in order.
    pub fn warps(&self) -> Vec<Point> {
        self.state.lock().unwrap().warps.clone()
    }

    pub fn taps(&self) -> Vec<Key> {
        self.state.lock().unwrap().taps.clone()
    }
}

impl Pointer for MockDesktop {
    fn position(&self) -> Result<Point, InputError> {
        let state = self.state.lock().unwrap();
        if state.fail_queries {
            return Err(InputError::Query("mock query failure".to_string()));
        }
        Ok(state.position)
    }

    fn warp(&self, to: Point) -> Result<(), InputError> {
        let mut state = self.state.lock().unwrap();
        state.position = to;
        state.warps.push(to);
        Ok(())
    }

    fn is_modifier_held(&self, modifier: Modifier) -> Result<bool, InputError> {
        Ok(self.state.lock().unwrap().held.contains(&modifier))
    }
}

impl Displays for MockDesktop {
    fn monitors(&self) -> Result<Vec<Rect>, InputError> {
        let state = self.state.lock().unwrap();
        if state.monitors.is_empty() {
            return Err(InputError::NoMonitors);
        }
        Ok(state.monitors.clone())
    }
}

impl KeyTap for MockDesktop {
    fn tap(&self, key: Key) -> Result<(), InputError> {
        self.state.lock().unwrap().taps.push(key);
        Ok(())
    }
}
