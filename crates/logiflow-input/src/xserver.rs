//! Xlib backend: cursor queries, warping, Xinerama monitors, XTest key taps.
#![allow(unsafe_code)]

use std::os::raw::{c_int, c_uint};
use std::sync::Mutex;

use logiflow_types::{Point, Rect};
use tracing::{debug, info};
use ::x11::{xinerama, xlib, xtest};

use crate::error::InputError;
use crate::{Displays, Key, KeyTap, Modifier, Pointer};

const XK_F15: xlib::KeySym = 0xFFCC;

struct Connection(*mut xlib::Display);

// SAFETY: the raw display pointer is only dereferenced by Xlib while the
// surrounding `Mutex` is held, so calls are never concurrent.
unsafe impl Send for Connection {}

/// X11 desktop backed by a single Xlib connection.
pub struct X11Desktop {
    conn: Mutex<Connection>,
}

struct PointerState {
    position: Point,
    mask: c_uint,
}

impl X11Desktop {
    /// Connect to the display named by `DISPLAY`.
    pub fn open() -> Result<Self, InputError> {
        // SAFETY: a null name means "use $DISPLAY"; the result is checked.
        let display = unsafe { xlib::XOpenDisplay(std::ptr::null()) };
        if display.is_null() {
            let name = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
            return Err(InputError::DisplayOpen(format!("XOpenDisplay failed; DISPLAY={name}")));
        }
        info!("connected to X display");
        Ok(Self {
            conn: Mutex::new(Connection(display)),
        })
    }

    fn with_display<T>(&self, f: impl FnOnce(*mut xlib::Display) -> T) -> Result<T, InputError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| InputError::Other(anyhow::anyhow!("X11 connection lock poisoned")))?;
        Ok(f(conn.0))
    }

    fn query_pointer(&self) -> Result<PointerState, InputError> {
        self.with_display(|display| {
            let mut root_ret: xlib::Window = 0;
            let mut child_ret: xlib::Window = 0;
            let (mut root_x, mut root_y, mut win_x, mut win_y): (c_int, c_int, c_int, c_int) =
                (0, 0, 0, 0);
            let mut mask: c_uint = 0;
            // SAFETY: `display` is a live connection and every out-pointer
            // refers to a local.
            let same_screen = unsafe {
                let root = xlib::XDefaultRootWindow(display);
                xlib::XQueryPointer(
                    display,
                    root,
                    &mut root_ret,
                    &mut child_ret,
                    &mut root_x,
                    &mut root_y,
                    &mut win_x,
                    &mut win_y,
                    &mut mask,
                )
            };
            if same_screen == 0 {
                return Err(InputError::Query("pointer is on another screen".to_string()));
            }
            Ok(PointerState {
                position: Point::new(root_x, root_y),
                mask,
            })
        })?
    }
}

impl Drop for X11Desktop {
    fn drop(&mut self) {
        if let Ok(conn) = self.conn.get_mut() {
            // SAFETY: the connection was opened in `open` and is not used again.
            unsafe { xlib::XCloseDisplay(conn.0) };
        }
    }
}

impl Pointer for X11Desktop {
    fn position(&self) -> Result<Point, InputError> {
        Ok(self.query_pointer()?.position)
    }

    fn warp(&self, to: Point) -> Result<(), InputError> {
        self.with_display(|display| {
            // SAFETY: `display` is a live connection; source window `0`
            // (None) makes the warp absolute within the root window.
            unsafe {
                let root = xlib::XDefaultRootWindow(display);
                xlib::XWarpPointer(display, 0, root, 0, 0, 0, 0, to.x, to.y);
                xlib::XFlush(display);
            }
        })?;
        debug!(x = to.x, y = to.y, "warped cursor");
        Ok(())
    }

    fn is_modifier_held(&self, modifier: Modifier) -> Result<bool, InputError> {
        let mask = match modifier {
            Modifier::Ctrl => xlib::ControlMask,
            Modifier::Shift => xlib::ShiftMask,
            Modifier::Alt => xlib::Mod1Mask,
            Modifier::Super => xlib::Mod4Mask,
        };
        Ok(self.query_pointer()?.mask & mask != 0)
    }
}

impl Displays for X11Desktop {
    fn monitors(&self) -> Result<Vec<Rect>, InputError> {
        let monitors = self.with_display(|display| {
            // SAFETY: `display` is a live connection. Xinerama returns an
            // array of `count` entries that we copy out and free.
            unsafe {
                if xinerama::XineramaIsActive(display) != 0 {
                    let mut count: c_int = 0;
                    let screens = xinerama::XineramaQueryScreens(display, &mut count);
                    if !screens.is_null() {
                        let len = usize::try_from(count).unwrap_or(0);
                        let rects = std::slice::from_raw_parts(screens, len)
                            .iter()
                            .map(|s| {
                                Rect::new(
                                    i32::from(s.x_org),
                                    i32::from(s.y_org),
                                    u32::try_from(s.width).unwrap_or(0),
                                    u32::try_from(s.height).unwrap_or(0),
                                )
                            })
                            .collect::<Vec<_>>();
                        xlib::XFree(screens.cast());
                        return rects;
                    }
                }
                let screen = xlib::XDefaultScreen(display);
                vec![Rect::new(
                    0,
                    0,
                    u32::try_from(xlib::XDisplayWidth(display, screen)).unwrap_or(0),
                    u32::try_from(xlib::XDisplayHeight(display, screen)).unwrap_or(0),
                )]
            }
        })?;

        if monitors.is_empty() {
            return Err(InputError::NoMonitors);
        }
        debug!(count = monitors.len(), "enumerated monitors");
        Ok(monitors)
    }
}

impl KeyTap for X11Desktop {
    fn tap(&self, key: Key) -> Result<(), InputError> {
        let keysym = match key {
            Key::F15 => XK_F15,
        };
        self.with_display(|display| {
            // SAFETY: `display` is a live connection.
            unsafe {
                let code = xlib::XKeysymToKeycode(display, keysym);
                if code == 0 {
                    return Err(InputError::Inject(format!("no keycode for {key:?}")));
                }
                xtest::XTestFakeKeyEvent(display, c_uint::from(code), xlib::True, 0);
                xtest::XTestFakeKeyEvent(display, c_uint::from(code), xlib::False, 0);
                xlib::XFlush(display);
            }
            Ok(())
        })?
    }
}
