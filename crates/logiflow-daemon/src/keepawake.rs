//! Keep-awake: synthetic activity while the user is idle.
//!
//! The cursor is sampled every `check_interval`. Once it has sat still for
//! `idle_threshold` it glides to a random point on the desktop along a
//! short curved path. Independently, F15 is tapped every
//! `keypress_interval`.

use std::sync::Arc;
use std::time::Duration;

use logiflow_input::{Key, KeyTap, Pointer};
use logiflow_types::{Point, ScreenBounds};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::KeepAwakeConfig;

/// Total time a glide takes.
pub const GLIDE_DURATION: Duration = Duration::from_millis(100);

/// Roughly one interpolated step per this many pixels travelled.
const PIXELS_PER_STEP: f64 = 50.0;

/// Interior control points are displaced by up to this many pixels.
const JITTER: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAwakeTiming {
    pub check_interval: Duration,
    pub idle_threshold: Duration,
    pub keypress_interval: Duration,
}

impl From<&KeepAwakeConfig> for KeepAwakeTiming {
    fn from(config: &KeepAwakeConfig) -> Self {
        Self {
            check_interval: Duration::from_secs(config.check_interval_secs),
            idle_threshold: Duration::from_secs(config.idle_threshold_secs),
            keypress_interval: Duration::from_secs(config.keypress_interval_secs),
        }
    }
}

pub struct KeepAwake {
    pointer: Arc<dyn Pointer>,
    keys: Arc<dyn KeyTap>,
    bounds: ScreenBounds,
    timing: KeepAwakeTiming,
    rng: StdRng,
    last_position: Option<Point>,
    idle: Duration,
}

impl KeepAwake {
    pub fn new(
        pointer: Arc<dyn Pointer>,
        keys: Arc<dyn KeyTap>,
        bounds: ScreenBounds,
        timing: KeepAwakeTiming,
    ) -> Self {
        Self {
            pointer,
            keys,
            bounds,
            timing,
            rng: StdRng::from_entropy(),
            last_position: None,
            idle: Duration::ZERO,
        }
    }

    /// Run until `shutdown` flips or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut check = tokio::time::interval(self.timing.check_interval);
        check.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut keypress = tokio::time::interval(self.timing.keypress_interval);
        keypress.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Both intervals fire immediately; skip that so the first tap and
        // the first idle sample land one period after start.
        check.tick().await;
        keypress.tick().await;

        self.last_position = self.pointer.position().ok();
        info!(
            idle_threshold_secs = self.timing.idle_threshold.as_secs(),
            keypress_interval_secs = self.timing.keypress_interval.as_secs(),
            "keep-awake started"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = keypress.tick() => self.tap(),
                _ = check.tick() => {
                    if let Some(path) = self.check_activity() {
                        tokio::select! {
                            _ = shutdown.changed() => break,
                            () = self.glide(&path) => {}
                        }
                    }
                }
            }
        }
        info!("keep-awake stopped");
    }

    /// Record one idle sample. Returns a glide path when the idle
    /// threshold has been reached.
    pub fn check_activity(&mut self) -> Option<Vec<Point>> {
        let current = match self.pointer.position() {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "cursor query failed");
                return None;
            }
        };

        let moved = self.last_position != Some(current);
        self.last_position = Some(current);
        if moved {
            if !self.idle.is_zero() {
                debug!("user activity detected");
            }
            self.idle = Duration::ZERO;
            return None;
        }

        self.idle += self.timing.check_interval;
        if self.idle < self.timing.idle_threshold {
            return None;
        }

        self.idle = Duration::ZERO;
        let to = random_point(&mut self.rng, &self.bounds);
        debug!(x = to.x, y = to.y, "idle threshold reached, gliding cursor");
        Some(glide_path(&mut self.rng, current, to, &self.bounds))
    }

    async fn glide(&self, path: &[Point]) {
        let steps = u32::try_from(path.len()).unwrap_or(u32::MAX).max(1);
        let pause = GLIDE_DURATION / steps;
        for &point in path {
            if let Err(e) = self.pointer.warp(point) {
                warn!(error = %e, "glide interrupted");
                return;
            }
            tokio::time::sleep(pause).await;
        }
    }

    fn tap(&self) {
        match self.keys.tap(Key::F15) {
            Ok(()) => debug!("tapped F15"),
            Err(e) => warn!(error = %e, "failed to tap F15"),
        }
    }
}

impl std::fmt::Debug for KeepAwake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepAwake")
            .field("bounds", &self.bounds)
            .field("timing", &self.timing)
            .field("idle", &self.idle)
            .finish_non_exhaustive()
    }
}

fn random_point<R: Rng>(rng: &mut R, bounds: &ScreenBounds) -> Point {
    let x = rng.gen_range(bounds.left..bounds.right.max(bounds.left + 1));
    let y = rng.gen_range(bounds.top..bounds.bottom.max(bounds.top + 1));
    Point::new(x, y)
}

/// A curved path from `from` to `to`, both included.
///
/// Three to five control points are spaced evenly on the straight line and
/// the interior ones jittered, then a Catmull-Rom spline through them is
/// sampled at about one point per 50 px. Every point is clamped to `bounds`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn glide_path<R: Rng>(rng: &mut R, from: Point, to: Point, bounds: &ScreenBounds) -> Vec<Point> {
    let count: usize = rng.gen_range(3..=5);
    let last = count - 1;
    let controls: Vec<(f64, f64)> = (0..count)
        .map(|i| {
            let t = i as f64 / last as f64;
            let mut x = lerp(f64::from(from.x), f64::from(to.x), t);
            let mut y = lerp(f64::from(from.y), f64::from(to.y), t);
            if i != 0 && i != last {
                x += f64::from(rng.gen_range(-JITTER..=JITTER));
                y += f64::from(rng.gen_range(-JITTER..=JITTER));
            }
            (x, y)
        })
        .collect();

    let dx = f64::from(to.x) - f64::from(from.x);
    let dy = f64::from(to.y) - f64::from(from.y);
    let samples = 2 + (dx.hypot(dy) / PIXELS_PER_STEP) as usize;

    (0..samples)
        .map(|i| {
            if i == 0 {
                return from;
            }
            if i == samples - 1 {
                return to;
            }
            let u = i as f64 / (samples - 1) as f64;
            let (x, y) = catmull_rom(&controls, u);
            bounds.clamp(Point::new(x.round() as i32, y.round() as i32))
        })
        .collect()
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Evaluate a uniform Catmull-Rom spline through `points` at `u` in `0..=1`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn catmull_rom(points: &[(f64, f64)], u: f64) -> (f64, f64) {
    let segments = points.len() - 1;
    let scaled = u.clamp(0.0, 1.0) * segments as f64;
    let seg = (scaled.floor() as usize).min(segments - 1);
    let t = scaled - seg as f64;

    let p1 = points[seg];
    let p2 = points[seg + 1];
    let p0 = if seg == 0 { p1 } else { points[seg - 1] };
    let p3 = points.get(seg + 2).copied().unwrap_or(p2);

    let blend = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * (2.0 * b
            + (c - a) * t
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * t * t
            + (3.0 * b - a - 3.0 * c + d) * t * t * t)
    };
    (blend(p0.0, p1.0, p2.0, p3.0), blend(p0.1, p1.1, p2.1, p3.1))
}
