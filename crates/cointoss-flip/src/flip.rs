use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::side::CoinSide;

pub const QUARTER_ROTATION: f32 = 90.0;
pub const HALF_ROTATION: f32 = 180.0;
pub const THREE_QUARTER_ROTATION: f32 = 270.0;
pub const FULL_ROTATION: f32 = 360.0;

/// Length of one flip animation.
pub const FLIP_DURATION: Duration = Duration::from_millis(3000);

/// Fewest half turns in a flip.
pub const MIN_FLIPS: u32 = 10;
/// Number of distinct half-turn counts a flip can draw.
pub const FLIP_SPREAD: u32 = 8;
/// Most half turns in a flip.
pub const MAX_FLIPS: u32 = MIN_FLIPS + FLIP_SPREAD - 1;

/// One flip: where it starts, how far it spins, where it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Flip {
    pub start_side: CoinSide,
    pub end_side: CoinSide,
    pub half_turns: u32,
}

impl Flip {
    /// A flip of `half_turns` half turns starting from `start_side`.
    pub fn new(start_side: CoinSide, half_turns: u32) -> Self {
        let end_side = if half_turns % 2 == 0 {
            start_side
        } else {
            start_side.opposite()
        };
        Self {
            start_side,
            end_side,
            half_turns,
        }
    }

    /// Total rotation around the vertical axis, in degrees.
    pub fn rotation(&self) -> f32 {
        self.half_turns as f32 * HALF_ROTATION
    }

    /// Rotation after `progress` of the animation (clamped to `0..=1`), eased.
    pub fn rotation_at(&self, progress: f32) -> f32 {
        self.rotation() * ease(progress)
    }

    /// Rotation `elapsed` into a [`FLIP_DURATION`] animation.
    pub fn rotation_at_elapsed(&self, elapsed: Duration) -> f32 {
        self.rotation_at(elapsed.as_secs_f32() / FLIP_DURATION.as_secs_f32())
    }

    /// The face showing at `rotation` degrees into this flip.
    pub fn visible_side(&self, rotation: f32) -> CoinSide {
        if is_flipped(rotation) {
            self.start_side.opposite()
        } else {
            self.start_side
        }
    }
}

/// The showing side of a coin across flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlipState {
    current_side: CoinSide,
}

impl FlipState {
    pub fn new(current_side: CoinSide) -> Self {
        Self { current_side }
    }

    pub fn current_side(&self) -> CoinSide {
        self.current_side
    }

    /// Draw a half-turn count in `MIN_FLIPS..=MAX_FLIPS` and flip.
    ///
    /// The state moves to the side the coin lands on.
    pub fn flip<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Flip {
        let half_turns = MIN_FLIPS + rng.gen_range(0..FLIP_SPREAD);
        let flip = Flip::new(self.current_side, half_turns);
        debug!(
            from = %flip.start_side,
            to = %flip.end_side,
            half_turns,
            "coin flipped"
        );
        self.current_side = flip.end_side;
        flip
    }
}

/// Whether the back face shows at `rotation_y` degrees.
///
/// True when `|rotation_y| mod 360` lies strictly between 90 and 270.
pub fn is_flipped(rotation_y: f32) -> bool {
    let angle = rotation_y.abs() % FULL_ROTATION;
    angle > QUARTER_ROTATION && angle < THREE_QUARTER_ROTATION
}

/// Fast-out, slow-in progress curve: cubic Bézier through (0, 0) and (0.2, 1).
///
/// Input is clamped to `0..=1` (NaN counts as 0) and the endpoints map exactly.
fn ease(progress: f32) -> f32 {
    const X2: f64 = 0.2;
    if progress.is_nan() || progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    // With the first control point at the origin:
    //   x(t) = 3(1-t)t^2 * X2 + t^3
    //   y(t) = 3(1-t)t^2      + t^3
    // x is monotonic on 0..=1, so bisect for t.
    let curve = |t: f64, p2: f64| 3.0 * (1.0 - t) * t * t * p2 + t * t * t;
    let target = f64::from(progress);
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    for _ in 0..32 {
        let mid = (lo + hi) / 2.0;
        if curve(mid, X2) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    curve((lo + hi) / 2.0, 1.0) as f32
}

/// Rotation to draw the visible face with.
///
/// The back face is drawn half a turn behind so it does not appear mirrored.
pub fn face_rotation(rotation_y: f32) -> f32 {
    if is_flipped(rotation_y) {
        rotation_y - HALF_ROTATION
    } else {
        rotation_y
    }
}
