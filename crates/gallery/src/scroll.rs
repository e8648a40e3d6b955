//! Momentum scrolling.
//!
//! Input handlers only ever call [`ScrollState::add_impulse`]; the frame loop
//! calls [`ScrollState::advance`] exactly once per frame. Impulses received
//! between two frames are summed, so their order and batching never matter.

/// Below this magnitude velocity snaps to exactly zero.
pub const VELOCITY_EPSILON: f64 = 1e-4;
/// Scroll units per pixel of wheel travel.
pub const WHEEL_SENSITIVITY: f64 = 0.01;
/// Scroll units per pixel of touch drag.
pub const TOUCH_SENSITIVITY: f64 = 0.01;
/// Pixels per line for wheels that report line deltas.
pub const PIXELS_PER_LINE: f64 = 100.0;

pub const DEFAULT_FRICTION: f64 = 0.95;
pub const MIN_FRICTION: f64 = 0.5;
pub const MAX_FRICTION: f64 = 0.99;

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollState {
    position: f64,
    velocity: f64,
    pending_impulse: f64,
    friction: f64,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self::new(DEFAULT_FRICTION)
    }
}

impl ScrollState {
    pub fn new(friction: f64) -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            pending_impulse: 0.0,
            friction: clamp_friction(friction),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn pending_impulse(&self) -> f64 {
        self.pending_impulse
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Updates the per-frame decay factor, clamped into `[0.5, 0.99]`.
    pub fn set_friction(&mut self, friction: f64) {
        let clamped = clamp_friction(friction);
        if clamped != friction {
            tracing::warn!(requested = friction, applied = clamped, "scroll friction clamped");
        }
        self.friction = clamped;
    }

    /// Queues a raw delta for the next [`advance`](Self::advance). Non-finite
    /// deltas are dropped.
    pub fn add_impulse(&mut self, raw_delta: f64) {
        if !raw_delta.is_finite() {
            tracing::debug!(raw_delta, "ignoring non-finite scroll impulse");
            return;
        }
        self.pending_impulse += raw_delta;
    }

    /// Wheel travel in pixels, positive when scrolling down.
    pub fn add_wheel_pixels(&mut self, delta_y: f64) {
        self.add_impulse(delta_y * WHEEL_SENSITIVITY);
    }

    /// A touch drag moved from `last_y` to `current_y` (window pixels).
    pub fn add_touch_drag(&mut self, last_y: f64, current_y: f64) {
        self.add_impulse((last_y - current_y) * TOUCH_SENSITIVITY);
    }

    /// A new touch grabs the gallery: any coasting stops immediately.
    pub fn begin_touch(&mut self) {
        self.velocity = 0.0;
    }

    /// Folds the pending impulse into velocity, applies friction and moves
    /// the position. Returns the new position.
    pub fn advance(&mut self) -> f64 {
        self.velocity += self.pending_impulse;
        self.pending_impulse = 0.0;
        self.velocity *= self.friction;
        if self.velocity.abs() < VELOCITY_EPSILON {
            self.velocity = 0.0;
        }
        self.position += self.velocity;
        self.position
    }
}

fn clamp_friction(friction: f64) -> f64 {
    if friction.is_finite() {
        friction.clamp(MIN_FRICTION, MAX_FRICTION)
    } else {
        DEFAULT_FRICTION
    }
}
