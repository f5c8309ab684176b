//! Physics mode.
//!
//! The engine only tracks whether physics is on, the pet's velocity and
//! the tuning. The renderer integrates motion from the effects it gets.

use rand::Rng;
use serde::Serialize;

pub const DEFAULT_GRAVITY: f64 = 0.5;
pub const DEFAULT_BOUNCE: f64 = 0.7;
/// A random force component falls in `[-SPREAD / 2, SPREAD / 2)`.
const RANDOM_FORCE_SPREAD: f64 = 20.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Physics {
    pub enabled: bool,
    pub velocity: Velocity,
    pub gravity: f64,
    /// Fraction of speed kept on hitting an edge, in `[0, 1]`.
    pub bounce: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            enabled: false,
            velocity: Velocity::default(),
            gravity: DEFAULT_GRAVITY,
            bounce: DEFAULT_BOUNCE,
        }
    }
}

impl Physics {
    /// Push the pet. Ignored while physics is off.
    pub fn apply_force(&mut self, x: f64, y: f64) -> bool {
        if !self.enabled {
            return false;
        }
        self.velocity.x += x;
        self.velocity.y += y;
        true
    }

    /// Change the tuning. Missing values are kept.
    pub fn update(&mut self, gravity: Option<f64>, bounce: Option<f64>) {
        if let Some(gravity) = gravity.filter(|g| g.is_finite()) {
            self.gravity = gravity;
        }
        if let Some(bounce) = bounce.filter(|b| b.is_finite()) {
            self.bounce = bounce.clamp(0.0, 1.0);
        }
    }

    /// Turn physics off and stop the pet.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.velocity = Velocity::default();
    }
}

/// A force component, random when not given.
pub fn force_or_random<R: Rng>(rng: &mut R, given: Option<f64>) -> f64 {
    given
        .filter(|force| force.is_finite())
        .unwrap_or_else(|| (rng.gen::<f64>() - 0.5) * RANDOM_FORCE_SPREAD)
}
