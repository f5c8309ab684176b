//! Physics mode and path following.

use std::time::Duration;

use super::StreamPet;
use crate::config::Position;
use crate::effect::Effect;
use crate::physics::{force_or_random, Physics};

/// Corners of the overlay, then the middle.
const TEST_PATH: [(f64, f64); 5] = [(20.0, 20.0), (80.0, 20.0), (80.0, 80.0), (20.0, 80.0), (50.0, 50.0)];

pub(super) fn test_path() -> Vec<Position> {
    TEST_PATH.iter().map(|&(x, y)| Position { x, y }).collect()
}

impl StreamPet {
    /// Switch physics on or off. Returns whether it is now on.
    pub fn toggle_physics(&self) -> bool {
        if self.physics().enabled {
            self.disable_physics();
            false
        } else {
            self.enable_physics();
            true
        }
    }

    pub fn enable_physics(&self) {
        let (gravity, bounce) = {
            let mut runtime = self.inner.runtime.lock();
            runtime.physics.enabled = true;
            runtime.physics_epoch += 1;
            (runtime.physics.gravity, runtime.physics.bounce)
        };
        tracing::info!(gravity, bounce, "physics enabled");
        self.emit(Effect::PhysicsEnabled { gravity, bounce });
    }

    /// Turn physics off and bring the pet to rest. Returns whether it was
    /// on.
    pub fn disable_physics(&self) -> bool {
        let was_enabled = {
            let mut runtime = self.inner.runtime.lock();
            runtime.physics_epoch += 1;
            let was_enabled = runtime.physics.enabled;
            runtime.physics.disable();
            was_enabled
        };
        if was_enabled {
            tracing::info!("physics disabled");
            self.emit(Effect::PhysicsDisabled);
        }
        was_enabled
    }

    /// Turn physics on, and off again after `duration` unless it was
    /// switched meanwhile.
    pub(super) fn physics_for(&self, duration: Option<Duration>) {
        self.enable_physics();
        let Some(duration) = duration else {
            return;
        };
        let epoch = self.inner.runtime.lock().physics_epoch;
        self.later(duration, move |pet| {
            let current = pet.inner.runtime.lock().physics_epoch == epoch;
            if current {
                pet.disable_physics();
            }
        });
    }

    /// Push the pet. Missing components are random. Ignored while physics
    /// is off.
    pub fn apply_force(&self, x: Option<f64>, y: Option<f64>) -> bool {
        if !self.physics().enabled {
            return false;
        }
        let (x, y) = {
            let mut rng = self.inner.rng.lock();
            (force_or_random(&mut *rng, x), force_or_random(&mut *rng, y))
        };
        let applied = self.inner.runtime.lock().physics.apply_force(x, y);
        if applied {
            self.emit(Effect::ForceApplied { x, y });
        }
        applied
    }

    pub fn update_physics_settings(&self, gravity: Option<f64>, bounce: Option<f64>) {
        let (gravity, bounce) = {
            let mut runtime = self.inner.runtime.lock();
            runtime.physics.update(gravity, bounce);
            (runtime.physics.gravity, runtime.physics.bounce)
        };
        tracing::debug!(gravity, bounce, "physics settings updated");
        self.emit(Effect::PhysicsUpdated { gravity, bounce });
    }

    /// A snapshot of the physics state.
    pub fn physics(&self) -> Physics {
        self.inner.runtime.lock().physics
    }

    /// Move through `points`, in percent of the overlay, over `duration`.
    /// A new path replaces the one running.
    pub fn follow_path(&self, points: Vec<Position>, duration: Duration) -> bool {
        if points.is_empty() {
            return false;
        }
        let epoch = {
            let mut runtime = self.inner.runtime.lock();
            runtime.on_path = true;
            runtime.path_epoch += 1;
            runtime.path_epoch
        };
        tracing::debug!(points = points.len(), "following path");
        self.emit(Effect::PathStarted { points, duration });
        self.later(duration, move |pet| {
            let mut runtime = pet.inner.runtime.lock();
            if runtime.path_epoch == epoch {
                runtime.on_path = false;
            }
        });
        true
    }

    /// Stop the running path. Returns whether one was running.
    pub fn stop_path(&self) -> bool {
        let was_on_path = {
            let mut runtime = self.inner.runtime.lock();
            runtime.path_epoch += 1;
            std::mem::take(&mut runtime.on_path)
        };
        if was_on_path {
            self.emit(Effect::PathStopped);
        }
        was_on_path
    }

    /// Stop any path and return to the configured position.
    pub fn reset_position(&self) {
        self.stop_path();
        self.emit(Effect::PositionReset);
    }

    pub fn is_on_path(&self) -> bool {
        self.inner.runtime.lock().on_path
    }
}
