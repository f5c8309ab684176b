//! Experience, leveling, evolution and unlocks.
//!
//! The rules here are pure bookkeeping on [`GrowthSettings`]. The pet turns
//! the returned [`GrowthReport`] into effects and persists the result.

use crate::config::GrowthSettings;
use crate::effect::{Animation, ParticleKind};

/// What a call to [`GrowthSettings::add_experience`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrowthReport {
    /// Every level reached, in order.
    pub level_ups: Vec<u32>,
    /// Name of the stage evolved into, if any.
    pub evolved: Option<String>,
    pub unlocked_animations: Vec<String>,
    pub unlocked_particles: Vec<String>,
}

impl GrowthReport {
    /// Whether nothing beyond the raw experience changed.
    pub fn is_empty(&self) -> bool {
        self.level_ups.is_empty()
            && self.evolved.is_none()
            && self.unlocked_animations.is_empty()
            && self.unlocked_particles.is_empty()
    }
}

impl GrowthSettings {
    /// Experience a source is worth, or `fallback` if it has no entry.
    pub fn gain_for(&self, source: &str, fallback: u64) -> u64 {
        self.experience_gains.get(source).copied().unwrap_or(fallback)
    }

    /// The growth stage the pet is in, if the stage index is valid.
    pub fn current_stage(&self) -> Option<&crate::config::GrowthStage> {
        self.stages.get(self.evolution_stage)
    }

    /// Add experience and apply every level-up it pays for.
    ///
    /// Does nothing when growth is disabled.
    pub fn add_experience(&mut self, amount: u64) -> GrowthReport {
        let mut report = GrowthReport::default();
        if !self.enabled {
            return report;
        }

        self.experience = self.experience.saturating_add(amount);
        self.total_experience = self.total_experience.saturating_add(amount);

        // Each level raises the threshold by half, so even a saturated
        // experience pool runs out of level-ups quickly.
        while self.experience >= self.experience_to_next_level {
            self.experience -= self.experience_to_next_level;
            self.level = self.level.saturating_add(1);
            self.experience_to_next_level =
                (self.experience_to_next_level.saturating_mul(3) / 2).max(1);
            report.level_ups.push(self.level);

            if let Some(stage) = self.evolve() {
                report.evolved = Some(stage);
            }
            self.unlock_features(&mut report);
        }

        report
    }

    /// Move to the highest stage the current level qualifies for, if that
    /// is past the current stage. Returns the new stage's name.
    pub fn evolve(&mut self) -> Option<String> {
        let (index, stage) = self
            .stages
            .iter()
            .enumerate()
            .rev()
            .find(|(_, stage)| self.level >= stage.level)?;
        if index <= self.evolution_stage {
            return None;
        }
        let name = stage.name.clone();
        self.evolution_stage = index;
        Some(name)
    }

    /// Back to level one with no experience.
    pub fn reset(&mut self) {
        self.level = 1;
        self.experience = 0;
        self.experience_to_next_level = 100;
        self.evolution_stage = 0;
    }

    fn unlock_features(&mut self, report: &mut GrowthReport) {
        let level = self.level as usize;

        if level % 2 == 0 {
            if let Some(animation) = Animation::ALL.get(level / 2 - 1) {
                let name = animation.name().to_string();
                if !self.unlocked_animations.contains(&name) {
                    self.unlocked_animations.push(name.clone());
                    report.unlocked_animations.push(name);
                }
            }
        }

        if level % 3 == 0 {
            if let Some(kind) = ParticleKind::ALL.get(level / 3 - 1) {
                let name = kind.name().to_string();
                if !self.unlocked_particles.contains(&name) {
                    self.unlocked_particles.push(name.clone());
                    report.unlocked_particles.push(name);
                }
            }
        }
    }
}
