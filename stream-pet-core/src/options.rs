//! Runtime options for a running pet.
//!
//! These are process-level knobs that never land in the persisted
//! configuration: fixed interaction timings, the bus origin allow-list, an
//! RNG seed for reproducible runs and a pinned calendar date for seasonal
//! detection.

use std::time::Duration;

use chrono::NaiveDate;

/// Default display time for a message with no explicit duration.
const DEFAULT_MESSAGE_DURATION_MS: u64 = 4000;

/// Default length of the bubble exit transition.
const DEFAULT_EXIT_TRANSITION_MS: u64 = 300;

/// Default cooldown between counted clicks.
const DEFAULT_CLICK_COOLDOWN_MS: u64 = 3000;

/// Default display time for the click message.
const DEFAULT_CLICK_MESSAGE_MS: u64 = 2000;

/// Default particle count for an event, command or state burst.
const DEFAULT_PARTICLE_BURST: u32 = 12;

/// Default particle count for a level-up celebration.
const DEFAULT_CELEBRATION_PARTICLES: u32 = 20;

/// Default probability that an idle tick plays something.
const DEFAULT_IDLE_CHANCE: f64 = 0.3;

/// Default time a state entered from the bus stays before recovering.
const DEFAULT_TEST_STATE_RESET_MS: u64 = 5000;

/// Options for a [`StreamPet`](crate::pet::StreamPet).
#[derive(Debug, Clone)]
pub struct Options {
    /// Display time for messages shown without a duration.
    pub default_message_duration: Duration,

    /// Length of the bubble exit transition.
    pub exit_transition: Duration,

    /// Minimum gap between counted clicks.
    pub click_cooldown: Duration,

    /// How long the click message stays up.
    pub click_message_duration: Duration,

    /// Particles spawned per event, command or state reaction.
    pub particle_burst: u32,

    /// Particles spawned when leveling up.
    pub celebration_particles: u32,

    /// Probability in `[0, 1]` that an idle tick plays an animation.
    pub idle_chance: f64,

    /// How long a state entered through the bus lasts.
    pub test_state_reset: Duration,

    /// Seed for the random source. `None` seeds from the OS.
    pub seed: Option<u64>,

    /// Origins the message bus accepts. `"*"` accepts any.
    pub allowed_origins: Vec<String>,

    /// Date used for seasonal detection. `None` uses today.
    pub season_date: Option<NaiveDate>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            default_message_duration: Duration::from_millis(DEFAULT_MESSAGE_DURATION_MS),
            exit_transition: Duration::from_millis(DEFAULT_EXIT_TRANSITION_MS),
            click_cooldown: Duration::from_millis(DEFAULT_CLICK_COOLDOWN_MS),
            click_message_duration: Duration::from_millis(DEFAULT_CLICK_MESSAGE_MS),
            particle_burst: DEFAULT_PARTICLE_BURST,
            celebration_particles: DEFAULT_CELEBRATION_PARTICLES,
            idle_chance: DEFAULT_IDLE_CHANCE,
            test_state_reset: Duration::from_millis(DEFAULT_TEST_STATE_RESET_MS),
            seed: None,
            allowed_origins: vec!["*".to_string()],
            season_date: None,
        }
    }
}

impl Options {
    /// Create new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default message duration.
    pub fn default_message_duration(mut self, duration: Duration) -> Self {
        self.default_message_duration = duration;
        self
    }

    /// Set the bubble exit transition.
    pub fn exit_transition(mut self, duration: Duration) -> Self {
        self.exit_transition = duration;
        self
    }

    /// Set the click cooldown.
    pub fn click_cooldown(mut self, cooldown: Duration) -> Self {
        self.click_cooldown = cooldown;
        self
    }

    /// Set the click message duration.
    pub fn click_message_duration(mut self, duration: Duration) -> Self {
        self.click_message_duration = duration;
        self
    }

    /// Set the particle count for reactions.
    pub fn particle_burst(mut self, count: u32) -> Self {
        self.particle_burst = count;
        self
    }

    /// Set the particle count for level-up celebrations.
    pub fn celebration_particles(mut self, count: u32) -> Self {
        self.celebration_particles = count;
        self
    }

    /// Set the idle animation chance. Clamped to `[0, 1]`.
    pub fn idle_chance(mut self, chance: f64) -> Self {
        self.idle_chance = chance.clamp(0.0, 1.0);
        self
    }

    /// Set how long bus-triggered states last.
    pub fn test_state_reset(mut self, duration: Duration) -> Self {
        self.test_state_reset = duration;
        self
    }

    /// Seed the random source.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the bus origin allow-list.
    pub fn allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Add an origin to the allow-list.
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Accept bus messages from no origin until one is added.
    pub fn no_origins(mut self) -> Self {
        self.allowed_origins.clear();
        self
    }

    /// Pin the date used for seasonal detection.
    pub fn season_date(mut self, date: NaiveDate) -> Self {
        self.season_date = Some(date);
        self
    }

    /// The date seasonal detection should use.
    pub fn today(&self) -> NaiveDate {
        self.season_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
