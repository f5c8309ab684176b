//! The reaction dispatcher.
//!
//! [`StreamPet`] owns the loaded configuration, the runtime state (current
//! mode, displayed image, cooldowns) and every timer. Stimuli come in through
//! the `trigger_event`, `handle_chat_message`, `handle_click` and
//! `handle_control` entry points; reactions go out as [`Effect`]s. Viewer
//! interaction lives in `interaction`, physics and paths in `motion`.
//!
//! Shared state sits behind `parking_lot` mutexes. No two of them are ever
//! held at once and none is held across an await.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tokio::time::Instant;

mod interaction;
mod motion;

use crate::analytics::Tally;
use crate::bus::{ControlMessage, MessageBus};
use crate::chat::{self, Chatter, Role};
use crate::config::{PetConfig, DEFAULT_STATE};
use crate::effect::{self, is_set, Animation, Effect, EffectReceiver, EffectSender, Feature};
use crate::emotes::{emote_url, RainCooldowns};
use crate::error::{Error, Result};
use crate::greetings::GreetingSession;
use crate::growth::GrowthReport;
use crate::images::{resolve_image, AnyAsset, AssetLookup, PLACEHOLDER_IMAGE};
use crate::options::Options;
use crate::physics::Physics;
use crate::platform::Notification;
use crate::polls::PollBook;
use crate::queue::{MessageQueue, QueueTiming};
use crate::scheduler::Scheduler;
use crate::storage::ConfigStore;
use crate::template::{replace_variables, username_payload, Payload};
use crate::viewer::{CommandCooldowns, RedemptionLog, ViewerCommand};

/// Experience for an event with no `experienceGains` entry.
const DEFAULT_EVENT_XP: u64 = 10;
const DEFAULT_COMMAND_XP: u64 = 2;
const DEFAULT_CLICK_XP: u64 = 1;

const CLICK_PARTICLES: u32 = 8;
const FALLBACK_CLICK_MESSAGE: &str = "You clicked me! 😊";

const EVOLUTION_PARTICLES: u32 = 30;
const EVOLUTION_MESSAGE_MS: u64 = 6000;
/// Delay before the evolved stage's image replaces the current one.
const EVOLUTION_IMAGE_DELAY_MS: u64 = 2000;

const YAWN_MESSAGE: &str = "*yawn* 😴";
const YAWN_MESSAGE_MS: u64 = 2000;
const FALLBACK_IDLE_INTERVAL_MS: u64 = 30_000;

const TEST_USERNAME: &str = "TestUser";
const TEST_MESSAGE: &str = "This is a test message!";
const NOT_IN_STATE_MESSAGE_MS: u64 = 3000;
const DEFAULT_WEATHER: &str = "rain";
const TEST_STAGE: &str = "Test Stage";
const DEFAULT_PATH_MS: u64 = 5000;

/// A running pet. Cheap to clone; clones share everything.
#[derive(Debug, Clone)]
pub struct StreamPet {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    store: ConfigStore,
    options: Options,
    assets: Arc<dyn AssetLookup>,
    bus: MessageBus,
    config: Mutex<PetConfig>,
    runtime: Mutex<Runtime>,
    rng: Mutex<StdRng>,
    effects: EffectSender,
    scheduler: Scheduler,
    queue: MessageQueue,
}

/// Per-session state. Never persisted.
#[derive(Debug)]
struct Runtime {
    state: String,
    /// Bumped on every state entry or exit. Pending auto-recoveries only
    /// fire if it still matches.
    state_epoch: u64,
    /// The unresolved path of the image on screen.
    image: Option<String>,
    /// Bumped on every image change. Pending reverts only fire if it still
    /// matches.
    image_epoch: u64,
    moving: bool,
    command_used: HashMap<String, Instant>,
    last_click: Option<Instant>,
    weather: Option<String>,
    /// Bumped whenever weather starts. Timed stops only fire if it still
    /// matches.
    weather_epoch: u64,
    physics: Physics,
    /// Bumped whenever physics is switched. Timed disables only fire if it
    /// still matches.
    physics_epoch: u64,
    on_path: bool,
    path_epoch: u64,
    viewer_cooldowns: CommandCooldowns,
    redemptions: RedemptionLog,
    polls: PollBook,
    greetings: GreetingSession,
    emote_rain: RainCooldowns,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            state: DEFAULT_STATE.to_string(),
            state_epoch: 0,
            image: None,
            image_epoch: 0,
            moving: false,
            command_used: HashMap::new(),
            last_click: None,
            weather: None,
            weather_epoch: 0,
            physics: Physics::default(),
            physics_epoch: 0,
            on_path: false,
            path_epoch: 0,
            viewer_cooldowns: CommandCooldowns::default(),
            redemptions: RedemptionLog::default(),
            polls: PollBook::default(),
            greetings: GreetingSession::default(),
            emote_rain: RainCooldowns::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum IdleAction {
    Move(Animation),
    Yawn,
    LookAround,
}

impl StreamPet {
    /// Create a pet over `store` that treats every image as present.
    ///
    /// Returns the pet and the receiver its effects arrive on. Nothing is
    /// shown and no timer runs until [`StreamPet::start`].
    pub fn new(store: ConfigStore, options: Options) -> (Self, EffectReceiver) {
        Self::with_assets(store, options, Arc::new(AnyAsset))
    }

    /// Create a pet that checks images against `assets` before showing them.
    pub fn with_assets(
        store: ConfigStore,
        options: Options,
        assets: Arc<dyn AssetLookup>,
    ) -> (Self, EffectReceiver) {
        let (tx, rx) = effect::channel();
        let scheduler = Scheduler::new();
        let queue = MessageQueue::new(tx.clone(), scheduler.clone());
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let bus = MessageBus::new(options.allowed_origins.clone());
        let config = store.load();

        let inner = Inner {
            store,
            options,
            assets,
            bus,
            config: Mutex::new(config),
            runtime: Mutex::new(Runtime::default()),
            rng: Mutex::new(rng),
            effects: tx,
            scheduler,
            queue,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    /// Count a session, show the default image and start the blink, idle
    /// and random-state timers. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShutDown` after [`StreamPet::shutdown`].
    pub fn start(&self) -> Result<()> {
        self.ensure_running()?;
        {
            let mut config = self.inner.config.lock();
            if config.analytics.enabled {
                config.analytics.session_count += 1;
            }
        }
        self.boot();
        tracing::info!("stream pet started");
        Ok(())
    }

    /// Drop every timer and queued message, reset the runtime state and
    /// start again from the stored configuration.
    pub fn reload(&self) -> Result<()> {
        self.ensure_running()?;
        self.inner.scheduler.reset();
        self.inner.queue.clear();
        *self.inner.runtime.lock() = Runtime::default();
        *self.inner.config.lock() = self.inner.store.load();
        self.boot();
        self.emit(Effect::ConfigReloaded);
        tracing::info!("configuration reloaded");
        Ok(())
    }

    /// Cancel every timer, wait for them to exit and flush the configuration.
    pub async fn shutdown(&self) {
        self.inner.scheduler.shutdown();
        self.inner.scheduler.wait().await;
        self.persist();
        tracing::info!("stream pet shut down");
    }

    fn boot(&self) {
        let today = self.inner.options.today();
        let (timing, season, evolved) = {
            let mut config = self.inner.config.lock();
            config.validate();
            let season = config.seasonal.apply(today);
            let evolved = if config.growth.enabled {
                config.growth.evolve()
            } else {
                None
            };
            let timing = QueueTiming {
                exit_transition: self.inner.options.exit_transition,
                inter_message_delay: millis(config.advanced.message_queue_delay),
                bubble_style: config.effective_bubble_style().to_string(),
            };
            (timing, season, evolved)
        };

        if let Some(season) = season {
            tracing::info!(season = %season, "seasonal theme active");
        }
        if let Some(stage) = evolved {
            tracing::info!(stage = %stage, "growth stage caught up with level");
        }

        self.inner.queue.set_timing(timing);
        self.persist();
        self.show_default_image();
        self.start_timers();
    }

    fn start_timers(&self) {
        let (blink_interval, idle_interval, checks) = {
            let config = self.inner.config.lock();
            let idle_interval = config.advanced.enable_idle_animations.then(|| {
                match config.advanced.idle_animation_interval {
                    0 => FALLBACK_IDLE_INTERVAL_MS,
                    interval => interval,
                }
            });
            let checks: Vec<(String, u64)> = config
                .states
                .iter()
                .filter(|(_, state)| {
                    state.enabled && state.trigger_chance > 0.0 && state.check_interval > 0
                })
                .map(|(name, state)| (name.clone(), state.check_interval))
                .collect();
            (config.pet.blink_interval, idle_interval, checks)
        };

        self.repeat(millis(blink_interval), |pet| pet.blink());
        if let Some(interval) = idle_interval {
            self.repeat(millis(interval), |pet| pet.idle_tick());
        }
        for (name, interval) in checks {
            tracing::debug!(state = %name, interval_ms = interval, "scheduling random state check");
            self.repeat(millis(interval), move |pet| {
                pet.check_state_change(&name);
            });
        }
    }

    // State machine

    /// Enter a configured, enabled state.
    ///
    /// Unknown and disabled names, including `default`, are ignored.
    /// Returns whether the state was entered.
    pub fn change_state(&self, name: &str) -> bool {
        if name == DEFAULT_STATE {
            return false;
        }
        let state = self
            .inner
            .config
            .lock()
            .states
            .get(name)
            .filter(|state| state.enabled)
            .cloned();
        let Some(state) = state else {
            tracing::debug!(state = name, "ignoring unknown or disabled state");
            return false;
        };

        let (from, epoch) = {
            let mut runtime = self.inner.runtime.lock();
            let from = std::mem::replace(&mut runtime.state, name.to_string());
            runtime.state_epoch += 1;
            (from, runtime.state_epoch)
        };
        tracing::info!(from = %from, to = name, "changing state");
        self.emit(Effect::StateChanged {
            from,
            to: name.to_string(),
        });
        self.inner
            .config
            .lock()
            .analytics
            .record(Tally::State(name));

        self.show_image(&state.image, None);
        self.show_message(&state.message, None);
        self.fan_out(&state.sound, &state.particles, &state.animation);

        if let Some(delay) = state.auto_recover_time.filter(|ms| *ms > 0) {
            self.recover_after(millis(delay), epoch);
        }
        self.persist();
        true
    }

    /// Return to `default` and show the default image.
    pub fn recover_from_state(&self) {
        let from = {
            let mut runtime = self.inner.runtime.lock();
            runtime.state_epoch += 1;
            std::mem::replace(&mut runtime.state, DEFAULT_STATE.to_string())
        };
        if from != DEFAULT_STATE {
            tracing::info!(from = %from, "recovering from state");
            self.emit(Effect::StateChanged {
                from,
                to: DEFAULT_STATE.to_string(),
            });
        }
        self.show_default_image();
    }

    /// A viewer used the recovery command for `state_name`. Shows the
    /// state's command message and recovers, if the pet is in that state.
    pub fn handle_recovery_command(&self, state_name: &str, username: &str) -> bool {
        if self.current_state() != state_name {
            tracing::debug!(state = state_name, "recovery command for inactive state");
            return false;
        }
        let message = self
            .inner
            .config
            .lock()
            .states
            .get(state_name)
            .map(|state| state.command_message.clone())
            .unwrap_or_default();

        tracing::info!(state = state_name, user = username, "recovery command used");
        self.show_message(&replace_variables(&message, &username_payload(username)), None);
        self.recover_from_state();
        true
    }

    /// One random check for `name`: in `default`, enter it with the
    /// state's trigger chance.
    pub fn check_state_change(&self, name: &str) -> bool {
        if !self.in_default_state() {
            return false;
        }
        let chance = match self.inner.config.lock().states.get(name) {
            Some(state) if state.enabled => state.trigger_chance,
            _ => return false,
        };
        let roll: f64 = self.inner.rng.lock().gen();
        if roll < chance {
            tracing::debug!(state = name, roll, chance, "random state triggered");
            self.change_state(name)
        } else {
            false
        }
    }

    fn recover_after(&self, delay: Duration, epoch: u64) {
        self.later(delay, move |pet| {
            let current = pet.inner.runtime.lock().state_epoch == epoch;
            if current {
                pet.recover_from_state();
            }
        });
    }

    // Event trigger

    /// React to a platform event.
    ///
    /// Missing or disabled events, events outside the current state's
    /// allow-list and payloads below the event's `minAmount` are ignored.
    /// Returns whether the event reacted.
    pub fn trigger_event(&self, name: &str, payload: &Payload) -> bool {
        let state = self.current_state();
        let amount = payload_amount(payload);

        let (event, blocked, xp) = {
            let config = self.inner.config.lock();
            let Some(event) = config.events.get(name).filter(|event| event.enabled).cloned()
            else {
                tracing::debug!(event = name, "ignoring unknown or disabled event");
                return false;
            };
            let blocked = state != DEFAULT_STATE
                && config.states.get(&state).is_some_and(|current| {
                    !current.allowed_events.is_empty()
                        && !current.allowed_events.iter().any(|allowed| allowed == name)
                });
            let xp = match amount {
                Some(amount) if name == "bits" && amount > 0 => {
                    amount.saturating_mul(config.growth.gain_for("bits", 1))
                }
                _ => config.growth.gain_for(name, DEFAULT_EVENT_XP),
            };
            (event, blocked, xp)
        };

        if blocked {
            tracing::debug!(event = name, state = %state, "event blocked by state");
            return false;
        }
        if let (Some(min), Some(amount)) = (event.min_amount, amount) {
            if amount < min {
                tracing::debug!(event = name, amount, min, "event below minimum amount");
                return false;
            }
        }

        tracing::info!(event = name, "triggering event");
        self.inner
            .config
            .lock()
            .analytics
            .record(Tally::Event(name));

        let duration = millis(event.duration);
        self.show_message(&replace_variables(&event.message, payload), Some(duration));
        self.show_image(&event.image, Some(duration));
        self.fan_out(&event.sound, &event.particles, &event.animation);
        self.add_experience(xp, name);
        true
    }

    /// React to a decoded platform notification. Channel-point
    /// redemptions also run their configured redemption.
    pub fn handle_notification(&self, notification: Notification) -> bool {
        let Some((name, payload)) = notification.into_trigger() else {
            return false;
        };
        let mut reacted = self.trigger_event(&name, &payload);
        if name == "channelPoints" {
            let field = |key: &str| payload.get(key).and_then(Value::as_str).unwrap_or_default();
            reacted |= self.handle_redemption(field("username"), field("reward"), field("rewardId"));
        }
        reacted
    }

    // Chat

    /// Greet first-time chatters, rain their emotes, then match the line
    /// against the configured commands and recovery commands. Returns
    /// whether anything reacted.
    pub fn handle_chat_message(&self, chatter: &Chatter, text: &str) -> bool {
        let mut handled = self.greet_chatter(chatter);
        handled |= self.rain_from_chat(chatter);

        let normalized = chat::normalize(text);
        if normalized.is_empty() {
            return handled;
        }

        let (commands, recoveries) = {
            let config = self.inner.config.lock();
            let commands: Vec<String> = config
                .commands
                .keys()
                .filter(|command| chat::invokes(&normalized, command))
                .cloned()
                .collect();
            let recoveries: Vec<(String, Role)> = config
                .states
                .iter()
                .filter(|(_, state)| {
                    !state.recovery_command.is_empty()
                        && normalized == state.recovery_command.to_lowercase()
                })
                .map(|(name, state)| (name.clone(), state.required_role))
                .collect();
            (commands, recoveries)
        };

        for command in commands {
            handled |= self.handle_chat_command(&command, chatter);
        }
        for (state, role) in recoveries {
            if !chatter.satisfies(role) {
                tracing::debug!(state = %state, user = %chatter.username, required = %role, "recovery command denied");
                continue;
            }
            handled |= self.handle_recovery_command(&state, &chatter.username);
        }
        handled
    }

    /// Run a chat command for `chatter`. A built-in viewer command by that
    /// name goes first; otherwise the configured command runs, subject to
    /// its role and cooldown. Returns whether anything fired.
    pub fn handle_chat_command(&self, name: &str, chatter: &Chatter) -> bool {
        if let Some(command) = ViewerCommand::from_name(name) {
            if self.handle_viewer_command(command, chatter) {
                return true;
            }
        }

        let command = self
            .inner
            .config
            .lock()
            .commands
            .get(name)
            .filter(|command| command.enabled)
            .cloned();
        let Some(command) = command else {
            return false;
        };

        if !chatter.satisfies(command.required_role) {
            tracing::debug!(command = name, user = %chatter.username, required = %command.required_role, "command denied");
            return false;
        }

        let now = Instant::now();
        {
            let mut runtime = self.inner.runtime.lock();
            if let Some(last) = runtime.command_used.get(name) {
                if now.duration_since(*last) < millis(command.cooldown) {
                    tracing::debug!(command = name, "command on cooldown");
                    return false;
                }
            }
            runtime.command_used.insert(name.to_string(), now);
        }

        tracing::info!(command = name, user = %chatter.username, "chat command");
        let xp = {
            let mut config = self.inner.config.lock();
            config.analytics.record(Tally::Command(name));
            config.growth.gain_for("command", DEFAULT_COMMAND_XP)
        };

        let duration = millis(command.duration);
        self.show_image(&command.image, Some(duration));
        self.show_message(
            &replace_variables(&command.message, &username_payload(&chatter.username)),
            Some(duration),
        );
        self.fan_out(&command.sound, &command.particles, &command.animation);
        self.add_experience(xp, name);
        true
    }

    // Clicks

    /// A viewer clicked the pet. Returns whether it reacted.
    pub fn handle_click(&self) -> bool {
        let settings = {
            let config = self.inner.config.lock();
            if !config.advanced.enable_click_interaction {
                return false;
            }
            config.advanced.clone()
        };

        let now = Instant::now();
        {
            let mut runtime = self.inner.runtime.lock();
            let cooling = runtime
                .last_click
                .is_some_and(|last| now.duration_since(last) < self.inner.options.click_cooldown);
            if cooling {
                tracing::debug!("click on cooldown");
                return false;
            }
            runtime.last_click = Some(now);
        }

        let xp = {
            let mut config = self.inner.config.lock();
            config.analytics.record(Tally::Click);
            config.growth.gain_for("click", DEFAULT_CLICK_XP)
        };

        let message = if settings.click_message.is_empty() {
            FALLBACK_CLICK_MESSAGE
        } else {
            settings.click_message.as_str()
        };
        self.show_message(message, Some(self.inner.options.click_message_duration));
        self.play_sound(&settings.click_sound);
        self.spawn_particles(&settings.click_particles, CLICK_PARTICLES);
        if is_set(&settings.click_animation) {
            self.move_pet(&settings.click_animation);
        }
        self.add_experience(xp, "click");
        true
    }

    // Effects

    /// Queue a speech bubble. `None` uses the default duration. Empty text
    /// and duplicates of the bubble on screen are dropped.
    pub fn show_message(&self, text: &str, duration: Option<Duration>) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let duration = duration.unwrap_or(self.inner.options.default_message_duration);
        let queued = self.inner.queue.show(text, duration);
        if queued {
            self.inner.config.lock().analytics.record(Tally::Message);
        }
        queued
    }

    /// Show an image, reverting to the current state's image after
    /// `duration` unless something newer has been shown by then.
    pub fn show_image(&self, path: &str, duration: Option<Duration>) {
        self.display_image(path, None, duration);
    }

    fn display_image(&self, path: &str, field: Option<&str>, duration: Option<Duration>) {
        if path.is_empty() {
            return;
        }
        let (resolved, transition) = {
            let config = self.inner.config.lock();
            (
                resolve_image(&config, path, field),
                millis(config.advanced.transition_duration),
            )
        };

        if !self.inner.assets.exists(&resolved) {
            tracing::warn!(path, resolved = %resolved, "image not found");
            let first = {
                let mut runtime = self.inner.runtime.lock();
                if runtime.image.is_none() {
                    runtime.image = Some(PLACEHOLDER_IMAGE.to_string());
                    true
                } else {
                    false
                }
            };
            if first {
                self.emit(Effect::ImageShown {
                    path: PLACEHOLDER_IMAGE.to_string(),
                    transition: Duration::ZERO,
                    placeholder: true,
                });
            }
            return;
        }

        let epoch = {
            let mut runtime = self.inner.runtime.lock();
            runtime.image = Some(path.to_string());
            runtime.image_epoch += 1;
            runtime.image_epoch
        };
        self.emit(Effect::ImageShown {
            path: resolved,
            transition,
            placeholder: false,
        });

        if let Some(duration) = duration.filter(|duration| !duration.is_zero()) {
            self.later(duration, move |pet| {
                let current = pet.inner.runtime.lock().image_epoch == epoch;
                if current {
                    pet.return_to_current_state();
                }
            });
        }
    }

    fn show_default_image(&self) {
        let path = self
            .inner
            .config
            .lock()
            .effective_default_image()
            .to_string();
        self.display_image(&path, Some("defaultImage"), None);
    }

    fn return_to_current_state(&self) {
        let state = self.current_state();
        if state == DEFAULT_STATE {
            self.show_default_image();
            return;
        }
        let image = self
            .inner
            .config
            .lock()
            .states
            .get(&state)
            .map(|state| state.image.clone());
        if let Some(image) = image {
            self.show_image(&image, None);
        }
    }

    /// Play a sound if sounds are enabled.
    pub fn play_sound(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        let (enabled, volume) = {
            let config = self.inner.config.lock();
            (config.advanced.enable_sounds, config.advanced.sound_volume)
        };
        if !enabled {
            return false;
        }
        self.emit(Effect::SoundPlayed {
            path: path.to_string(),
            volume,
        });
        true
    }

    /// Burst `count` particles of `kind` if particles are enabled. Unknown
    /// kinds burst hearts; `"none"` bursts nothing.
    pub fn spawn_particles(&self, kind: &str, count: u32) -> bool {
        if !is_set(kind) || count == 0 {
            return false;
        }
        {
            let mut config = self.inner.config.lock();
            if !config.advanced.enable_particles {
                return false;
            }
            config.analytics.record(Tally::Particles(count));
        }
        self.emit(Effect::ParticlesSpawned {
            kind: effect::ParticleKind::from_name(kind),
            count,
        });
        true
    }

    /// Start a movement animation. Ignored while another one is running
    /// and for unknown names.
    pub fn move_pet(&self, name: &str) -> bool {
        let Some(animation) = Animation::from_name(name) else {
            tracing::debug!(animation = name, "ignoring unknown animation");
            return false;
        };
        {
            let mut runtime = self.inner.runtime.lock();
            if runtime.moving {
                return false;
            }
            runtime.moving = true;
        }
        self.emit(Effect::AnimationStarted { animation });
        self.later(animation.duration(), |pet| {
            pet.inner.runtime.lock().moving = false;
        });
        true
    }

    /// Start a weather overlay, replacing any running one.
    pub fn start_weather(&self, kind: &str) {
        self.begin_weather(kind);
    }

    fn begin_weather(&self, kind: &str) -> u64 {
        let epoch = {
            let mut runtime = self.inner.runtime.lock();
            runtime.weather = Some(kind.to_string());
            runtime.weather_epoch += 1;
            runtime.weather_epoch
        };
        tracing::info!(weather = kind, "weather started");
        self.emit(Effect::WeatherStarted {
            kind: kind.to_string(),
        });
        epoch
    }

    /// Start weather and stop it after `duration`, unless other weather
    /// started meanwhile.
    fn weather_for(&self, kind: &str, duration: Option<Duration>) {
        let epoch = self.begin_weather(kind);
        if let Some(duration) = duration {
            self.later(duration, move |pet| {
                let current = pet.inner.runtime.lock().weather_epoch == epoch;
                if current {
                    pet.stop_weather();
                }
            });
        }
    }

    /// Stop the weather overlay. Returns whether one was running.
    pub fn stop_weather(&self) -> bool {
        let running = self.inner.runtime.lock().weather.take().is_some();
        if running {
            self.emit(Effect::WeatherStopped);
        }
        running
    }

    fn fan_out(&self, sound: &str, particles: &str, animation: &str) {
        self.play_sound(sound);
        self.spawn_particles(particles, self.inner.options.particle_burst);
        if is_set(animation) {
            self.move_pet(animation);
        }
    }

    // Growth

    /// Award experience and celebrate whatever it unlocks.
    pub fn add_experience(&self, amount: u64, source: &str) -> GrowthReport {
        let (report, show_level_up) = {
            let mut config = self.inner.config.lock();
            let report = config.growth.add_experience(amount);
            (report, config.growth.show_level_up)
        };
        tracing::debug!(amount, source, "experience gained");

        for &level in &report.level_ups {
            tracing::info!(level, "level up");
            if show_level_up {
                self.celebrate(level);
            }
        }

        if let Some(stage) = &report.evolved {
            tracing::info!(stage = %stage, "evolved");
            self.show_evolution_effect(stage);
            self.show_message(
                &format!("✨ Your pet evolved into {stage}! ✨"),
                Some(millis(EVOLUTION_MESSAGE_MS)),
            );
            self.spawn_particles("stars", EVOLUTION_PARTICLES);
            self.later(millis(EVOLUTION_IMAGE_DELAY_MS), |pet| {
                if pet.in_default_state() {
                    pet.show_default_image();
                }
            });
        }

        for name in &report.unlocked_animations {
            tracing::info!(animation = %name, "unlocked animation");
            self.emit(Effect::Unlocked {
                feature: Feature::Animation,
                name: name.clone(),
            });
        }
        for name in &report.unlocked_particles {
            tracing::info!(particles = %name, "unlocked particles");
            self.emit(Effect::Unlocked {
                feature: Feature::Particles,
                name: name.clone(),
            });
        }

        self.persist();
        report
    }

    /// Back to level one. Progress is persisted immediately.
    pub fn reset_growth(&self) {
        self.inner.config.lock().growth.reset();
        tracing::info!("growth reset");
        self.persist();
        if self.in_default_state() {
            self.show_default_image();
        }
    }

    /// The evolution burst for `stage`, on its own.
    pub fn show_evolution_effect(&self, stage: &str) {
        self.emit(Effect::Evolved {
            stage: stage.to_string(),
        });
    }

    fn celebrate(&self, level: u32) {
        self.emit(Effect::LevelUp { level });
        self.spawn_particles("celebrate", self.inner.options.celebration_particles);
        self.move_pet("spin");
    }

    // Ambient behaviour

    fn blink(&self) {
        if !self.in_default_state() || self.inner.queue.is_showing() {
            return;
        }
        let (blink, default, duration) = {
            let config = self.inner.config.lock();
            (
                resolve_image(&config, &config.pet.blink_image, Some("blinkImage")),
                resolve_image(&config, config.effective_default_image(), Some("defaultImage")),
                millis(config.pet.blink_duration),
            )
        };
        if blink.is_empty() || !self.inner.assets.exists(&blink) || !self.inner.assets.exists(&default)
        {
            return;
        }

        let epoch = {
            let mut runtime = self.inner.runtime.lock();
            runtime.image = Some(blink.clone());
            runtime.image_epoch += 1;
            runtime.image_epoch
        };
        self.emit(Effect::ImageShown {
            path: blink,
            transition: Duration::ZERO,
            placeholder: false,
        });
        self.later(duration, move |pet| {
            let unchanged = {
                let runtime = pet.inner.runtime.lock();
                runtime.state == DEFAULT_STATE && runtime.image_epoch == epoch
            };
            if unchanged {
                pet.show_default_image();
            }
        });
    }

    fn idle_tick(&self) {
        if !self.in_default_state() || self.inner.queue.is_showing() {
            return;
        }
        let candidates: Vec<IdleAction> = {
            let config = self.inner.config.lock();
            config
                .advanced
                .idle_animations
                .iter()
                .filter(|(_, enabled)| **enabled)
                .filter_map(|(name, _)| Animation::from_name(name))
                .map(IdleAction::Move)
                .chain([IdleAction::Yawn, IdleAction::LookAround])
                .collect()
        };
        let action = {
            let mut rng = self.inner.rng.lock();
            if rng.gen::<f64>() >= self.inner.options.idle_chance {
                return;
            }
            candidates[rng.gen_range(0..candidates.len())]
        };

        tracing::debug!(?action, "idle action");
        match action {
            IdleAction::Move(animation) => {
                self.move_pet(animation.name());
            }
            IdleAction::Yawn => {
                self.show_message(YAWN_MESSAGE, Some(millis(YAWN_MESSAGE_MS)));
            }
            IdleAction::LookAround => self.emit(Effect::LookAround),
        }
    }

    // Message bus

    /// Validate a raw bus message from `origin` and act on it.
    ///
    /// # Errors
    ///
    /// Returns the bus's validation errors, `Error::ShutDown`, or a store
    /// error from a configuration update.
    pub fn handle_bus_message(&self, origin: &str, raw: &str) -> Result<()> {
        let message = self.inner.bus.accept(origin, raw)?;
        self.handle_control(message)
    }

    /// Act on a validated control message.
    pub fn handle_control(&self, message: ControlMessage) -> Result<()> {
        self.ensure_running()?;
        tracing::debug!(kind = message.kind(), "control message");

        match message {
            ControlMessage::TestEvent {
                event_name,
                event_data,
            } => {
                self.trigger_event(&event_name, &event_data);
            }
            ControlMessage::TestState { state_name } => {
                if self.change_state(&state_name) {
                    let epoch = self.inner.runtime.lock().state_epoch;
                    self.recover_after(self.inner.options.test_state_reset, epoch);
                }
            }
            ControlMessage::TestCommand {
                state_name,
                username,
            } => {
                if self.current_state() == state_name {
                    let username = username.unwrap_or_else(|| TEST_USERNAME.to_string());
                    self.handle_recovery_command(&state_name, &username);
                } else {
                    tracing::warn!(state = %state_name, "recovery test for a state the pet is not in");
                    self.show_message(
                        &format!("Not in {state_name} state! Trigger it first."),
                        Some(millis(NOT_IN_STATE_MESSAGE_MS)),
                    );
                }
            }
            ControlMessage::TestCustomCommand {
                command_name,
                username,
            } => {
                let tester = Chatter::tester(username.unwrap_or_else(|| TEST_USERNAME.to_string()));
                self.handle_chat_command(&command_name, &tester);
            }
            ControlMessage::TestParticles { settings } => {
                let count = settings
                    .count
                    .unwrap_or(self.inner.options.celebration_particles);
                self.spawn_particles("celebrate", count);
            }
            ControlMessage::ResetGrowth => self.reset_growth(),
            ControlMessage::TestLevelUp => {
                let level = self.inner.config.lock().growth.level + 1;
                self.celebrate(level);
            }
            ControlMessage::ShowMessage { message, duration } => {
                let text = message
                    .filter(|text| !text.is_empty())
                    .unwrap_or_else(|| TEST_MESSAGE.to_string());
                self.show_message(&text, duration.filter(|ms| *ms > 0).map(millis));
            }
            ControlMessage::StartWeather { weather_type } => {
                self.start_weather(weather_type.as_deref().unwrap_or(DEFAULT_WEATHER));
            }
            ControlMessage::StopWeather => {
                self.stop_weather();
            }
            ControlMessage::ForceConfigUpdate { config } => {
                self.apply_config(config)?;
            }
            ControlMessage::TogglePhysics => {
                self.toggle_physics();
            }
            ControlMessage::ApplyForce { x, y } => {
                if !self.apply_force(x, y) {
                    tracing::debug!("force ignored while physics is off");
                }
            }
            ControlMessage::UpdatePhysicsSettings { gravity, bounce } => {
                self.update_physics_settings(gravity, bounce);
            }
            ControlMessage::FollowPath { points, duration } => {
                let duration = duration.filter(|ms| *ms > 0).unwrap_or(DEFAULT_PATH_MS);
                self.follow_path(points, millis(duration));
            }
            ControlMessage::TestPath => {
                self.follow_path(motion::test_path(), millis(DEFAULT_PATH_MS));
            }
            ControlMessage::StopPath => {
                self.stop_path();
            }
            ControlMessage::ResetPosition => self.reset_position(),
            ControlMessage::TestEvolutionEffect { stage_name } => {
                let stage = stage_name
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| TEST_STAGE.to_string());
                self.show_evolution_effect(&stage);
            }
            ControlMessage::TestEmoteRain { emotes } => {
                self.rain_emotes(emotes.iter().map(|id| emote_url(id)).collect());
            }
        }
        Ok(())
    }

    /// Store a new configuration document and reload from it.
    pub fn apply_config(&self, document: Value) -> Result<()> {
        self.inner.store.import_value(document)?;
        self.reload()
    }

    // Accessors

    /// The current state name.
    pub fn current_state(&self) -> String {
        self.inner.runtime.lock().state.clone()
    }

    /// A snapshot of the in-memory configuration.
    pub fn config(&self) -> PetConfig {
        self.inner.config.lock().clone()
    }

    /// The unresolved path of the image on screen.
    pub fn current_image(&self) -> Option<String> {
        self.inner.runtime.lock().image.clone()
    }

    /// Whether a movement animation is running.
    pub fn is_moving(&self) -> bool {
        self.inner.runtime.lock().moving
    }

    /// The weather overlay running, if any.
    pub fn weather(&self) -> Option<String> {
        self.inner.runtime.lock().weather.clone()
    }

    /// The speech bubble queue.
    pub fn messages(&self) -> &MessageQueue {
        &self.inner.queue
    }

    /// The configuration store.
    pub fn store(&self) -> &ConfigStore {
        &self.inner.store
    }

    fn in_default_state(&self) -> bool {
        self.inner.runtime.lock().state == DEFAULT_STATE
    }

    fn ensure_running(&self) -> Result<()> {
        if self.inner.scheduler.is_shut_down() {
            return Err(Error::ShutDown);
        }
        Ok(())
    }

    fn emit(&self, effect: Effect) {
        let _ = self.inner.effects.send(effect);
    }

    fn persist(&self) {
        if self.inner.store.fell_back() {
            tracing::debug!("stored configuration is unusable, leaving it untouched");
            return;
        }
        let mut snapshot = self.inner.config.lock().clone();
        if let Err(e) = self.inner.store.save(&mut snapshot) {
            tracing::warn!(error = %e, "failed to save configuration");
        }
    }

    fn later<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce(StreamPet) + Send + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.after(delay, move || {
            if let Some(pet) = upgrade(&weak) {
                task(pet);
            }
        });
    }

    fn repeat<F>(&self, period: Duration, mut tick: F)
    where
        F: FnMut(&StreamPet) + Send + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.every(period, move || {
            if let Some(pet) = upgrade(&weak) {
                tick(&pet);
            }
        });
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<StreamPet> {
    weak.upgrade().map(|inner| StreamPet { inner })
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// The payload's `amount` as a whole number, from a number or a numeric
/// string.
fn payload_amount(payload: &Payload) -> Option<u64> {
    match payload.get("amount")? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64)),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
