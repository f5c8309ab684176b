//! Viewer interaction: the built-in viewer commands, channel-point
//! redemptions, polls, first-time chatter greetings and emote rain.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tokio::time::Instant;

use super::{millis, StreamPet};
use crate::chat::Chatter;
use crate::effect::Effect;
use crate::emotes::EMOTE_STAGGER;
use crate::greetings::GreetingStats;
use crate::polls::{Poll, PollResults};
use crate::template::{replace_variables, Payload};
use crate::viewer::{self, Emotion, RedemptionAction, RedemptionStats, ViewerCommand};

const REDEMPTION_BANNER_MS: u64 = 3000;
const FALLBACK_GREETING_MS: u64 = 5000;

impl StreamPet {
    /// Show an emotion emoji above the pet for `duration`.
    pub fn show_emotion(&self, emotion: Emotion, duration: Duration) {
        self.emit(Effect::EmotionShown { emotion, duration });
    }

    /// Run a built-in viewer command for `chatter`, subject to the viewer
    /// command switches and cooldowns. Returns whether it ran.
    pub fn handle_viewer_command(&self, command: ViewerCommand, chatter: &Chatter) -> bool {
        let settings = {
            let config = self.inner.config.lock();
            let viewer = &config.viewer_interaction;
            if !viewer.enabled
                || !viewer.chat_commands.enabled
                || !viewer.chat_commands.allow_viewer_commands
            {
                return false;
            }
            viewer.chat_commands.clone()
        };

        let claimed = self.inner.runtime.lock().viewer_cooldowns.claim(
            &settings,
            &chatter.username,
            command,
            Instant::now(),
        );
        if !claimed {
            tracing::debug!(command = command.name(), user = %chatter.username, "viewer command on cooldown");
            return false;
        }

        tracing::info!(command = command.name(), user = %chatter.username, "viewer command");
        self.perform(command);
        true
    }

    fn perform(&self, command: ViewerCommand) {
        let reaction = command.reaction();
        if let Some((emotion, duration)) = reaction.emotion {
            self.show_emotion(emotion, duration);
        }
        if let Some(animation) = reaction.animation {
            self.move_pet(animation.name());
        }
        if let Some((kind, count)) = reaction.particles {
            self.spawn_particles(kind.name(), count);
        }
    }

    // Channel points

    /// React to `username` redeeming the reward titled `title` (or with id
    /// `reward_id`). Returns whether a configured redemption matched.
    pub fn handle_redemption(&self, username: &str, title: &str, reward_id: &str) -> bool {
        let redemption = {
            let config = self.inner.config.lock();
            let viewer = &config.viewer_interaction;
            if !viewer.enabled || !viewer.channel_points.enabled {
                return false;
            }
            viewer.channel_points.find(title, reward_id).cloned()
        };
        let Some(redemption) = redemption else {
            tracing::warn!(reward = title, "unknown channel point redemption");
            return false;
        };

        tracing::info!(reward = %redemption.name, user = username, "channel points redeemed");
        self.inner
            .runtime
            .lock()
            .redemptions
            .record(username, &redemption.name, Utc::now());

        match redemption.parsed_action() {
            Some(action) => self.run_redemption(action),
            None => {
                tracing::warn!(action = %redemption.action, reward = %redemption.name, "unsupported redemption action");
            }
        }

        self.emit(Effect::BannerShown {
            text: format!("{username} redeemed {}!", redemption.name),
            duration: millis(REDEMPTION_BANNER_MS),
        });
        true
    }

    fn run_redemption(&self, action: RedemptionAction) {
        match action {
            RedemptionAction::Emotion { emotion, duration } => self.show_emotion(emotion, duration),
            RedemptionAction::Animation(animation) => {
                self.move_pet(animation.name());
            }
            RedemptionAction::State { state, duration } => {
                if self.change_state(&state) {
                    if let Some(delay) = duration {
                        let epoch = self.inner.runtime.lock().state_epoch;
                        self.recover_after(delay, epoch);
                    }
                }
            }
            RedemptionAction::Weather { kind, duration } => {
                let kind = if kind == viewer::RANDOM {
                    let index = self
                        .inner
                        .rng
                        .lock()
                        .gen_range(0..viewer::RANDOM_WEATHER.len());
                    viewer::RANDOM_WEATHER[index].to_string()
                } else {
                    kind
                };
                self.weather_for(&kind, duration);
            }
            RedemptionAction::Physics { duration } => self.physics_for(duration),
            RedemptionAction::Particles { kind, count } => {
                self.spawn_particles(&kind, count);
            }
            RedemptionAction::Sound { path } => {
                self.play_sound(&path);
            }
        }
    }

    /// Redemption totals for this session.
    pub fn redemption_stats(&self) -> RedemptionStats {
        self.inner.runtime.lock().redemptions.stats()
    }

    // Polls

    /// Open a poll that closes itself after `duration`, or the configured
    /// poll duration. Returns the poll id, or `None` when polls are off or
    /// fewer than two options are given.
    pub fn create_poll(
        &self,
        question: &str,
        options: &[String],
        duration: Option<Duration>,
    ) -> Option<String> {
        let duration = {
            let config = self.inner.config.lock();
            let viewer = &config.viewer_interaction;
            if !viewer.enabled || !viewer.polls.enabled {
                return None;
            }
            duration
                .filter(|duration| !duration.is_zero())
                .unwrap_or_else(|| millis(viewer.polls.duration))
        };

        let id = self
            .inner
            .runtime
            .lock()
            .polls
            .create(question, options, Instant::now() + duration)?;
        tracing::info!(poll = %id, question, "poll started");
        self.emit(Effect::PollStarted {
            id: id.clone(),
            question: question.to_string(),
            options: options.to_vec(),
            duration,
        });

        let poll = id.clone();
        self.later(duration, move |pet| {
            pet.end_poll(&poll);
        });
        Some(id)
    }

    /// Count `username`'s vote for option `option` of poll `id`.
    pub fn vote(&self, id: &str, username: &str, option: usize) -> bool {
        self.inner
            .runtime
            .lock()
            .polls
            .vote(id, username, option, Instant::now())
    }

    /// Close a poll early. When pet actions are allowed and the winner
    /// names a viewer command, the pet performs it.
    pub fn end_poll(&self, id: &str) -> Option<PollResults> {
        let results = self.inner.runtime.lock().polls.end(id)?;
        tracing::info!(poll = id, winner = %results.winner, votes = results.total_votes, "poll ended");
        self.emit(Effect::PollEnded {
            id: id.to_string(),
            results: results.clone(),
        });

        let pet_actions = {
            let config = self.inner.config.lock();
            config.viewer_interaction.polls.allow_pet_actions
        };
        if pet_actions && results.total_votes > 0 {
            if let Some(command) = ViewerCommand::from_name(&results.winner) {
                self.perform(command);
            }
        }
        Some(results)
    }

    /// A snapshot of an open poll.
    pub fn active_poll(&self, id: &str) -> Option<Poll> {
        self.inner.runtime.lock().polls.get(id).cloned()
    }

    // Greetings

    /// Greet `chatter` if this is their first message this session.
    pub fn greet_chatter(&self, chatter: &Chatter) -> bool {
        let settings = {
            let config = self.inner.config.lock();
            if !config.greetings.enabled {
                return false;
            }
            config.greetings.clone()
        };
        if !self
            .inner
            .runtime
            .lock()
            .greetings
            .first_time(&chatter.username)
        {
            return false;
        }

        let template = {
            let mut rng = self.inner.rng.lock();
            settings
                .template_for(&chatter.username, |count| rng.gen_range(0..count))
                .to_string()
        };
        let mut payload = Payload::new();
        payload.insert("user".to_string(), Value::String(chatter.username.clone()));
        let duration = match settings.duration {
            0 => millis(FALLBACK_GREETING_MS),
            ms => millis(ms),
        };

        tracing::info!(user = %chatter.username, "greeting first-time chatter");
        self.show_message(&replace_variables(&template, &payload), Some(duration));
        self.show_image(&settings.image, Some(duration));
        self.play_sound(&settings.sound);
        if settings.particles {
            self.spawn_particles("hearts", self.inner.options.particle_burst);
        }
        self.inner.runtime.lock().greetings.count_sent();
        true
    }

    pub fn greeting_stats(&self) -> GreetingStats {
        self.inner.runtime.lock().greetings.stats()
    }

    /// Forget who has been greeted, so everyone is greeted again.
    pub fn reset_greeting_session(&self) {
        self.inner.runtime.lock().greetings.reset();
        tracing::info!("greeting session reset");
    }

    // Emote rain

    pub(super) fn rain_from_chat(&self, chatter: &Chatter) -> bool {
        let settings = self.inner.config.lock().twitch.emote_rain.clone();
        let urls = self
            .inner
            .runtime
            .lock()
            .emote_rain
            .rain_for(&settings, chatter, Instant::now());
        if urls.is_empty() {
            return false;
        }
        self.rain_emotes(urls);
        true
    }

    /// Drop each emote image in turn, without any cooldown or permission
    /// check.
    pub fn rain_emotes(&self, urls: Vec<String>) {
        let settings = self.inner.config.lock().twitch.emote_rain.clone();
        tracing::debug!(count = urls.len(), "emote rain");
        for (index, url) in urls.into_iter().enumerate() {
            let effect = Effect::EmoteDropped {
                url,
                size: settings.emote_size,
                fall: millis(settings.fall_duration),
                rotate: settings.rotate,
                bounce: settings.bounce,
            };
            if index == 0 {
                self.emit(effect);
            } else {
                self.later(EMOTE_STAGGER * index as u32, move |pet| pet.emit(effect));
            }
        }
    }
}
