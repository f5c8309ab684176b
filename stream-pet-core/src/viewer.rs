//! Viewer-driven reactions.
//!
//! The built-in `pet`, `wave`, `feed`, `play` and `hug` commands, the
//! actions behind channel-point redemptions and the redemption history.
//! Like growth, this is bookkeeping only; [`crate::StreamPet`] turns the
//! results into effects.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::config::{ChannelPointSettings, Redemption, ViewerCommandSettings};
use crate::effect::{Animation, ParticleKind};

/// Redemptions kept in the history.
const HISTORY_LIMIT: usize = 100;
/// Redemptions reported as recent.
const RECENT_LIMIT: usize = 10;

const DEFAULT_EMOTION_MS: u64 = 3000;
const DEFAULT_PARTICLE_COUNT: u32 = 20;
const DEFAULT_PARTICLES: &str = "hearts";

/// Weather kind that asks for a random pick from [`RANDOM_WEATHER`].
pub const RANDOM: &str = "random";
pub const RANDOM_WEATHER: [&str; 4] = ["rain", "snow", "leaves", "sakura"];
pub const DEFAULT_REDEMPTION_WEATHER: &str = "rain";

/// An emoji shown above the pet for a while.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Excited,
    Love,
    Sad,
    Angry,
    Surprised,
    Sleepy,
    Cool,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Happy,
        Emotion::Excited,
        Emotion::Love,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Surprised,
        Emotion::Sleepy,
        Emotion::Cool,
    ];

    /// Look up an emotion by name. Unknown names fall back to happy.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|emotion| emotion.name() == name)
            .unwrap_or(Emotion::Happy)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Excited => "excited",
            Emotion::Love => "love",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Surprised => "surprised",
            Emotion::Sleepy => "sleepy",
            Emotion::Cool => "cool",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Emotion::Happy => "😊",
            Emotion::Excited => "😄",
            Emotion::Love => "😍",
            Emotion::Sad => "😢",
            Emotion::Angry => "😠",
            Emotion::Surprised => "😮",
            Emotion::Sleepy => "😴",
            Emotion::Cool => "😎",
        }
    }
}

/// A built-in command any viewer can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerCommand {
    Pet,
    Wave,
    Feed,
    Play,
    Hug,
}

/// What the pet does for a [`ViewerCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerReaction {
    pub emotion: Option<(Emotion, Duration)>,
    pub animation: Option<Animation>,
    pub particles: Option<(ParticleKind, u32)>,
}

impl ViewerCommand {
    pub const ALL: [ViewerCommand; 5] = [
        ViewerCommand::Pet,
        ViewerCommand::Wave,
        ViewerCommand::Feed,
        ViewerCommand::Play,
        ViewerCommand::Hug,
    ];

    /// Match a bare command word, case-insensitively. A leading `!` is not
    /// stripped, so a configured `!pet` command keeps its own reaction.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|command| command.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewerCommand::Pet => "pet",
            ViewerCommand::Wave => "wave",
            ViewerCommand::Feed => "feed",
            ViewerCommand::Play => "play",
            ViewerCommand::Hug => "hug",
        }
    }

    pub fn reaction(&self) -> ViewerReaction {
        let emotion = |emotion, ms| Some((emotion, Duration::from_millis(ms)));
        match self {
            ViewerCommand::Pet => ViewerReaction {
                emotion: emotion(Emotion::Happy, 3000),
                animation: None,
                particles: Some((ParticleKind::Hearts, 10)),
            },
            ViewerCommand::Wave => ViewerReaction {
                emotion: None,
                animation: Some(Animation::Wiggle),
                particles: None,
            },
            ViewerCommand::Feed => ViewerReaction {
                emotion: emotion(Emotion::Love, 3000),
                animation: None,
                particles: None,
            },
            ViewerCommand::Play => ViewerReaction {
                emotion: None,
                animation: Some(Animation::Bounce),
                particles: Some((ParticleKind::Stars, 15)),
            },
            ViewerCommand::Hug => ViewerReaction {
                emotion: emotion(Emotion::Love, 4000),
                animation: None,
                particles: None,
            },
        }
    }
}

/// Global and per-viewer cooldowns for [`ViewerCommand`]s.
#[derive(Debug, Default)]
pub struct CommandCooldowns {
    global_until: Option<Instant>,
    used: HashMap<(String, ViewerCommand), Instant>,
}

impl CommandCooldowns {
    /// Claim a use of `command` by `user`. Returns `false` while either
    /// cooldown runs; otherwise restarts both.
    pub fn claim(
        &mut self,
        settings: &ViewerCommandSettings,
        user: &str,
        command: ViewerCommand,
        now: Instant,
    ) -> bool {
        if self.global_until.is_some_and(|until| now < until) {
            return false;
        }
        let key = (user.to_lowercase(), command);
        if let Some(last) = self.used.get(&key) {
            if now.duration_since(*last) < Duration::from_millis(settings.cooldown) {
                return false;
            }
        }
        self.global_until = Some(now + Duration::from_millis(settings.global_cooldown));
        self.used.insert(key, now);
        true
    }
}

/// A redemption's action, with its parameters defaulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionAction {
    Emotion {
        emotion: Emotion,
        duration: Duration,
    },
    Animation(Animation),
    /// Enter a state, recovering after `duration` if given.
    State {
        state: String,
        duration: Option<Duration>,
    },
    /// Start weather, stopping it after `duration` if given. The kind may
    /// be [`RANDOM`].
    Weather {
        kind: String,
        duration: Option<Duration>,
    },
    /// Turn physics on, off again after `duration` if given.
    Physics { duration: Option<Duration> },
    Particles { kind: String, count: u32 },
    Sound { path: String },
}

impl Redemption {
    /// The action this redemption runs, or `None` for unknown actions,
    /// unknown animations and missing required parameters.
    pub fn parsed_action(&self) -> Option<RedemptionAction> {
        let params = &self.parameters;
        let timed = params
            .duration
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        let action = match self.action.as_str() {
            "emotion" => RedemptionAction::Emotion {
                emotion: Emotion::from_name(params.emotion.as_deref().unwrap_or_default()),
                duration: Duration::from_millis(params.duration.unwrap_or(DEFAULT_EMOTION_MS)),
            },
            "animation" => {
                RedemptionAction::Animation(redemption_animation(params.animation.as_deref()?)?)
            }
            "state" => RedemptionAction::State {
                state: params.state.clone()?,
                duration: timed,
            },
            "weather" => RedemptionAction::Weather {
                kind: params
                    .kind
                    .clone()
                    .unwrap_or_else(|| DEFAULT_REDEMPTION_WEATHER.to_string()),
                duration: timed,
            },
            "physics" => RedemptionAction::Physics { duration: timed },
            "particle" | "particles" => RedemptionAction::Particles {
                kind: params
                    .kind
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PARTICLES.to_string()),
                count: params.count.unwrap_or(DEFAULT_PARTICLE_COUNT),
            },
            "sound" => RedemptionAction::Sound {
                path: params.sound.clone().filter(|path| !path.is_empty())?,
            },
            _ => return None,
        };
        Some(action)
    }
}

/// Map a redemption's animation name onto the movement catalogue.
fn redemption_animation(name: &str) -> Option<Animation> {
    match name {
        "dance" | "spin" | "rotate" => Some(Animation::Spin),
        "wave" => Some(Animation::Wiggle),
        other => Animation::from_name(other),
    }
}

impl ChannelPointSettings {
    /// The redemption for a reward, matched by title (case-insensitive) or
    /// by id.
    pub fn find(&self, title: &str, reward_id: &str) -> Option<&Redemption> {
        let title = title.to_lowercase();
        self.custom_redemptions.iter().find(|redemption| {
            redemption.name.to_lowercase() == title
                || (!reward_id.is_empty() && redemption.id == reward_id)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRecord {
    pub username: String,
    pub redemption: String,
    pub timestamp: DateTime<Utc>,
}

/// Redemption totals for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionStats {
    /// Redemptions still in the history.
    pub total: usize,
    /// Every redemption this session, by name.
    pub by_type: BTreeMap<String, u64>,
    /// The latest redemptions, oldest first.
    pub recent: Vec<RedemptionRecord>,
}

#[derive(Debug, Default)]
pub struct RedemptionLog {
    history: VecDeque<RedemptionRecord>,
    by_type: BTreeMap<String, u64>,
}

impl RedemptionLog {
    pub fn record(&mut self, username: &str, redemption: &str, timestamp: DateTime<Utc>) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(RedemptionRecord {
            username: username.to_string(),
            redemption: redemption.to_string(),
            timestamp,
        });
        *self.by_type.entry(redemption.to_string()).or_default() += 1;
    }

    pub fn stats(&self) -> RedemptionStats {
        let skip = self.history.len().saturating_sub(RECENT_LIMIT);
        RedemptionStats {
            total: self.history.len(),
            by_type: self.by_type.clone(),
            recent: self.history.iter().skip(skip).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedemptionParameters;

    fn redemption(action: &str, parameters: RedemptionParameters) -> Redemption {
        Redemption {
            id: "r1".to_string(),
            name: "Test".to_string(),
            cost: 1,
            action: action.to_string(),
            parameters,
        }
    }

    #[test]
    fn test_emotion_lookup() {
        assert_eq!(Emotion::from_name("cool"), Emotion::Cool);
        assert_eq!(Emotion::from_name("grumpy"), Emotion::Happy);
        assert_eq!(Emotion::Love.emoji(), "😍");
    }

    #[test]
    fn test_viewer_command_names() {
        assert_eq!(ViewerCommand::from_name("HUG"), Some(ViewerCommand::Hug));
        assert_eq!(ViewerCommand::from_name("!pet"), None);
        assert_eq!(ViewerCommand::from_name("dance"), None);

        let play = ViewerCommand::Play.reaction();
        assert_eq!(play.animation, Some(Animation::Bounce));
        assert_eq!(play.particles, Some((ParticleKind::Stars, 15)));
        assert_eq!(
            ViewerCommand::Hug.reaction().emotion,
            Some((Emotion::Love, Duration::from_millis(4000)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_cooldowns() {
        let settings = ViewerCommandSettings {
            cooldown: 30_000,
            global_cooldown: 5000,
            ..ViewerCommandSettings::default()
        };
        let mut cooldowns = CommandCooldowns::default();
        let start = Instant::now();

        assert!(cooldowns.claim(&settings, "Ann", ViewerCommand::Hug, start));
        // Anyone is held back by the global cooldown.
        let soon = start + Duration::from_millis(4000);
        assert!(!cooldowns.claim(&settings, "Bo", ViewerCommand::Pet, soon));

        let later = start + Duration::from_millis(6000);
        assert!(!cooldowns.claim(&settings, "ann", ViewerCommand::Hug, later));
        assert!(cooldowns.claim(&settings, "Ann", ViewerCommand::Wave, later));

        let much_later = start + Duration::from_millis(31_000);
        assert!(cooldowns.claim(&settings, "Ann", ViewerCommand::Hug, much_later));
    }

    #[test]
    fn test_parsed_actions() {
        let dance = redemption(
            "animation",
            RedemptionParameters {
                animation: Some("dance".to_string()),
                duration: Some(3000),
                ..RedemptionParameters::default()
            },
        );
        assert_eq!(
            dance.parsed_action(),
            Some(RedemptionAction::Animation(Animation::Spin))
        );

        let emotion = redemption("emotion", RedemptionParameters::default());
        assert_eq!(
            emotion.parsed_action(),
            Some(RedemptionAction::Emotion {
                emotion: Emotion::Happy,
                duration: Duration::from_millis(3000)
            })
        );

        let particles = redemption("particle", RedemptionParameters::default());
        assert_eq!(
            particles.parsed_action(),
            Some(RedemptionAction::Particles {
                kind: "hearts".to_string(),
                count: 20
            })
        );

        let weather = redemption(
            "weather",
            RedemptionParameters {
                duration: Some(0),
                ..RedemptionParameters::default()
            },
        );
        assert_eq!(
            weather.parsed_action(),
            Some(RedemptionAction::Weather {
                kind: "rain".to_string(),
                duration: None
            })
        );

        assert_eq!(redemption("custom", RedemptionParameters::default()).parsed_action(), None);
        assert_eq!(redemption("state", RedemptionParameters::default()).parsed_action(), None);
        assert_eq!(redemption("sound", RedemptionParameters::default()).parsed_action(), None);
    }

    #[test]
    fn test_find_by_title_or_id() {
        let settings = ChannelPointSettings::default();
        assert_eq!(
            settings.find("make pet DANCE", "").map(|r| r.id.as_str()),
            Some("pet_dance")
        );
        assert_eq!(
            settings.find("Renamed", "pet_spin").map(|r| r.id.as_str()),
            Some("pet_spin")
        );
        assert!(settings.find("Hydrate", "").is_none());
    }

    #[test]
    fn test_redemption_log_caps_history() {
        let mut log = RedemptionLog::default();
        let now = Utc::now();
        for i in 0..105 {
            let name = if i % 2 == 0 { "Spin Pet" } else { "Make Pet Happy" };
            log.record(&format!("viewer{i}"), name, now);
        }

        let stats = log.stats();
        assert_eq!(stats.total, 100);
        assert_eq!(stats.by_type["Spin Pet"], 53);
        assert_eq!(stats.by_type["Make Pet Happy"], 52);
        assert_eq!(stats.recent.len(), 10);
        assert_eq!(stats.recent[9].username, "viewer104");

        let value = serde_json::to_value(&stats).unwrap();
        assert!(value.get("byType").is_some());
    }
}
