//! Persisted pet configuration.
//!
//! The configuration is one JSON document with a typed record per section.
//! Stored documents are deep-merged onto [`PetConfig::default`] so fields
//! introduced by newer versions are backfilled, and [`PetConfig::validate`]
//! clamps out-of-range values before anything is written back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chat::Role;
use crate::error::{Error, Result};

/// Name of the implicit state the pet starts in and recovers to.
pub const DEFAULT_STATE: &str = "default";

/// Schema version written into new documents.
const CONFIG_VERSION: &str = "1.0.0";

/// Keyed collections that replace their defaults wholesale instead of
/// merging entry by entry, so removed entries stay removed.
const REPLACED_MAPS: &[&str] = &[
    "/events",
    "/commands",
    "/states",
    "/seasonal/themes",
    "/pet/imageVariants",
    "/greetings/customGreetings",
];

/// Sections a document must carry to be imported.
const REQUIRED_SECTIONS: &[&str] = &["pet", "events", "states"];

/// The complete pet configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PetConfig {
    /// Schema version.
    pub version: String,
    /// Appearance of the pet.
    pub pet: PetSettings,
    /// Platform event reactions keyed by event name.
    pub events: BTreeMap<String, EventConfig>,
    /// Chat command reactions keyed by command text.
    pub commands: BTreeMap<String, CommandConfig>,
    /// Custom states keyed by state name.
    pub states: BTreeMap<String, StateConfig>,
    /// Timing, sound, particle and interaction settings.
    pub advanced: AdvancedSettings,
    /// Leveling progress and rules.
    pub growth: GrowthSettings,
    /// Usage counters.
    pub analytics: AnalyticsSettings,
    /// Date-driven theme overrides.
    pub seasonal: SeasonalSettings,
    /// Channel-point redemptions, viewer commands and polls.
    pub viewer_interaction: ViewerInteractionSettings,
    /// First-time chatter greetings.
    pub greetings: GreetingSettings,
    /// Chat platform extras.
    pub twitch: TwitchSettings,
}

/// Pet appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PetSettings {
    pub name: String,
    pub default_image: String,
    pub blink_image: String,
    /// Milliseconds between blinks.
    pub blink_interval: u64,
    /// Milliseconds a blink lasts. Must be shorter than the interval.
    pub blink_duration: u64,
    /// Percent offsets from the left/top edge.
    pub position: Position,
    pub size: SizeSettings,
    pub opacity: f64,
    pub flip_horizontal: bool,
    /// Per-field image overrides keyed by field name (`defaultImage`, ...).
    pub image_variants: BTreeMap<String, ImageVariants>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SizeSettings {
    pub width: u32,
    pub height: u32,
    pub mode: SizeMode,
    pub width_percent: f64,
    pub height_percent: f64,
    pub scale: f64,
    pub maintain_aspect: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMode {
    #[default]
    Pixels,
    Percent,
    Auto,
    Scale,
}

/// Alternative images for one field, chosen by season or growth stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageVariants {
    /// Season name to image path.
    pub seasonal: BTreeMap<String, String>,
    /// Growth stage name to image path.
    pub growth: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Reaction to a platform event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventConfig {
    pub enabled: bool,
    pub image: String,
    /// Message template with `{key}` placeholders.
    pub message: String,
    /// Milliseconds the image and message stay up.
    pub duration: u64,
    /// Carried for the configuration page only; the queue is strictly FIFO.
    pub priority: u32,
    pub animation: String,
    pub particles: String,
    pub sound: String,
    /// Payload `amount` below this suppresses the reaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<u64>,
}

/// Reaction to a chat command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandConfig {
    pub enabled: bool,
    pub image: String,
    pub message: String,
    pub duration: u64,
    pub animation: String,
    pub particles: String,
    pub sound: String,
    pub required_role: Role,
    /// Milliseconds before the command can fire again.
    pub cooldown: u64,
}

/// A named mode the pet can enter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateConfig {
    pub enabled: bool,
    pub image: String,
    /// Probability per check, in `[0, 1]`.
    pub trigger_chance: f64,
    /// Milliseconds between random checks.
    pub check_interval: u64,
    /// Chat text that brings the pet back to default. Empty disables it.
    pub recovery_command: String,
    /// Events still allowed while in this state. Empty allows all.
    pub allowed_events: Vec<String>,
    pub message: String,
    /// Shown when a viewer uses the recovery command.
    pub command_message: String,
    pub required_role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_recover_time: Option<u64>,
    pub sound: String,
    pub particles: String,
    pub animation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdvancedSettings {
    /// Milliseconds for an image cross-fade.
    pub transition_duration: u64,
    /// Milliseconds between queued messages.
    pub message_queue_delay: u64,
    pub bubble_style: String,
    pub enable_sounds: bool,
    pub sound_volume: f64,
    pub enable_particles: bool,
    pub particle_settings: ParticleSettings,
    pub enable_click_interaction: bool,
    pub click_message: String,
    pub click_animation: String,
    pub click_particles: String,
    pub click_sound: String,
    pub enable_idle_animations: bool,
    pub idle_animation_interval: u64,
    /// Animation name to whether it may play while idle.
    pub idle_animations: BTreeMap<String, bool>,
    pub debug_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    pub size: u32,
    pub count: u32,
    pub spread: f64,
    pub speed: f64,
    pub lifetime: u64,
    pub gravity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GrowthSettings {
    pub enabled: bool,
    pub level: u32,
    pub experience: u64,
    pub experience_to_next_level: u64,
    pub total_experience: u64,
    /// Index into `stages`.
    pub evolution_stage: usize,
    pub stages: Vec<GrowthStage>,
    /// Experience per source (`follow`, `bits`, `command`, `click`, ...).
    pub experience_gains: BTreeMap<String, u64>,
    pub unlocked_animations: Vec<String>,
    pub unlocked_particles: Vec<String>,
    pub show_level_up: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthStage {
    pub name: String,
    pub level: u32,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyticsSettings {
    pub enabled: bool,
    pub session_count: u64,
    pub stats: AnalyticsStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyticsStats {
    pub events_triggered: BTreeMap<String, u64>,
    pub commands_used: BTreeMap<String, u64>,
    pub states_entered: BTreeMap<String, u64>,
    pub total_clicks: u64,
    pub total_particles: u64,
    pub total_messages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeasonalSettings {
    pub enabled: bool,
    pub auto_detect: bool,
    pub current_season: String,
    pub themes: BTreeMap<String, SeasonalTheme>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeasonalTheme {
    /// `MM-DD`, inclusive.
    pub start_date: String,
    /// `MM-DD`, inclusive. An end before the start wraps the year.
    pub end_date: String,
    pub default_image: String,
    pub particles: String,
    pub bubble_style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerInteractionSettings {
    pub enabled: bool,
    pub channel_points: ChannelPointSettings,
    pub chat_commands: ViewerCommandSettings,
    pub polls: PollSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChannelPointSettings {
    pub enabled: bool,
    /// Matched against the reward title (case-insensitive) or reward id.
    pub custom_redemptions: Vec<Redemption>,
}

/// A channel-point reward the pet reacts to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Redemption {
    pub id: String,
    pub name: String,
    pub cost: u64,
    /// `emotion`, `animation`, `state`, `weather`, `physics`, `particle`
    /// or `sound`.
    pub action: String,
    pub parameters: RedemptionParameters,
}

/// Parameters for a redemption action. Which ones apply depends on the
/// action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RedemptionParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Weather kind (`random` picks one) or particle set.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Milliseconds before the action is undone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

/// The built-in `pet`, `wave`, `feed`, `play` and `hug` commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerCommandSettings {
    pub enabled: bool,
    pub allow_viewer_commands: bool,
    /// Milliseconds before the same viewer can repeat a command.
    pub cooldown: u64,
    /// Milliseconds after any command before the next one is accepted.
    pub global_cooldown: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PollSettings {
    pub enabled: bool,
    pub allow_pet_actions: bool,
    /// Milliseconds a poll runs when created without a duration.
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GreetingSettings {
    pub enabled: bool,
    pub image: String,
    pub sound: String,
    /// Burst hearts with the greeting.
    pub particles: bool,
    /// Milliseconds the greeting and its image stay up.
    pub duration: u64,
    /// Templates with a `{user}` placeholder, one picked at random.
    pub messages: Vec<String>,
    /// Lowercase username to a personal greeting.
    pub custom_greetings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TwitchSettings {
    pub emote_rain: EmoteRainSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmoteRainSettings {
    pub enabled: bool,
    pub user_level: RainAudience,
    /// Emotes dropped per message at most.
    pub max_emotes: usize,
    /// Pixel size of each emote.
    pub emote_size: u32,
    /// Milliseconds an emote takes to fall.
    pub fall_duration: u64,
    /// Seconds before the same viewer can trigger again.
    pub user_cooldown: u64,
    /// Seconds between any two rains.
    pub global_cooldown: u64,
    pub rotate: bool,
    pub bounce: bool,
}

/// Who may make emotes rain. The broadcaster always may.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RainAudience {
    /// Follower status is not visible from chat, so this admits everyone.
    Follower,
    Subscriber,
    Vip,
    Moderator,
    #[default]
    #[serde(other)]
    All,
}

impl RainAudience {
    /// The chat role this audience requires.
    pub fn role(self) -> Role {
        match self {
            RainAudience::All | RainAudience::Follower => Role::Everyone,
            RainAudience::Subscriber => Role::Subscriber,
            RainAudience::Vip => Role::Vip,
            RainAudience::Moderator => Role::Moderator,
        }
    }
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            pet: PetSettings::default(),
            events: default_events(),
            commands: default_commands(),
            states: default_states(),
            advanced: AdvancedSettings::default(),
            growth: GrowthSettings::default(),
            analytics: AnalyticsSettings::default(),
            seasonal: SeasonalSettings::default(),
            viewer_interaction: ViewerInteractionSettings::default(),
            greetings: GreetingSettings::default(),
            twitch: TwitchSettings::default(),
        }
    }
}

impl Default for PetSettings {
    fn default() -> Self {
        Self {
            name: "Stream Pet".to_string(),
            default_image: "Images/default.png".to_string(),
            blink_image: "Images/blink.png".to_string(),
            blink_interval: 5000,
            blink_duration: 200,
            position: Position { x: 50.0, y: 50.0 },
            size: SizeSettings::default(),
            opacity: 1.0,
            flip_horizontal: false,
            image_variants: BTreeMap::new(),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

impl Default for SizeSettings {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            mode: SizeMode::Pixels,
            width_percent: 10.0,
            height_percent: 10.0,
            scale: 1.0,
            maintain_aspect: true,
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            image: String::new(),
            message: String::new(),
            duration: 4000,
            priority: 5,
            animation: "none".to_string(),
            particles: "none".to_string(),
            sound: String::new(),
            min_amount: None,
        }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            image: String::new(),
            message: String::new(),
            duration: 3000,
            animation: "none".to_string(),
            particles: "none".to_string(),
            sound: String::new(),
            required_role: Role::Everyone,
            cooldown: 10_000,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            image: String::new(),
            trigger_chance: 0.0,
            check_interval: 0,
            recovery_command: String::new(),
            allowed_events: Vec::new(),
            message: String::new(),
            command_message: String::new(),
            required_role: Role::Everyone,
            auto_recover_time: None,
            sound: String::new(),
            particles: "none".to_string(),
            animation: "none".to_string(),
        }
    }
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        let idle_animations = [
            ("bounce", true),
            ("wiggle", true),
            ("float", true),
            ("spin", false),
            ("sway", true),
            ("hop", true),
        ]
        .into_iter()
        .map(|(name, enabled)| (name.to_string(), enabled))
        .collect();

        Self {
            transition_duration: 300,
            message_queue_delay: 2000,
            bubble_style: "default".to_string(),
            enable_sounds: true,
            sound_volume: 0.5,
            enable_particles: true,
            particle_settings: ParticleSettings::default(),
            enable_click_interaction: true,
            click_message: "You clicked me! 😊".to_string(),
            click_animation: "bounce".to_string(),
            click_particles: "hearts".to_string(),
            click_sound: String::new(),
            enable_idle_animations: true,
            idle_animation_interval: 30_000,
            idle_animations,
            debug_mode: false,
        }
    }
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            size: 40,
            count: 10,
            spread: 150.0,
            speed: 5.0,
            lifetime: 2000,
            gravity: 0.5,
        }
    }
}

impl Default for GrowthSettings {
    fn default() -> Self {
        let stages = [
            ("Baby", 1, "Images/baby.png"),
            ("Teen", 5, "Images/teen.png"),
            ("Adult", 10, "Images/adult.png"),
            ("Legendary", 20, "Images/legendary.png"),
        ]
        .into_iter()
        .map(|(name, level, image)| GrowthStage {
            name: name.to_string(),
            level,
            image: image.to_string(),
        })
        .collect();

        let experience_gains = [
            ("follow", 10),
            ("subscribe", 50),
            ("giftSub", 75),
            ("raid", 100),
            ("bits", 1),
            ("channelPoints", 5),
            ("command", 2),
            ("click", 1),
        ]
        .into_iter()
        .map(|(source, xp)| (source.to_string(), xp))
        .collect();

        Self {
            enabled: true,
            level: 1,
            experience: 0,
            experience_to_next_level: 100,
            total_experience: 0,
            evolution_stage: 0,
            stages,
            experience_gains,
            unlocked_animations: vec!["bounce".to_string(), "wiggle".to_string()],
            unlocked_particles: vec!["hearts".to_string()],
            show_level_up: true,
        }
    }
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            session_count: 0,
            stats: AnalyticsStats::default(),
        }
    }
}

impl Default for SeasonalSettings {
    fn default() -> Self {
        let themes = [
            ("halloween", "10-15", "11-01", "Images/halloween.png", "celebrate", "fiery"),
            ("christmas", "12-01", "12-26", "Images/christmas.png", "ice", "ice"),
            ("newYear", "12-27", "01-02", "Images/newyear.png", "celebrate", "neon-cyberpunk"),
            ("valentine", "02-10", "02-15", "Images/valentine.png", "hearts", "cute"),
            ("easter", "04-13", "04-21", "Images/easter.png", "celebrate", "cute"),
            ("summer", "06-20", "09-22", "Images/summer.png", "fire", "fiery"),
        ]
        .into_iter()
        .map(|(name, start, end, image, particles, style)| {
            (
                name.to_string(),
                SeasonalTheme {
                    start_date: start.to_string(),
                    end_date: end.to_string(),
                    default_image: image.to_string(),
                    particles: particles.to_string(),
                    bubble_style: style.to_string(),
                },
            )
        })
        .collect();

        Self {
            enabled: true,
            auto_detect: true,
            current_season: "default".to_string(),
            themes,
        }
    }
}

impl Default for ViewerInteractionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_points: ChannelPointSettings::default(),
            chat_commands: ViewerCommandSettings::default(),
            polls: PollSettings::default(),
        }
    }
}

impl Default for ChannelPointSettings {
    fn default() -> Self {
        let redemption = |id: &str, name: &str, cost: u64, action: &str| Redemption {
            id: id.to_string(),
            name: name.to_string(),
            cost,
            action: action.to_string(),
            parameters: RedemptionParameters::default(),
        };
        let custom_redemptions = vec![
            Redemption {
                parameters: RedemptionParameters {
                    emotion: Some("happy".to_string()),
                    duration: Some(5000),
                    ..RedemptionParameters::default()
                },
                ..redemption("pet_happy", "Make Pet Happy", 100, "emotion")
            },
            Redemption {
                parameters: RedemptionParameters {
                    animation: Some("dance".to_string()),
                    duration: Some(3000),
                    ..RedemptionParameters::default()
                },
                ..redemption("pet_dance", "Make Pet Dance", 200, "animation")
            },
            Redemption {
                parameters: RedemptionParameters {
                    state: Some("excited".to_string()),
                    duration: Some(5000),
                    ..RedemptionParameters::default()
                },
                ..redemption("pet_hype", "Hype Pet Up", 150, "state")
            },
            Redemption {
                parameters: RedemptionParameters {
                    animation: Some("spin".to_string()),
                    duration: Some(2000),
                    ..RedemptionParameters::default()
                },
                ..redemption("pet_spin", "Spin Pet", 100, "animation")
            },
            Redemption {
                parameters: RedemptionParameters {
                    kind: Some("random".to_string()),
                    duration: Some(10_000),
                    ..RedemptionParameters::default()
                },
                ..redemption("weather_effect", "Weather Effect", 300, "weather")
            },
        ];
        Self {
            enabled: true,
            custom_redemptions,
        }
    }
}

impl Default for ViewerCommandSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_viewer_commands: true,
            cooldown: 30_000,
            global_cooldown: 5000,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_pet_actions: true,
            duration: 60_000,
        }
    }
}

impl Default for GreetingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            image: "Images/wave.png".to_string(),
            sound: String::new(),
            particles: true,
            duration: 5000,
            messages: [
                "Welcome {user}! Thanks for chatting! 💜",
                "Hey {user}! Great to see you here! 👋",
                "Hello {user}! Thanks for joining the chat! ✨",
                "{user} is here! Welcome! 🎉",
                "Hi {user}! Happy to have you chatting! 😊",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            custom_greetings: BTreeMap::new(),
        }
    }
}

impl Default for EmoteRainSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            user_level: RainAudience::All,
            max_emotes: 5,
            emote_size: 48,
            fall_duration: 2000,
            user_cooldown: 5,
            global_cooldown: 1,
            rotate: true,
            bounce: true,
        }
    }
}

fn default_events() -> BTreeMap<String, EventConfig> {
    let event = |image: &str, message: &str, duration: u64, priority: u32| EventConfig {
        image: image.to_string(),
        message: message.to_string(),
        duration,
        priority,
        ..EventConfig::default()
    };

    let mut events = BTreeMap::new();
    events.insert(
        "raid".to_string(),
        event(
            "Images/excited.png",
            "Welcome {raider} and their {count} raiders! 🎉",
            5000,
            10,
        ),
    );
    events.insert(
        "follow".to_string(),
        event(
            "Images/happy.png",
            "Thanks for the follow, {username}! 💜",
            4000,
            5,
        ),
    );
    events.insert(
        "subscribe".to_string(),
        event(
            "Images/excited.png",
            "Thank you for subscribing, {username}! 🌟",
            5000,
            9,
        ),
    );
    events.insert(
        "giftSub".to_string(),
        event(
            "Images/excited.png",
            "{gifter} gifted {count} subs! Amazing! 🎁",
            5000,
            9,
        ),
    );
    events.insert(
        "bits".to_string(),
        EventConfig {
            min_amount: Some(100),
            ..event(
                "Images/happy.png",
                "{username} cheered {amount} bits! Thanks! ✨",
                4000,
                7,
            )
        },
    );
    events.insert(
        "channelPoints".to_string(),
        event(
            "Images/curious.png",
            "{username} redeemed {reward}!",
            4000,
            6,
        ),
    );
    events
}

fn default_commands() -> BTreeMap<String, CommandConfig> {
    let mut commands = BTreeMap::new();
    commands.insert(
        "!pet".to_string(),
        CommandConfig {
            image: "Images/happy.png".to_string(),
            message: "Thanks for the pets! 💜".to_string(),
            ..CommandConfig::default()
        },
    );
    commands.insert(
        "!treat".to_string(),
        CommandConfig {
            image: "Images/excited.png".to_string(),
            message: "{username} gave me a treat! 🍪".to_string(),
            ..CommandConfig::default()
        },
    );
    commands
}

fn default_states() -> BTreeMap<String, StateConfig> {
    let mut states = BTreeMap::new();
    states.insert(
        "sad".to_string(),
        StateConfig {
            image: "Images/sad.png".to_string(),
            trigger_chance: 0.05,
            check_interval: 300_000,
            recovery_command: "!pet".to_string(),
            allowed_events: vec!["raid".into(), "subscribe".into(), "giftSub".into()],
            message: "I'm feeling a bit down... 😢".to_string(),
            command_message: "{username} cheered me up! 💖".to_string(),
            ..StateConfig::default()
        },
    );
    states.insert(
        "asleep".to_string(),
        StateConfig {
            image: "Images/asleep.png".to_string(),
            trigger_chance: 0.03,
            check_interval: 600_000,
            recovery_command: "!wake".to_string(),
            allowed_events: vec!["raid".into()],
            message: "Zzz... 😴".to_string(),
            command_message: "{username} woke me up!".to_string(),
            ..StateConfig::default()
        },
    );
    states.insert(
        "excited".to_string(),
        StateConfig {
            image: "Images/excited.png".to_string(),
            trigger_chance: 0.08,
            check_interval: 240_000,
            message: "I'm super hyped! 🔥".to_string(),
            auto_recover_time: Some(30_000),
            ..StateConfig::default()
        },
    );
    states
}

impl PetConfig {
    /// Build a configuration from a stored document, backfilling every
    /// field the document does not carry from the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigParse` if the merged document does not fit the
    /// schema (e.g. a string where a number belongs).
    pub fn merged_with(stored: Value) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())
            .map_err(|source| Error::ConfigSerialize { source })?;
        deep_merge(&mut merged, stored, "");
        serde_json::from_value(merged).map_err(|source| Error::ConfigParse { source })
    }

    /// Check that a raw document carries the sections an import requires.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` naming the first missing section.
    pub fn check_sections(document: &Value) -> Result<()> {
        let Some(object) = document.as_object() else {
            return Err(Error::invalid_config("configuration must be a JSON object"));
        };
        for section in REQUIRED_SECTIONS {
            if !object.get(*section).is_some_and(Value::is_object) {
                return Err(Error::invalid_config(format!(
                    "missing required section '{section}'"
                )));
            }
        }
        Ok(())
    }

    /// Clamp out-of-range values in place.
    pub fn validate(&mut self) {
        if self.pet.blink_duration >= self.pet.blink_interval {
            self.pet.blink_duration = self.pet.blink_interval / 2;
        }
        self.pet.position.x = self.pet.position.x.clamp(0.0, 100.0);
        self.pet.position.y = self.pet.position.y.clamp(0.0, 100.0);
        self.pet.opacity = self.pet.opacity.clamp(0.0, 1.0);
        self.advanced.sound_volume = self.advanced.sound_volume.clamp(0.0, 1.0);
        for state in self.states.values_mut() {
            state.trigger_chance = state.trigger_chance.clamp(0.0, 1.0);
        }
        self.growth.experience_to_next_level = self.growth.experience_to_next_level.max(1);
    }

    /// The theme currently in effect, if seasonal theming is on.
    pub fn active_theme(&self) -> Option<&SeasonalTheme> {
        if !self.seasonal.enabled {
            return None;
        }
        self.seasonal.themes.get(&self.seasonal.current_season)
    }

    /// The default image after any seasonal override.
    pub fn effective_default_image(&self) -> &str {
        match self.active_theme() {
            Some(theme) if !theme.default_image.is_empty() => &theme.default_image,
            _ => &self.pet.default_image,
        }
    }

    /// The bubble style after any seasonal override.
    pub fn effective_bubble_style(&self) -> &str {
        match self.active_theme() {
            Some(theme) if !theme.bubble_style.is_empty() => &theme.bubble_style,
            _ => &self.advanced.bubble_style,
        }
    }
}

/// Recursively merge `source` into `target`. Objects merge key by key,
/// everything else (arrays, scalars, the keyed collections in
/// [`REPLACED_MAPS`]) replaces.
fn deep_merge(target: &mut Value, source: Value, path: &str) {
    if REPLACED_MAPS.contains(&path) {
        *target = source;
        return;
    }
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                let child = format!("{path}/{key}");
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value, &child)
                    }
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}
