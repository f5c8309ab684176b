//! Effect stream for the stream pet.
//!
//! The engine never draws anything itself. Every visible or audible
//! reaction is emitted as an [`Effect`] on an unbounded channel, and a
//! renderer (browser bridge, terminal, test) consumes them. Effects are
//! fire-and-forget: a dropped receiver silently discards them.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::Position;
use crate::polls::PollResults;
use crate::viewer::Emotion;

/// Effects emitted by the pet.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A speech bubble became visible.
    MessageShown {
        /// The bubble text.
        text: String,
        /// The bubble style class.
        style: String,
    },

    /// The current speech bubble started its exit transition.
    MessageHidden,

    /// The pet image changed.
    ImageShown {
        /// The resolved image path.
        path: String,
        /// Cross-fade length.
        transition: Duration,
        /// Whether this is the generated stand-in for a missing asset.
        placeholder: bool,
    },

    /// A sound should play.
    SoundPlayed {
        /// The sound path.
        path: String,
        /// Volume in `[0, 1]`.
        volume: f64,
    },

    /// A particle burst around the pet.
    ParticlesSpawned {
        /// The particle set.
        kind: ParticleKind,
        /// How many particles.
        count: u32,
    },

    /// A movement animation started.
    AnimationStarted {
        /// The animation.
        animation: Animation,
    },

    /// The idle look-around gesture.
    LookAround,

    /// The pet moved between states.
    StateChanged {
        /// The state left.
        from: String,
        /// The state entered.
        to: String,
    },

    /// The pet reached a new level.
    LevelUp {
        /// The new level.
        level: u32,
    },

    /// The pet reached a new growth stage.
    Evolved {
        /// The stage name.
        stage: String,
    },

    /// A growth unlock.
    Unlocked {
        /// What kind of feature.
        feature: Feature,
        /// The unlocked name.
        name: String,
    },

    /// A weather overlay started.
    WeatherStarted {
        /// The weather kind.
        kind: String,
    },

    /// The weather overlay stopped.
    WeatherStopped,

    /// The configuration was reloaded and all timers restarted.
    ConfigReloaded,

    /// An emotion emoji above the pet.
    EmotionShown {
        emotion: Emotion,
        /// How long it stays up.
        duration: Duration,
    },

    /// A short banner above the pet, separate from the speech bubble.
    BannerShown { text: String, duration: Duration },

    /// Physics mode started.
    PhysicsEnabled { gravity: f64, bounce: f64 },

    /// Physics mode stopped and the pet came to rest.
    PhysicsDisabled,

    /// Physics tuning changed.
    PhysicsUpdated { gravity: f64, bounce: f64 },

    /// A push while physics is on.
    ForceApplied { x: f64, y: f64 },

    /// The pet started moving through points, in percent of the overlay.
    PathStarted {
        points: Vec<Position>,
        /// Time for the whole path.
        duration: Duration,
    },

    /// The pet stopped following a path.
    PathStopped,

    /// The pet went back to its configured position.
    PositionReset,

    /// One emote of an emote rain.
    EmoteDropped {
        url: String,
        /// Pixel size.
        size: u32,
        /// Time to fall across the overlay.
        fall: Duration,
        rotate: bool,
        bounce: bool,
    },

    /// A viewer poll opened.
    PollStarted {
        id: String,
        question: String,
        options: Vec<String>,
        duration: Duration,
    },

    /// A poll closed.
    PollEnded { id: String, results: PollResults },
}

/// Kinds of feature unlocked by leveling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Animation,
    Particles,
}

/// Movement animations the pet can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Animation {
    Bounce,
    Wiggle,
    Spin,
    Float,
    Shake,
    Sway,
    Jump,
    Hop,
    Pulse,
    SlideLeft,
    SlideRight,
}

impl Animation {
    /// All animations, in unlock order.
    pub const ALL: [Animation; 11] = [
        Animation::Bounce,
        Animation::Wiggle,
        Animation::Spin,
        Animation::Float,
        Animation::Shake,
        Animation::Sway,
        Animation::Jump,
        Animation::Hop,
        Animation::Pulse,
        Animation::SlideLeft,
        Animation::SlideRight,
    ];

    /// Look up an animation by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|animation| animation.name() == name)
    }

    /// The configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Animation::Bounce => "bounce",
            Animation::Wiggle => "wiggle",
            Animation::Spin => "spin",
            Animation::Float => "float",
            Animation::Shake => "shake",
            Animation::Sway => "sway",
            Animation::Jump => "jump",
            Animation::Hop => "hop",
            Animation::Pulse => "pulse",
            Animation::SlideLeft => "slide-left",
            Animation::SlideRight => "slide-right",
        }
    }

    /// How long the movement runs. Further movements are ignored meanwhile.
    pub fn duration(&self) -> Duration {
        let millis = match self {
            Animation::Bounce | Animation::Jump | Animation::Pulse => 600,
            Animation::Wiggle | Animation::Shake => 500,
            Animation::Spin => 800,
            Animation::Float | Animation::Sway => 2000,
            Animation::Hop => 400,
            Animation::SlideLeft | Animation::SlideRight => 1000,
        };
        Duration::from_millis(millis)
    }
}

/// Particle sets for bursts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    Hearts,
    Stars,
    Celebrate,
    Money,
    Fire,
    Ice,
    Food,
}

impl ParticleKind {
    /// All particle sets, in unlock order.
    pub const ALL: [ParticleKind; 7] = [
        ParticleKind::Hearts,
        ParticleKind::Stars,
        ParticleKind::Celebrate,
        ParticleKind::Money,
        ParticleKind::Fire,
        ParticleKind::Ice,
        ParticleKind::Food,
    ];

    /// Look up a particle set by name. Unknown names fall back to hearts.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .unwrap_or(ParticleKind::Hearts)
    }

    /// The configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            ParticleKind::Hearts => "hearts",
            ParticleKind::Stars => "stars",
            ParticleKind::Celebrate => "celebrate",
            ParticleKind::Money => "money",
            ParticleKind::Fire => "fire",
            ParticleKind::Ice => "ice",
            ParticleKind::Food => "food",
        }
    }

    /// The glyphs a renderer scatters for this set.
    pub fn glyphs(&self) -> &'static [&'static str] {
        match self {
            ParticleKind::Hearts => &["💖", "💕", "💗", "💓", "💝"],
            ParticleKind::Stars => &["⭐", "✨", "🌟", "💫", "⚡"],
            ParticleKind::Celebrate => &["🎉", "🎊", "🎈", "🎆", "✨"],
            ParticleKind::Money => &["💰", "💵", "💴", "💶", "💷"],
            ParticleKind::Fire => &["🔥", "💥", "✨", "⚡", "💫"],
            ParticleKind::Ice => &["❄️", "💎", "💠", "🔷", "✨"],
            ParticleKind::Food => &["🍪", "🍰", "🎂", "🍕", "🍔"],
        }
    }
}

/// Whether a configured animation/particle name asks for something.
/// Empty strings and `"none"` mean nothing.
pub fn is_set(name: &str) -> bool {
    !name.is_empty() && name != "none"
}

/// Sender for effects.
pub type EffectSender = mpsc::UnboundedSender<Effect>;

/// Receiver for effects.
pub type EffectReceiver = mpsc::UnboundedReceiver<Effect>;

/// Create a new effect channel.
pub fn channel() -> (EffectSender, EffectReceiver) {
    mpsc::unbounded_channel()
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feature::Animation => write!(f, "animation"),
            Feature::Particles => write!(f, "particles"),
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::MessageShown { text, style } => write!(f, "bubble [{}] {}", style, text),
            Effect::MessageHidden => write!(f, "bubble hidden"),
            Effect::ImageShown {
                path, placeholder, ..
            } => {
                if *placeholder {
                    write!(f, "image <placeholder>")
                } else {
                    write!(f, "image {}", path)
                }
            }
            Effect::SoundPlayed { path, volume } => write!(f, "sound {} @ {:.2}", path, volume),
            Effect::ParticlesSpawned { kind, count } => {
                write!(f, "particles {} x{} {}", kind.name(), count, kind.glyphs().join(""))
            }
            Effect::AnimationStarted { animation } => write!(f, "move {}", animation.name()),
            Effect::LookAround => write!(f, "look around"),
            Effect::StateChanged { from, to } => write!(f, "state {} -> {}", from, to),
            Effect::LevelUp { level } => write!(f, "level up! now level {}", level),
            Effect::Evolved { stage } => write!(f, "evolved into {}", stage),
            Effect::Unlocked { feature, name } => write!(f, "unlocked {} {}", feature, name),
            Effect::WeatherStarted { kind } => write!(f, "weather {}", kind),
            Effect::WeatherStopped => write!(f, "weather stopped"),
            Effect::ConfigReloaded => write!(f, "config reloaded"),
            Effect::EmotionShown { emotion, .. } => {
                write!(f, "emotion {} {}", emotion.name(), emotion.emoji())
            }
            Effect::BannerShown { text, .. } => write!(f, "banner {}", text),
            Effect::PhysicsEnabled { gravity, bounce } => {
                write!(f, "physics on (gravity {}, bounce {})", gravity, bounce)
            }
            Effect::PhysicsDisabled => write!(f, "physics off"),
            Effect::PhysicsUpdated { gravity, bounce } => {
                write!(f, "physics tuned (gravity {}, bounce {})", gravity, bounce)
            }
            Effect::ForceApplied { x, y } => write!(f, "force ({:.1}, {:.1})", x, y),
            Effect::PathStarted { points, duration } => write!(
                f,
                "path of {} points over {}ms",
                points.len(),
                duration.as_millis()
            ),
            Effect::PathStopped => write!(f, "path stopped"),
            Effect::PositionReset => write!(f, "position reset"),
            Effect::EmoteDropped { url, .. } => write!(f, "emote {}", url),
            Effect::PollStarted {
                question, options, ..
            } => write!(f, "poll {} [{}]", question, options.join(" / ")),
            Effect::PollEnded { results, .. } => write!(
                f,
                "poll {} won by {} ({} votes)",
                results.question, results.winner, results.total_votes
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_creation() {
        let (tx, mut rx) = channel();
        tx.send(Effect::MessageHidden).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Effect::MessageHidden);
    }

    #[test]
    fn test_animation_names_round_trip() {
        for animation in Animation::ALL {
            assert_eq!(Animation::from_name(animation.name()), Some(animation));
        }
        assert_eq!(Animation::from_name("moonwalk"), None);
        assert_eq!(Animation::Float.duration(), Duration::from_millis(2000));
    }

    #[test]
    fn test_particle_fallback() {
        assert_eq!(ParticleKind::from_name("ice"), ParticleKind::Ice);
        assert_eq!(ParticleKind::from_name("glitter"), ParticleKind::Hearts);
        assert_eq!(ParticleKind::Food.glyphs().len(), 5);
    }

    #[test]
    fn test_is_set() {
        assert!(is_set("bounce"));
        assert!(!is_set("none"));
        assert!(!is_set(""));
    }

    #[test]
    fn test_effect_display() {
        assert_eq!(
            Effect::StateChanged {
                from: "default".to_string(),
                to: "sad".to_string()
            }
            .to_string(),
            "state default -> sad"
        );
        assert_eq!(
            Effect::AnimationStarted {
                animation: Animation::SlideLeft
            }
            .to_string(),
            "move slide-left"
        );
        assert_eq!(Effect::LevelUp { level: 3 }.to_string(), "level up! now level 3");
        assert_eq!(
            Effect::EmotionShown {
                emotion: Emotion::Love,
                duration: Duration::from_secs(3)
            }
            .to_string(),
            "emotion love 😍"
        );
        assert_eq!(
            Effect::ForceApplied { x: 2.0, y: -0.5 }.to_string(),
            "force (2.0, -0.5)"
        );
        assert_eq!(
            Effect::PathStarted {
                points: vec![Position { x: 20.0, y: 20.0 }, Position { x: 80.0, y: 20.0 }],
                duration: Duration::from_millis(5000)
            }
            .to_string(),
            "path of 2 points over 5000ms"
        );
    }
}
