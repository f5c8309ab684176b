//! Stream pet core library
//!
//! This crate provides the reaction engine behind an animated stream
//! overlay pet: the state machine, event and chat-command triggers, the
//! speech bubble queue, random state scheduling, growth, seasonal themes,
//! viewer interaction and configuration persistence. Rendering is left to
//! whoever consumes the [`Effect`] stream.

pub mod analytics;
pub mod bus;
pub mod chat;
pub mod config;
pub mod effect;
pub mod emotes;
pub mod error;
pub mod greetings;
pub mod growth;
pub mod images;
pub mod options;
pub mod pet;
pub mod physics;
pub mod platform;
pub mod polls;
pub mod queue;
pub mod scheduler;
pub mod seasonal;
pub mod storage;
pub mod template;
pub mod viewer;

pub use bus::{ControlMessage, MessageBus};
pub use chat::{Chatter, Role};
pub use config::{PetConfig, DEFAULT_STATE};
pub use effect::{Animation, Effect, EffectReceiver, Feature, ParticleKind};
pub use error::{Error, Result};
pub use greetings::GreetingStats;
pub use growth::GrowthReport;
pub use images::{AnyAsset, AssetDir, AssetLookup};
pub use options::Options;
pub use pet::StreamPet;
pub use physics::Physics;
pub use platform::Notification;
pub use polls::PollResults;
pub use storage::{ConfigStore, FileStorage, MemoryStorage, Storage};
pub use template::Payload;
pub use viewer::{Emotion, RedemptionStats, ViewerCommand};
