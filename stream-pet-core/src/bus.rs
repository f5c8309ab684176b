//! Control messages from the companion configuration window.
//!
//! Raw messages arrive as JSON objects with a `type` tag. [`MessageBus`]
//! checks the sender's origin against an allow-list, rejects unknown tags
//! and malformed bodies, and hands back a typed [`ControlMessage`].

use serde::Deserialize;
use serde_json::Value;

use crate::config::Position;
use crate::error::{Error, Result};
use crate::template::Payload;

/// Every `type` tag the bus accepts.
pub const MESSAGE_TYPES: &[&str] = &[
    "testEvent",
    "testState",
    "testCommand",
    "testCustomCommand",
    "testParticles",
    "resetGrowth",
    "testLevelUp",
    "showMessage",
    "startWeather",
    "stopWeather",
    "forceConfigUpdate",
    "togglePhysics",
    "applyForce",
    "updatePhysicsSettings",
    "followPath",
    "testPath",
    "stopPath",
    "resetPosition",
    "testEvolutionEffect",
    "testEmoteRain",
];

/// A validated control message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    /// Fire an event as if the platform had sent it.
    #[serde(rename_all = "camelCase")]
    TestEvent {
        event_name: String,
        #[serde(default)]
        event_data: Payload,
    },

    /// Enter a state for a short while.
    #[serde(rename_all = "camelCase")]
    TestState { state_name: String },

    /// Use a state's recovery command.
    #[serde(rename_all = "camelCase")]
    TestCommand {
        state_name: String,
        #[serde(default)]
        username: Option<String>,
    },

    /// Run a chat command as a privileged tester.
    #[serde(rename_all = "camelCase")]
    TestCustomCommand {
        command_name: String,
        #[serde(default)]
        username: Option<String>,
    },

    /// Spawn a celebration burst.
    TestParticles {
        #[serde(default)]
        settings: ParticleTest,
    },

    /// Reset leveling progress.
    ResetGrowth,

    /// Play the level-up celebration without changing progress.
    TestLevelUp,

    /// Show a message bubble.
    ShowMessage {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        duration: Option<u64>,
    },

    /// Start a weather overlay.
    #[serde(rename_all = "camelCase")]
    StartWeather {
        #[serde(default)]
        weather_type: Option<String>,
    },

    /// Stop the weather overlay.
    StopWeather,

    /// Replace the stored configuration and reload.
    ForceConfigUpdate { config: Value },

    /// Turn physics mode on or off.
    TogglePhysics,

    /// Push the pet while physics is on. Missing components are random.
    ApplyForce {
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
    },

    /// Change gravity and bounce.
    UpdatePhysicsSettings {
        #[serde(default)]
        gravity: Option<f64>,
        #[serde(default)]
        bounce: Option<f64>,
    },

    /// Move through points given in percent of the overlay.
    FollowPath {
        points: Vec<Position>,
        /// Milliseconds for the whole path.
        #[serde(default)]
        duration: Option<u64>,
    },

    /// Run the built-in square path.
    TestPath,

    StopPath,

    /// Return the pet to its configured position.
    ResetPosition,

    /// Play the evolution celebration without changing progress.
    #[serde(rename_all = "camelCase")]
    TestEvolutionEffect {
        #[serde(default)]
        stage_name: Option<String>,
    },

    /// Rain the given emote ids, ignoring cooldowns and permissions.
    TestEmoteRain {
        #[serde(default)]
        emotes: Vec<String>,
    },
}

/// Settings for a particle test burst.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ParticleTest {
    #[serde(default)]
    pub count: Option<u32>,
}

impl ControlMessage {
    /// The wire `type` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::TestEvent { .. } => "testEvent",
            ControlMessage::TestState { .. } => "testState",
            ControlMessage::TestCommand { .. } => "testCommand",
            ControlMessage::TestCustomCommand { .. } => "testCustomCommand",
            ControlMessage::TestParticles { .. } => "testParticles",
            ControlMessage::ResetGrowth => "resetGrowth",
            ControlMessage::TestLevelUp => "testLevelUp",
            ControlMessage::ShowMessage { .. } => "showMessage",
            ControlMessage::StartWeather { .. } => "startWeather",
            ControlMessage::StopWeather => "stopWeather",
            ControlMessage::ForceConfigUpdate { .. } => "forceConfigUpdate",
            ControlMessage::TogglePhysics => "togglePhysics",
            ControlMessage::ApplyForce { .. } => "applyForce",
            ControlMessage::UpdatePhysicsSettings { .. } => "updatePhysicsSettings",
            ControlMessage::FollowPath { .. } => "followPath",
            ControlMessage::TestPath => "testPath",
            ControlMessage::StopPath => "stopPath",
            ControlMessage::ResetPosition => "resetPosition",
            ControlMessage::TestEvolutionEffect { .. } => "testEvolutionEffect",
            ControlMessage::TestEmoteRain { .. } => "testEmoteRain",
        }
    }

    fn check(&self) -> Result<()> {
        let required = match self {
            ControlMessage::TestEvent { event_name, .. } => Some(("eventName", event_name)),
            ControlMessage::TestState { state_name } => Some(("stateName", state_name)),
            ControlMessage::TestCommand { state_name, .. } => Some(("stateName", state_name)),
            ControlMessage::TestCustomCommand { command_name, .. } => {
                Some(("commandName", command_name))
            }
            _ => None,
        };
        if let Some((field, value)) = required {
            if value.trim().is_empty() {
                return Err(Error::invalid_message(format!("{field} must not be empty")));
            }
        }
        match self {
            ControlMessage::ForceConfigUpdate { config } if !config.is_object() => {
                Err(Error::invalid_message("config must be a JSON object"))
            }
            ControlMessage::FollowPath { points, .. } if points.is_empty() => {
                Err(Error::invalid_message("points must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

/// Boundary for control messages.
#[derive(Debug, Clone)]
pub struct MessageBus {
    allowed_origins: Vec<String>,
}

impl MessageBus {
    /// A bus accepting the given origins. `"*"` accepts any origin.
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }

    /// Whether messages from `origin` are accepted.
    pub fn allows(&self, origin: &str) -> bool {
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }

    /// Parse and validate raw JSON text from `origin`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UntrustedOrigin`, `Error::UnknownMessage` or
    /// `Error::InvalidMessage`.
    pub fn accept(&self, origin: &str, raw: &str) -> Result<ControlMessage> {
        if !self.allows(origin) {
            return Err(Error::UntrustedOrigin {
                origin: origin.to_string(),
            });
        }
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::invalid_message(format!("not valid JSON: {e}")))?;
        self.accept_value(value)
    }

    /// Validate an already-parsed message. The origin check is the caller's.
    pub fn accept_value(&self, value: Value) -> Result<ControlMessage> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid_message("missing 'type' tag"))?;
        if !MESSAGE_TYPES.contains(&kind) {
            return Err(Error::UnknownMessage {
                kind: kind.to_string(),
            });
        }

        let message: ControlMessage = serde_json::from_value(value)
            .map_err(|e| Error::invalid_message(e.to_string()))?;
        message.check()?;
        Ok(message)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(vec!["*".to_string()])
    }
}
