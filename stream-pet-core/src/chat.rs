//! Chat roles, permission checks and command matching.

use serde::{Deserialize, Serialize};

/// The minimum chat role a command or recovery command requires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Subscriber,
    Vip,
    Moderator,
    Broadcaster,
    /// Anyone in chat. Unrecognised role names land here too.
    #[default]
    #[serde(other)]
    Everyone,
}

impl Role {
    /// Parse a role name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "everyone" => Some(Role::Everyone),
            "subscriber" => Some(Role::Subscriber),
            "vip" => Some(Role::Vip),
            "moderator" => Some(Role::Moderator),
            "broadcaster" => Some(Role::Broadcaster),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Everyone => "everyone",
            Role::Subscriber => "subscriber",
            Role::Vip => "vip",
            Role::Moderator => "moderator",
            Role::Broadcaster => "broadcaster",
        };
        f.write_str(name)
    }
}

/// Someone speaking in chat, with the badges their message carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chatter {
    pub username: String,
    pub broadcaster: bool,
    pub moderator: bool,
    pub vip: bool,
    pub subscriber: bool,
    /// Ids of the emotes the message carried.
    pub emotes: Vec<String>,
}

impl Chatter {
    /// A chatter without any badges.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// A chatter carrying the badge for `role`.
    pub fn with_role(username: impl Into<String>, role: Role) -> Self {
        let mut chatter = Self::new(username);
        match role {
            Role::Everyone => {}
            Role::Subscriber => chatter.subscriber = true,
            Role::Vip => chatter.vip = true,
            Role::Moderator => chatter.moderator = true,
            Role::Broadcaster => chatter.broadcaster = true,
        }
        chatter
    }

    /// The stand-in chatter used when the configuration page tests a command.
    pub fn tester(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            broadcaster: false,
            moderator: true,
            vip: true,
            subscriber: true,
            emotes: Vec::new(),
        }
    }

    /// The same chatter, with the emote ids their message carried.
    pub fn with_emotes<I, S>(mut self, emotes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emotes = emotes.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this chatter may use something gated on `role`.
    ///
    /// The broadcaster satisfies every role. Moderators satisfy VIP and
    /// subscriber gates; VIPs do not count as subscribers.
    pub fn satisfies(&self, role: Role) -> bool {
        match role {
            Role::Everyone => true,
            Role::Subscriber => self.subscriber || self.moderator || self.broadcaster,
            Role::Vip => self.vip || self.moderator || self.broadcaster,
            Role::Moderator => self.moderator || self.broadcaster,
            Role::Broadcaster => self.broadcaster,
        }
    }
}

/// Normalise a chat line for matching.
pub fn normalize(message: &str) -> String {
    message.trim().to_lowercase()
}

/// Whether a normalised chat line invokes `command`: an exact match, or the
/// command followed by a space and arguments.
pub fn invokes(normalized: &str, command: &str) -> bool {
    let command = command.to_lowercase();
    if command.is_empty() {
        return false;
    }
    normalized == command
        || normalized
            .strip_prefix(command.as_str())
            .is_some_and(|rest| rest.starts_with(' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        let viewer = Chatter::new("viewer");
        assert!(viewer.satisfies(Role::Everyone));
        assert!(!viewer.satisfies(Role::Subscriber));

        let vip = Chatter::with_role("vip", Role::Vip);
        assert!(vip.satisfies(Role::Vip));
        assert!(!vip.satisfies(Role::Subscriber));
        assert!(!vip.satisfies(Role::Moderator));

        let moderator = Chatter::with_role("mod", Role::Moderator);
        assert!(moderator.satisfies(Role::Subscriber));
        assert!(moderator.satisfies(Role::Vip));
        assert!(!moderator.satisfies(Role::Broadcaster));

        let owner = Chatter::with_role("owner", Role::Broadcaster);
        for role in [
            Role::Everyone,
            Role::Subscriber,
            Role::Vip,
            Role::Moderator,
            Role::Broadcaster,
        ] {
            assert!(owner.satisfies(role), "broadcaster should satisfy {role}");
        }
    }

    #[test]
    fn test_invokes_exact_and_prefix() {
        assert!(invokes("!pet", "!pet"));
        assert!(invokes("!pet please", "!pet"));
        assert!(invokes("!pet", "!PET"));
        assert!(!invokes("!petting", "!pet"));
        assert!(!invokes("say !pet", "!pet"));
        assert!(!invokes("!pet", ""));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  !Treat  "), "!treat");
    }

    #[test]
    fn test_role_wire_names() {
        let role: Role = serde_json::from_str(r#""moderator""#).unwrap();
        assert_eq!(role, Role::Moderator);
        let role: Role = serde_json::from_str(r#""founder""#).unwrap();
        assert_eq!(role, Role::Everyone);
        assert_eq!(serde_json::to_string(&Role::Everyone).unwrap(), r#""everyone""#);
        assert_eq!(Role::default(), Role::Everyone);
    }

    #[test]
    fn test_role_from_name() {
        assert_eq!(Role::from_name("VIP"), Some(Role::Vip));
        assert_eq!(Role::from_name("founder"), None);
        assert_eq!(Role::Moderator.to_string(), "moderator");
    }
}
