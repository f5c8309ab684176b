//! First-time chatter greetings.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::GreetingSettings;

/// Used when no greeting messages are configured.
pub const FALLBACK_GREETING: &str = "Welcome {user}! 💜";

/// Who has been greeted since the pet started.
#[derive(Debug, Default)]
pub struct GreetingSession {
    greeted: BTreeSet<String>,
    sent: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GreetingStats {
    pub sent: u64,
    pub unique_chatters: usize,
    pub greeted_users: Vec<String>,
}

impl GreetingSession {
    /// Mark `user` as greeted. Returns whether this is their first message
    /// this session.
    pub fn first_time(&mut self, user: &str) -> bool {
        self.greeted.insert(user.to_lowercase())
    }

    pub fn count_sent(&mut self) {
        self.sent += 1;
    }

    pub fn stats(&self) -> GreetingStats {
        GreetingStats {
            sent: self.sent,
            unique_chatters: self.greeted.len(),
            greeted_users: self.greeted.iter().cloned().collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl GreetingSettings {
    /// The greeting template for `username`: their custom greeting, else a
    /// configured message chosen by `pick` (given the message count), else
    /// [`FALLBACK_GREETING`].
    pub fn template_for(&self, username: &str, pick: impl FnOnce(usize) -> usize) -> &str {
        if let Some(custom) = self.custom_greetings.get(&username.to_lowercase()) {
            return custom;
        }
        if self.messages.is_empty() {
            return FALLBACK_GREETING;
        }
        let index = pick(self.messages.len()).min(self.messages.len() - 1);
        &self.messages[index]
    }
}
