//! Emote rain: chat emotes falling across the overlay.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::chat::Chatter;
use crate::config::EmoteRainSettings;

/// Delay between consecutive emotes of one rain.
pub const EMOTE_STAGGER: Duration = Duration::from_millis(100);

/// The CDN image for an emote id.
pub fn emote_url(id: &str) -> String {
    format!("https://static-cdn.jtvnw.net/emoticons/v2/{id}/default/dark/3.0")
}

/// Global and per-viewer emote rain cooldowns.
#[derive(Debug, Default)]
pub struct RainCooldowns {
    last: Option<Instant>,
    users: HashMap<String, Instant>,
}

impl RainCooldowns {
    /// The emote URLs `chatter`'s message rains down, if any.
    ///
    /// Nothing rains while rain is off, while either cooldown runs, or for
    /// chatters below the configured audience. Cooldowns only restart when
    /// the message actually carried emotes.
    pub fn rain_for(
        &mut self,
        settings: &EmoteRainSettings,
        chatter: &Chatter,
        now: Instant,
    ) -> Vec<String> {
        if !settings.enabled {
            return Vec::new();
        }
        if self
            .last
            .is_some_and(|last| now.duration_since(last) < Duration::from_secs(settings.global_cooldown))
        {
            return Vec::new();
        }
        let user = chatter.username.to_lowercase();
        if self
            .users
            .get(&user)
            .is_some_and(|last| now.duration_since(*last) < Duration::from_secs(settings.user_cooldown))
        {
            return Vec::new();
        }
        if !chatter.satisfies(settings.user_level.role()) {
            return Vec::new();
        }

        let mut ids: Vec<&str> = Vec::new();
        for id in &chatter.emotes {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Vec::new();
        }

        self.last = Some(now);
        self.users.insert(user, now);
        ids.into_iter()
            .take(settings.max_emotes)
            .map(emote_url)
            .collect()
    }
}
