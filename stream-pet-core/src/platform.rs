//! Platform event notifications.
//!
//! Decoded EventSub notification bodies are mapped onto the pet's event
//! names and payload keys. Subscription bookkeeping and the socket itself
//! live outside this crate.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::template::Payload;

/// Name used when a notification carries no user (anonymous cheers).
const ANONYMOUS: &str = "Anonymous";

/// A notification body: the subscription it belongs to and its event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Notification {
    pub subscription: Subscription,
    #[serde(default)]
    pub event: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subscription {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Notification {
    /// The pet event name and payload this notification triggers, or `None`
    /// for subscription types the pet does not react to.
    pub fn into_trigger(self) -> Option<(String, Payload)> {
        let event = &self.event;
        let user = || text(event, "user_name");

        let (name, payload) = match self.subscription.kind.as_str() {
            "channel.follow" => ("follow", json!({ "username": user() })),
            "channel.subscribe" => ("subscribe", json!({ "username": user() })),
            "channel.subscription.gift" => (
                "giftSub",
                json!({
                    "gifter": user(),
                    "count": event.get("total").and_then(Value::as_u64).unwrap_or(1),
                }),
            ),
            "channel.cheer" => (
                "bits",
                json!({
                    "username": user(),
                    "amount": event.get("bits").and_then(Value::as_u64).unwrap_or(0),
                }),
            ),
            "channel.raid" => {
                let raider = text(event, "from_broadcaster_user_name");
                (
                    "raid",
                    json!({
                        "raider": raider,
                        "count": event.get("viewers").and_then(Value::as_u64).unwrap_or(0),
                        "username": raider,
                    }),
                )
            }
            "channel.channel_points_custom_reward_redemption.add" => (
                "channelPoints",
                json!({
                    "username": user(),
                    "reward": event
                        .pointer("/reward/title")
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                    "rewardId": event
                        .pointer("/reward/id")
                        .and_then(Value::as_str)
                        .unwrap_or_default(),
                }),
            ),
            other => {
                tracing::debug!(kind = other, "ignoring notification type");
                return None;
            }
        };

        let Value::Object(payload) = payload else {
            return None;
        };
        Some((name.to_string(), payload))
    }
}

fn text(event: &Value, key: &str) -> String {
    event
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(ANONYMOUS)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(kind: &str, event: Value) -> Notification {
        serde_json::from_value(json!({
            "subscription": { "type": kind, "version": "1" },
            "event": event,
        }))
        .unwrap()
    }

    #[test]
    fn test_follow() {
        let (name, payload) = notification("channel.follow", json!({ "user_name": "Ann" }))
            .into_trigger()
            .unwrap();
        assert_eq!(name, "follow");
        assert_eq!(payload["username"], "Ann");
    }

    #[test]
    fn test_cheer_and_gift() {
        let (name, payload) = notification(
            "channel.cheer",
            json!({ "user_name": "Bo", "bits": 250 }),
        )
        .into_trigger()
        .unwrap();
        assert_eq!(name, "bits");
        assert_eq!(payload["amount"], 250);

        let (name, payload) = notification("channel.subscription.gift", json!({ "user_name": "Cy" }))
            .into_trigger()
            .unwrap();
        assert_eq!(name, "giftSub");
        assert_eq!(payload["gifter"], "Cy");
        assert_eq!(payload["count"], 1);
    }

    #[test]
    fn test_raid_and_redemption() {
        let (name, payload) = notification(
            "channel.raid",
            json!({ "from_broadcaster_user_name": "Dee", "viewers": 42 }),
        )
        .into_trigger()
        .unwrap();
        assert_eq!(name, "raid");
        assert_eq!(payload["raider"], "Dee");
        assert_eq!(payload["username"], "Dee");
        assert_eq!(payload["count"], 42);

        let (name, payload) = notification(
            "channel.channel_points_custom_reward_redemption.add",
            json!({ "user_name": "Eve", "reward": { "id": "1", "title": "Hydrate" } }),
        )
        .into_trigger()
        .unwrap();
        assert_eq!(name, "channelPoints");
        assert_eq!(payload["reward"], "Hydrate");
        assert_eq!(payload["rewardId"], "1");
    }

    #[test]
    fn test_anonymous_and_unknown() {
        let (_, payload) = notification("channel.cheer", json!({ "bits": 100 }))
            .into_trigger()
            .unwrap();
        assert_eq!(payload["username"], "Anonymous");

        assert!(notification("stream.online", json!({})).into_trigger().is_none());
    }
}
