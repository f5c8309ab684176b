//! `{key}` placeholder substitution for reaction messages.

use serde_json::{Map, Value};

/// Data carried by an event, command or test trigger.
pub type Payload = Map<String, Value>;

/// Replace every `{key}` in `text` with the payload's value for `key`.
///
/// Placeholders with no matching payload key are left as written.
pub fn replace_variables(text: &str, payload: &Payload) -> String {
    let mut result = text.to_string();
    for (key, value) in payload {
        let placeholder = format!("{{{key}}}");
        if result.contains(&placeholder) {
            result = result.replace(&placeholder, &display_value(value));
        }
    }
    result
}

/// Build a payload holding only a username.
pub fn username_payload(username: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert("username".to_string(), Value::String(username.to_string()));
    payload
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}
