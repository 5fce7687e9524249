use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sender name used for plain-text notifications from the server
pub const SYSTEM_SENDER: &str = "System";
/// Sender name used when a payload carries no sender
pub const UNKNOWN_SENDER: &str = "Unknown";

/// A named channel of message delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
}

impl Room {
    /// Room whose display name is its identifier
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }
}

/// A chat message as shown in the log. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: impl Into<String>, body: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            timestamp,
        }
    }

    /// Best-effort conversion of any payload shape into a message.
    ///
    /// Returns the message and the room it was tagged with, if any. A plain
    /// string becomes a system message; missing fields fall back to
    /// defaults and `received_at`.
    pub fn normalize(value: &Value, received_at: DateTime<Utc>) -> (Message, Option<String>) {
        match value {
            Value::String(text) => (Message::new(SYSTEM_SENDER, text.clone(), received_at), None),
            Value::Object(fields) => {
                let text_field = |keys: &[&str]| {
                    keys.iter()
                        .find_map(|k| fields.get(*k).and_then(Value::as_str))
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                };

                let sender = text_field(&["sender", "username", "user"])
                    .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
                let body = text_field(&["body", "message", "content", "text"]).unwrap_or_default();
                let timestamp = fields
                    .get("timestamp")
                    .and_then(Value::as_str)
                    .and_then(parse_timestamp)
                    .unwrap_or(received_at);
                let room = text_field(&["room"]);

                (Message::new(sender, body, timestamp), room)
            }
            Value::Null => (Message::new(UNKNOWN_SENDER, "", received_at), None),
            other => (Message::new(UNKNOWN_SENDER, other.to_string(), received_at), None),
        }
    }
}

/// Parses RFC 3339 timestamps, and naive ISO-8601 ones as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// State of the realtime channel as seen by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Whether the server has confirmed membership of the current room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Pending,
    Confirmed,
}

/// What the message log currently represents
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogStatus {
    #[default]
    Empty,
    Loading,
    Ready,
    Failed(String),
}

impl LogStatus {
    pub const PLACEHOLDER: &'static str = "Error loading messages";

    /// Text shown in place of the log, if any
    pub fn placeholder(&self) -> Option<&'static str> {
        match self {
            LogStatus::Failed(_) => Some(Self::PLACEHOLDER),
            _ => None,
        }
    }
}
