use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter};

/// Named events carried over the realtime channel
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventName {
    // Client -> Server
    Join,
    LeaveRoom,
    SendMessage,

    // Server -> Client
    Message,
    MessageHistory,
    Joined,
}

/// A single text frame on the channel: `{"event": ..., "data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFrame {
    pub event: EventName,
    #[serde(default)]
    pub data: Value,
}

/// Client-to-Server payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinPayload {
    pub user: String,
    pub room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaveRoomPayload {
    pub room: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendMessagePayload {
    pub user: String,
    pub room: String,
    pub text: String,
}

/// Server-to-Client payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagePayload {
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageHistoryPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub messages: Vec<MessagePayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// Helper functions for creating frames
impl WireFrame {
    pub fn new(event: EventName, data: Value) -> Self {
        Self { event, data }
    }

    fn with_payload<T: Serialize>(event: EventName, payload: T) -> Self {
        Self::new(event, serde_json::to_value(payload).unwrap_or_default())
    }

    /// Create a `join` request
    pub fn join(user: String, room: String) -> Self {
        Self::with_payload(EventName::Join, JoinPayload { user, room })
    }

    /// Create a `leave_room` notification
    pub fn leave_room(room: String) -> Self {
        Self::with_payload(EventName::LeaveRoom, LeaveRoomPayload { room })
    }

    /// Create a `send_message` request
    pub fn send_message(user: String, room: String, text: String) -> Self {
        Self::with_payload(EventName::SendMessage, SendMessagePayload { user, room, text })
    }

    /// Create a structured `message` delivery
    pub fn message(payload: MessagePayload) -> Self {
        Self::with_payload(EventName::Message, payload)
    }

    /// Create a plain-text `message`, used for system notifications
    pub fn system(text: String) -> Self {
        Self::new(EventName::Message, Value::String(text))
    }

    /// Create a `message_history` snapshot
    pub fn message_history(room: Option<String>, messages: Vec<MessagePayload>) -> Self {
        Self::with_payload(
            EventName::MessageHistory,
            MessageHistoryPayload { room, messages },
        )
    }

    /// Create a `joined` acknowledgement
    pub fn joined(room: Option<String>) -> Self {
        Self::with_payload(EventName::Joined, JoinedPayload { room })
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decode the frame's data into a typed payload
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}
