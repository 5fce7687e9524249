use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events that occur within a single chat room.
///
/// Events represent facts that already happened. Subscribers turn them
/// into deliveries to the room's connections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RoomEvent {
    /// A user joined the room
    MemberJoined { user: String },

    /// A user asked to leave the room
    MemberLeft { user: String },

    /// A user's connection dropped while in the room
    MemberDisconnected { user: String },

    /// A message was accepted and stored
    ChatMessage {
        sender: String,
        body: String,
        timestamp: DateTime<Utc>,
    },
}

impl RoomEvent {
    /// Get a human-readable description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::MemberJoined { .. } => "member_joined",
            RoomEvent::MemberLeft { .. } => "member_left",
            RoomEvent::MemberDisconnected { .. } => "member_disconnected",
            RoomEvent::ChatMessage { .. } => "chat_message",
        }
    }
}
