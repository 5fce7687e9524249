use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::errors::ChannelError;
use super::models::Message;
use crate::websockets::{EventName, WireFrame};

/// Bidirectional event transport consumed by the session.
///
/// Outbound events go through `emit`; inbound events arrive as
/// [`ChannelEvent`]s on a stream handed out when the channel is created.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Emit a named event. No acknowledgement is awaited.
    async fn emit(&self, frame: WireFrame) -> Result<(), ChannelError>;
}

/// What the channel delivers to the session
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    /// The link dropped and a new connection attempt is under way
    Reconnecting,
    Server(ServerEvent),
}

/// Inbound events after payload normalization
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A single message delivery
    Message {
        message: Message,
        room: Option<String>,
    },
    /// Bulk replay of a room's log
    History {
        room: Option<String>,
        messages: Vec<Message>,
    },
    /// Join acknowledgement
    Joined { room: Option<String> },
}

impl ServerEvent {
    /// Converts a frame into an inbound event. Client-to-server event names
    /// yield `None`.
    pub fn from_frame(frame: &WireFrame, received_at: DateTime<Utc>) -> Option<Self> {
        match frame.event {
            EventName::Message => {
                let (message, room) = Message::normalize(&frame.data, received_at);
                Some(ServerEvent::Message { message, room })
            }
            EventName::MessageHistory => {
                let (room, records) = match &frame.data {
                    Value::Array(records) => (None, records.as_slice()),
                    Value::Object(fields) => (
                        fields.get("room").and_then(Value::as_str).map(str::to_string),
                        fields
                            .get("messages")
                            .and_then(Value::as_array)
                            .map(Vec::as_slice)
                            .unwrap_or_default(),
                    ),
                    _ => (None, &[][..]),
                };
                let messages = records
                    .iter()
                    .map(|record| Message::normalize(record, received_at).0)
                    .collect();
                Some(ServerEvent::History { room, messages })
            }
            EventName::Joined => {
                let room = frame
                    .data
                    .get("room")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some(ServerEvent::Joined { room })
            }
            EventName::Join | EventName::LeaveRoom | EventName::SendMessage => {
                debug!(event = %frame.event, "Ignoring client-side event received from server");
                None
            }
        }
    }

    /// Parses a text frame straight into an inbound event
    pub fn decode(text: &str) -> Result<Option<Self>, serde_json::Error> {
        let frame = WireFrame::parse(text)?;
        Ok(Self::from_frame(&frame, Utc::now()))
    }
}
