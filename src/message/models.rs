use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::websockets::MessagePayload;

/// A stored chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageModel {
    pub room: String,
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageModel {
    /// Creates a message stamped with the current server time
    pub fn new(room: String, sender: String, body: String) -> Self {
        Self {
            room,
            sender,
            body,
            timestamp: Utc::now(),
        }
    }

    /// Wire form; the room tag is included for live deliveries
    pub fn to_payload(&self, with_room: bool) -> MessagePayload {
        MessagePayload {
            sender: self.sender.clone(),
            body: self.body.clone(),
            timestamp: self.timestamp,
            room: with_room.then(|| self.room.clone()),
        }
    }
}
