use serde::{Deserialize, Serialize};

/// Query string of `GET /api/rooms/messages`
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub room: String,
}

/// Room information returned by `GET /rooms`
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RoomResponse {
    pub id: String,
    pub name: String,
    pub member_count: usize,
}
