use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::{
    event::{RoomEvent, RoomEventError, RoomEventHandler},
    room::repository::RoomRepository,
    websockets::{
        connection_manager::ConnectionManager,
        messages::{MessagePayload, WireFrame},
    },
};

/// Delivers room events to the websocket connections of the room's members
pub struct WebSocketRoomSubscriber {
    rooms: Arc<dyn RoomRepository + Send + Sync>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl WebSocketRoomSubscriber {
    pub fn new(
        rooms: Arc<dyn RoomRepository + Send + Sync>,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            rooms,
            connection_manager,
        }
    }

    fn frame_for(room_id: &str, event: RoomEvent) -> WireFrame {
        match event {
            RoomEvent::MemberJoined { user } => {
                WireFrame::system(format!("{user} has joined room {room_id}"))
            }
            RoomEvent::MemberLeft { user } => {
                WireFrame::system(format!("{user} has left room {room_id}"))
            }
            RoomEvent::MemberDisconnected { user } => {
                WireFrame::system(format!("{user} has left the room."))
            }
            RoomEvent::ChatMessage {
                sender,
                body,
                timestamp,
            } => WireFrame::message(MessagePayload {
                sender,
                body,
                timestamp,
                room: Some(room_id.to_string()),
            }),
        }
    }
}

#[async_trait]
impl RoomEventHandler for WebSocketRoomSubscriber {
    async fn handle_room_event(
        &self,
        room_id: &str,
        event: RoomEvent,
    ) -> Result<(), RoomEventError> {
        let room = self
            .rooms
            .get_room(room_id)
            .await
            .map_err(|e| RoomEventError::MembershipLookup {
                room_id: room_id.to_string(),
                reason: e.to_string(),
            })?;

        let Some(room) = room else {
            debug!(room_id = %room_id, "Room was deleted, nobody to notify");
            return Ok(());
        };

        let event_type = event.event_type();
        let text = Self::frame_for(room_id, event)
            .to_text()
            .map_err(|e| RoomEventError::Encoding {
                room_id: room_id.to_string(),
                reason: e.to_string(),
            })?;

        self.connection_manager
            .send_to_connections(&room.connection_ids(), &text)
            .await;

        debug!(
            room_id = %room_id,
            event = event_type,
            recipients = room.member_count(),
            "Room event delivered"
        );
        Ok(())
    }

    fn handler_name(&self) -> &'static str {
        "WebSocketRoomSubscriber"
    }
}
