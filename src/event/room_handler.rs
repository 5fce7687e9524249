use async_trait::async_trait;
use thiserror::Error;

use super::events::RoomEvent;

#[derive(Debug, Error)]
pub enum RoomEventError {
    /// Membership of the room could not be read
    #[error("Could not look up members of room {room_id}: {reason}")]
    MembershipLookup { room_id: String, reason: String },

    #[error("Could not encode frame for room {room_id}: {reason}")]
    Encoding { room_id: String, reason: String },
}

/// Reacts to events published on a room's bus channel.
///
/// A [`RoomSubscription`](super::RoomSubscription) owns one handler and
/// feeds it the room's events in order.
#[async_trait]
pub trait RoomEventHandler: Send + Sync {
    async fn handle_room_event(&self, room_id: &str, event: RoomEvent)
        -> Result<(), RoomEventError>;

    /// Name used in subscription logs
    fn handler_name(&self) -> &'static str;
}
