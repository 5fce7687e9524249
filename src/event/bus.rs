use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::RoomEvent;

const DEFAULT_ROOM_CAPACITY: usize = 100;

/// Event bus for distributing room events throughout the server
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Room-specific event channels: room_id -> sender
    room_channels: Arc<RwLock<HashMap<String, broadcast::Sender<RoomEvent>>>>,
    room_capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ROOM_CAPACITY)
    }

    /// Creates a bus whose per-room channels buffer `room_capacity` events
    pub fn with_capacity(room_capacity: usize) -> Self {
        Self {
            room_channels: Arc::new(RwLock::new(HashMap::new())),
            room_capacity,
        }
    }

    /// Emits an event to all subscribers of a specific room
    pub async fn emit_to_room(&self, room_id: &str, event: RoomEvent) {
        let room_channels = self.room_channels.read().await;

        match room_channels.get(room_id) {
            Some(sender) => match sender.send(event) {
                Ok(receiver_count) => {
                    debug!(
                        room_id = %room_id,
                        receivers = receiver_count,
                        "Room event emitted"
                    );
                }
                Err(_) => {
                    debug!(room_id = %room_id, "Room event emitted with no receivers");
                }
            },
            None => {
                debug!(room_id = %room_id, "No room channel found, event dropped");
            }
        }
    }

    /// Subscribe to events for a specific room
    pub async fn subscribe_to_room(&self, room_id: &str) -> broadcast::Receiver<RoomEvent> {
        let mut room_channels = self.room_channels.write().await;

        room_channels
            .entry(room_id.to_string())
            .or_insert_with(|| {
                debug!(room_id = %room_id, "Creating new room channel for subscription");
                broadcast::channel(self.room_capacity).0
            })
            .subscribe()
    }

    /// Drops a room's channel; its subscriptions end once drained
    pub async fn close_room(&self, room_id: &str) {
        if self.room_channels.write().await.remove(room_id).is_some() {
            debug!(room_id = %room_id, "Room channel closed");
        }
    }
}
