use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{bus::EventBus, room_handler::RoomEventHandler};

/// Manages a room's event subscription and routes events to a handler
pub struct RoomSubscription {
    room_id: String,
    handler: Arc<dyn RoomEventHandler>,
    event_bus: EventBus,
}

impl RoomSubscription {
    pub fn new(room_id: String, handler: Arc<dyn RoomEventHandler>, event_bus: EventBus) -> Self {
        Self {
            room_id,
            handler,
            event_bus,
        }
    }

    /// Start the subscription. The receiver is registered before this
    /// returns, so events emitted afterwards are not missed.
    pub async fn start(self) -> JoinHandle<()> {
        let room_id = self.room_id.clone();
        let handler_name = self.handler.handler_name();

        info!(
            room_id = %room_id,
            handler = handler_name,
            "Starting room subscription"
        );

        let mut receiver = self.event_bus.subscribe_to_room(&room_id).await;

        tokio::spawn(async move {
            loop {
                let event = match receiver.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            room_id = %room_id,
                            handler = handler_name,
                            skipped,
                            "Room subscription lagged, events skipped"
                        );
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                debug!(
                    room_id = %room_id,
                    handler = handler_name,
                    event = event.event_type(),
                    "Received room event"
                );

                if let Err(e) = self.handler.handle_room_event(&room_id, event).await {
                    warn!(
                        room_id = %room_id,
                        handler = handler_name,
                        error = %e,
                        "Room event handler failed"
                    );
                }
            }

            info!(
                room_id = %room_id,
                handler = handler_name,
                "Room subscription ended"
            );
        })
    }
}
