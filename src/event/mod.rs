// Event-driven plumbing for the chat server
//
// Room events are published on a per-room broadcast channel and delivered
// to subscribers, which turn them into websocket frames.

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::RoomEvent;
pub use room_handler::{RoomEventError, RoomEventHandler};
pub use room_subscription::RoomSubscription;

// Internal modules
mod bus;
mod events;
mod room_handler;
mod room_subscription;
