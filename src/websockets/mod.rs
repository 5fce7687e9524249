// Public API
pub use connection_manager::{ConnectionManager, InMemoryConnectionManager};
pub use handler::{websocket_handler, ChannelReceiveHandler};
pub use messages::{
    EventName, JoinPayload, JoinedPayload, LeaveRoomPayload, MessageHistoryPayload,
    MessagePayload, SendMessagePayload, WireFrame,
};
pub use socket::{Connection, MessageHandler, SocketError, SocketWrapper};
pub use websocket_room_subscriber::WebSocketRoomSubscriber;

// Internal modules
mod connection_manager;
mod handler;
mod messages;
mod socket;
mod websocket_room_subscriber;
