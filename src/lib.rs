// Library crate for the roomchat server and client
// This file exposes the public API for the binaries and integration tests

pub mod client;
pub mod config;
pub mod contacts;
pub mod event;
pub mod message;
pub mod room;
pub mod server;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use client::{
    ContactBook, HttpHistoryClient, RoomSession, SessionDriver, SessionUpdate, UiCommand,
    WebSocketChannel,
};
pub use config::{ClientConfig, ConfigError, ServerConfig};
pub use event::{EventBus, RoomEvent, RoomSubscription};
pub use room::RoomService;
pub use shared::{AppError, AppState};
pub use websockets::{
    ChannelReceiveHandler, ConnectionManager, EventName, MessageHandler, WebSocketRoomSubscriber,
    WireFrame,
};
