// Public API - what other modules can use
pub use handlers::{list_rooms, room_messages};
pub use service::RoomService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;
