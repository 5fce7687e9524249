pub use models::MessageModel;
pub use repository::{InMemoryMessageRepository, MessageRepository};

pub mod models;
pub mod repository;
