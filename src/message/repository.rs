use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use super::models::MessageModel;
use crate::shared::AppError;

/// Trait for message storage
#[async_trait]
pub trait MessageRepository {
    /// Appends a message to its room's log
    async fn append(&self, message: &MessageModel) -> Result<(), AppError>;

    /// The `limit` most recent messages of a room, oldest first
    async fn recent(&self, room_id: &str, limit: usize) -> Result<Vec<MessageModel>, AppError>;
}

/// In-memory implementation of MessageRepository
pub struct InMemoryMessageRepository {
    rooms: Mutex<HashMap<String, Vec<MessageModel>>>,
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn rooms(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<MessageModel>>>, AppError> {
        self.rooms.lock().map_err(|_| AppError::Internal)
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    #[instrument(skip(self, message), fields(room_id = %message.room))]
    async fn append(&self, message: &MessageModel) -> Result<(), AppError> {
        let mut rooms = self.rooms()?;
        let log = rooms.entry(message.room.clone()).or_default();
        log.push(message.clone());
        debug!(count = log.len(), "Message stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, room_id: &str, limit: usize) -> Result<Vec<MessageModel>, AppError> {
        let rooms = self.rooms()?;
        let messages = rooms
            .get(room_id)
            .map(|log| log[log.len().saturating_sub(limit)..].to_vec())
            .unwrap_or_default();
        debug!(count = messages.len(), "Messages fetched");
        Ok(messages)
    }
}
