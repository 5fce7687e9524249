use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use super::{
    models::RoomMember,
    repository::{JoinRoomResult, LeaveRoomResult, RoomRepository},
    types::RoomResponse,
};
use crate::{
    event::{EventBus, RoomEvent, RoomEventHandler, RoomSubscription},
    message::{MessageModel, MessageRepository},
    shared::AppError,
};

type Subscriptions = HashMap<String, JoinHandle<()>>;

/// Service for room membership and the message log.
///
/// Membership changes are serialized so a room's event subscription is
/// running exactly while the room has members.
pub struct RoomService {
    repository: Arc<dyn RoomRepository + Send + Sync>,
    messages: Arc<dyn MessageRepository + Send + Sync>,
    event_bus: EventBus,
    subscriber: Arc<dyn RoomEventHandler>,
    subscriptions: Mutex<Subscriptions>,
    history_limit: usize,
}

impl RoomService {
    pub fn new(
        repository: Arc<dyn RoomRepository + Send + Sync>,
        messages: Arc<dyn MessageRepository + Send + Sync>,
        event_bus: EventBus,
        subscriber: Arc<dyn RoomEventHandler>,
        history_limit: usize,
    ) -> Self {
        Self {
            repository,
            messages,
            event_bus,
            subscriber,
            subscriptions: Mutex::new(HashMap::new()),
            history_limit,
        }
    }

    /// Puts a connection in `room_id`, leaving any other room first.
    /// Returns the room's recent history for the joiner.
    #[instrument(skip(self))]
    pub async fn join(
        &self,
        connection_id: &str,
        user: &str,
        room_id: &str,
    ) -> Result<Vec<MessageModel>, AppError> {
        let mut subscriptions = self.subscriptions.lock().await;

        if let Some((current, member)) = self.repository.room_of(connection_id).await? {
            if current != room_id {
                debug!(from = %current, to = %room_id, "Switching rooms");
                self.depart(
                    &mut subscriptions,
                    &current,
                    connection_id,
                    RoomEvent::MemberLeft { user: member.user },
                )
                .await?;
            }
        }

        if !subscriptions.contains_key(room_id) {
            let subscription = RoomSubscription::new(
                room_id.to_string(),
                Arc::clone(&self.subscriber),
                self.event_bus.clone(),
            );
            subscriptions.insert(room_id.to_string(), subscription.start().await);
        }

        let result = self
            .repository
            .try_join_room(room_id, RoomMember::new(connection_id, user))
            .await?;

        match result {
            JoinRoomResult::AlreadyMember(_) => {
                debug!(room_id = %room_id, user = %user, "Join repeated, no broadcast");
            }
            JoinRoomResult::Created(_) | JoinRoomResult::Joined(_) => {
                info!(
                    room_id = %room_id,
                    user = %user,
                    member_count = result.room().member_count(),
                    "User joined room"
                );
                self.event_bus
                    .emit_to_room(
                        room_id,
                        RoomEvent::MemberJoined {
                            user: user.to_string(),
                        },
                    )
                    .await;
            }
        }
        drop(subscriptions);

        self.history(room_id).await
    }

    /// Takes a connection out of `room_id`. Returns the room left, or
    /// `None` when the connection is not a member of that room.
    #[instrument(skip(self))]
    pub async fn leave(
        &self,
        connection_id: &str,
        room_id: &str,
    ) -> Result<Option<String>, AppError> {
        self.remove_connection(connection_id, Some(room_id), |user| RoomEvent::MemberLeft {
            user,
        })
        .await
    }

    /// Same as [`leave`](Self::leave) for a connection that went away
    #[instrument(skip(self))]
    pub async fn disconnect(&self, connection_id: &str) -> Result<Option<String>, AppError> {
        self.remove_connection(connection_id, None, |user| RoomEvent::MemberDisconnected {
            user,
        })
        .await
    }

    /// Stores and broadcasts a message from a connection to its room.
    /// Blank text and connections outside any room are ignored.
    #[instrument(skip(self, text))]
    pub async fn post_message(
        &self,
        connection_id: &str,
        text: &str,
    ) -> Result<Option<MessageModel>, AppError> {
        let body = text.trim();
        if body.is_empty() {
            debug!("Ignoring blank message");
            return Ok(None);
        }

        let Some((room_id, member)) = self.repository.room_of(connection_id).await? else {
            debug!("Ignoring message from connection outside any room");
            return Ok(None);
        };

        let message = MessageModel::new(room_id.clone(), member.user, body.to_string());
        self.messages.append(&message).await?;

        self.event_bus
            .emit_to_room(
                &room_id,
                RoomEvent::ChatMessage {
                    sender: message.sender.clone(),
                    body: message.body.clone(),
                    timestamp: message.timestamp,
                },
            )
            .await;

        Ok(Some(message))
    }

    /// The room's most recent messages, oldest first
    pub async fn history(&self, room_id: &str) -> Result<Vec<MessageModel>, AppError> {
        self.messages.recent(room_id, self.history_limit).await
    }

    #[instrument(skip(self))]
    pub async fn list_rooms(&self) -> Result<Vec<RoomResponse>, AppError> {
        let rooms = self.repository.list_rooms().await?;
        debug!(room_count = rooms.len(), "Rooms listed");

        Ok(rooms
            .into_iter()
            .map(|room| RoomResponse {
                name: room.id.clone(),
                member_count: room.member_count(),
                id: room.id,
            })
            .collect())
    }

    async fn remove_connection(
        &self,
        connection_id: &str,
        expected_room: Option<&str>,
        event: impl FnOnce(String) -> RoomEvent,
    ) -> Result<Option<String>, AppError> {
        let mut subscriptions = self.subscriptions.lock().await;

        let Some((room_id, member)) = self.repository.room_of(connection_id).await? else {
            debug!("Connection is not in any room");
            return Ok(None);
        };
        if expected_room.is_some_and(|expected| expected != room_id) {
            debug!(
                room_id = %room_id,
                requested = ?expected_room,
                "Leave names a room the connection is not in"
            );
            return Ok(None);
        }

        self.depart(&mut subscriptions, &room_id, connection_id, event(member.user))
            .await?;
        Ok(Some(room_id))
    }

    async fn depart(
        &self,
        subscriptions: &mut MutexGuard<'_, Subscriptions>,
        room_id: &str,
        connection_id: &str,
        event: RoomEvent,
    ) -> Result<(), AppError> {
        match self.repository.leave_room(room_id, connection_id).await? {
            LeaveRoomResult::Success(room) => {
                info!(
                    room_id = %room_id,
                    event = event.event_type(),
                    member_count = room.member_count(),
                    "Member left room"
                );
                self.event_bus.emit_to_room(room_id, event).await;
            }
            LeaveRoomResult::RoomDeleted => {
                info!(room_id = %room_id, "Room deleted after last member left");
                subscriptions.remove(room_id);
                self.event_bus.close_room(room_id).await;
            }
            LeaveRoomResult::NotInRoom | LeaveRoomResult::RoomNotFound => {
                debug!(room_id = %room_id, "Nothing to leave");
            }
        }
        Ok(())
    }
}
