use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

use super::models::{RoomMember, RoomModel};
use crate::shared::AppError;

/// Result of attempting to join a room
#[derive(Debug, Clone, PartialEq)]
pub enum JoinRoomResult {
    /// The room did not exist and was created with this member
    Created(RoomModel),
    /// Joined an existing room
    Joined(RoomModel),
    /// The connection was already a member
    AlreadyMember(RoomModel),
}

impl JoinRoomResult {
    pub fn room(&self) -> &RoomModel {
        match self {
            JoinRoomResult::Created(room)
            | JoinRoomResult::Joined(room)
            | JoinRoomResult::AlreadyMember(room) => room,
        }
    }
}

/// Result of attempting to leave a room
#[derive(Debug, Clone, PartialEq)]
pub enum LeaveRoomResult {
    /// Left the room, returns the updated room
    Success(RoomModel),
    /// Connection was not in the room
    NotInRoom,
    /// Room does not exist
    RoomNotFound,
    /// Room was deleted because its last member left
    RoomDeleted,
}

/// Trait for room membership storage
#[async_trait]
pub trait RoomRepository {
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomModel>, AppError>;
    async fn list_rooms(&self) -> Result<Vec<RoomModel>, AppError>;

    /// Atomically adds a member, creating the room on first join
    async fn try_join_room(
        &self,
        room_id: &str,
        member: RoomMember,
    ) -> Result<JoinRoomResult, AppError>;

    /// Atomically removes a connection, deleting the room when it empties
    async fn leave_room(
        &self,
        room_id: &str,
        connection_id: &str,
    ) -> Result<LeaveRoomResult, AppError>;

    /// The room a connection currently belongs to, with its membership
    async fn room_of(&self, connection_id: &str)
        -> Result<Option<(String, RoomMember)>, AppError>;
}

/// In-memory implementation of RoomRepository
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<String, RoomModel>>,
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    fn rooms(&self) -> Result<MutexGuard<'_, HashMap<String, RoomModel>>, AppError> {
        self.rooms.lock().map_err(|_| AppError::Internal)
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomModel>, AppError> {
        let room = self.rooms()?.get(room_id).cloned();
        debug!(room_id = %room_id, found = room.is_some(), "Fetched room");
        Ok(room)
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> Result<Vec<RoomModel>, AppError> {
        let mut rooms: Vec<RoomModel> = self.rooms()?.values().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rooms)
    }

    #[instrument(skip(self, member), fields(connection_id = %member.connection_id))]
    async fn try_join_room(
        &self,
        room_id: &str,
        member: RoomMember,
    ) -> Result<JoinRoomResult, AppError> {
        let mut rooms = self.rooms()?;

        let Some(room) = rooms.get_mut(room_id) else {
            let mut room = RoomModel::new(room_id);
            room.add_member(member);
            rooms.insert(room_id.to_string(), room.clone());
            info!(room_id = %room_id, "Room created on first join");
            return Ok(JoinRoomResult::Created(room));
        };

        if room.has_connection(&member.connection_id) {
            debug!(room_id = %room_id, "Connection already in room");
            return Ok(JoinRoomResult::AlreadyMember(room.clone()));
        }

        room.add_member(member);
        info!(
            room_id = %room_id,
            member_count = room.member_count(),
            "Member joined room"
        );
        Ok(JoinRoomResult::Joined(room.clone()))
    }

    #[instrument(skip(self))]
    async fn leave_room(
        &self,
        room_id: &str,
        connection_id: &str,
    ) -> Result<LeaveRoomResult, AppError> {
        let mut rooms = self.rooms()?;

        let Some(room) = rooms.get_mut(room_id) else {
            debug!(room_id = %room_id, "Room not found");
            return Ok(LeaveRoomResult::RoomNotFound);
        };

        if room.remove_member(connection_id).is_none() {
            debug!(room_id = %room_id, "Connection not in room");
            return Ok(LeaveRoomResult::NotInRoom);
        }

        if room.members.is_empty() {
            info!(room_id = %room_id, "Room is now empty, deleting");
            rooms.remove(room_id);
            return Ok(LeaveRoomResult::RoomDeleted);
        }

        info!(
            room_id = %room_id,
            member_count = room.member_count(),
            "Member left room"
        );
        Ok(LeaveRoomResult::Success(room.clone()))
    }

    #[instrument(skip(self))]
    async fn room_of(
        &self,
        connection_id: &str,
    ) -> Result<Option<(String, RoomMember)>, AppError> {
        let rooms = self.rooms()?;
        Ok(rooms.values().find_map(|room| {
            room.members
                .iter()
                .find(|m| m.connection_id == connection_id)
                .map(|m| (room.id.clone(), m.clone()))
        }))
    }
}
