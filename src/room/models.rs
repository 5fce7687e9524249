use serde::{Deserialize, Serialize};

/// One connection's membership in a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    pub connection_id: String,
    pub user: String,
}

impl RoomMember {
    pub fn new(connection_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            user: user.into(),
        }
    }
}

/// A live chat room. Rooms exist while they have members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomModel {
    pub id: String,
    pub members: Vec<RoomMember>,
}

impl RoomModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            members: Vec::new(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn has_connection(&self, connection_id: &str) -> bool {
        self.members.iter().any(|m| m.connection_id == connection_id)
    }

    /// Connection ids of every member, in join order
    pub fn connection_ids(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| m.connection_id.clone())
            .collect()
    }

    pub fn add_member(&mut self, member: RoomMember) {
        if !self.has_connection(&member.connection_id) {
            self.members.push(member);
        }
    }

    /// Removes a connection, returning its membership if it was present
    pub fn remove_member(&mut self, connection_id: &str) -> Option<RoomMember> {
        let index = self
            .members
            .iter()
            .position(|m| m.connection_id == connection_id)?;
        Some(self.members.remove(index))
    }
}
