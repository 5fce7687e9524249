use axum::{
    extract::{Query, State},
    Json,
};
use tracing::{info, instrument};

use super::types::{MessagesQuery, RoomResponse};
use crate::shared::{AppError, AppState};
use crate::websockets::MessagePayload;

/// HTTP handler for listing rooms that currently have members
///
/// GET /rooms
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoomResponse>>, AppError> {
    let rooms = state.room_service.list_rooms().await?;
    info!(room_count = rooms.len(), "Rooms listed");
    Ok(Json(rooms))
}

/// HTTP handler for a room's message history
///
/// GET /api/rooms/messages?room=<id>
/// Returns the most recent messages, oldest first
#[instrument(name = "room_messages", skip(state))]
pub async fn room_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessagePayload>>, AppError> {
    let room_id = query.room.trim();
    if room_id.is_empty() {
        return Err(AppError::BadRequest("room is required".to_string()));
    }

    let messages = state.room_service.history(room_id).await?;
    info!(room_id = %room_id, count = messages.len(), "History served");

    Ok(Json(
        messages.iter().map(|m| m.to_payload(false)).collect(),
    ))
}
