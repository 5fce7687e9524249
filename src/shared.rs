use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::contacts::ContactRepository;
use crate::event::EventBus;
use crate::message::MessageRepository;
use crate::room::{repository::RoomRepository, RoomService};
use crate::websockets::{ConnectionManager, WebSocketRoomSubscriber};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub room_service: Arc<RoomService>,
    pub contact_repository: Arc<dyn ContactRepository + Send + Sync>,
    pub connection_manager: Arc<dyn ConnectionManager>,
    /// Anti-forgery token expected in `X-CSRFToken` on contact additions
    pub csrf_token: String,
}

impl AppState {
    /// Wires the room service to a websocket subscriber over `connection_manager`
    pub fn new(
        room_repository: Arc<dyn RoomRepository + Send + Sync>,
        message_repository: Arc<dyn MessageRepository + Send + Sync>,
        contact_repository: Arc<dyn ContactRepository + Send + Sync>,
        connection_manager: Arc<dyn ConnectionManager>,
        csrf_token: String,
        history_limit: usize,
    ) -> Self {
        let subscriber = Arc::new(WebSocketRoomSubscriber::new(
            Arc::clone(&room_repository),
            Arc::clone(&connection_manager),
        ));
        let room_service = Arc::new(RoomService::new(
            room_repository,
            message_repository,
            EventBus::new(),
            subscriber,
            history_limit,
        ));

        Self {
            room_service,
            contact_repository,
            connection_manager,
            csrf_token,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
