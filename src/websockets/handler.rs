use async_trait::async_trait;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::room::RoomService;
use crate::shared::{AppError, AppState};
use crate::websockets::messages::{
    EventName, JoinPayload, LeaveRoomPayload, SendMessagePayload, WireFrame,
};

use super::connection_manager::ConnectionManager;
use super::socket::{Connection, MessageHandler};

/// Handles frames a client sends over the realtime channel
pub struct ChannelReceiveHandler {
    room_service: Arc<RoomService>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl ChannelReceiveHandler {
    pub fn new(room_service: Arc<RoomService>, connection_manager: Arc<dyn ConnectionManager>) -> Self {
        Self {
            room_service,
            connection_manager,
        }
    }

    async fn send_frame(&self, connection_id: &str, frame: WireFrame) {
        match frame.to_text() {
            Ok(text) => {
                self.connection_manager
                    .send_to_connection(connection_id, &text)
                    .await
            }
            Err(e) => warn!(error = %e, "Failed to serialize frame"),
        }
    }

    async fn handle_join(&self, connection_id: &str, frame: &WireFrame) -> Result<(), AppError> {
        let payload: JoinPayload = frame
            .payload()
            .map_err(|e| AppError::BadRequest(format!("Malformed join: {e}")))?;
        let user = payload.user.trim();
        let room = payload.room.trim();
        if user.is_empty() || room.is_empty() {
            return Err(AppError::BadRequest("join needs a user and a room".to_string()));
        }

        let history = self.room_service.join(connection_id, user, room).await?;

        self.send_frame(connection_id, WireFrame::joined(Some(room.to_string())))
            .await;
        self.send_frame(
            connection_id,
            WireFrame::message_history(
                Some(room.to_string()),
                history.iter().map(|m| m.to_payload(false)).collect(),
            ),
        )
        .await;
        Ok(())
    }

    async fn handle_leave(&self, connection_id: &str, frame: &WireFrame) -> Result<(), AppError> {
        let payload: LeaveRoomPayload = frame
            .payload()
            .map_err(|e| AppError::BadRequest(format!("Malformed leave_room: {e}")))?;
        self.room_service
            .leave(connection_id, payload.room.trim())
            .await?;
        Ok(())
    }

    async fn handle_send(&self, connection_id: &str, frame: &WireFrame) -> Result<(), AppError> {
        let payload: SendMessagePayload = frame
            .payload()
            .map_err(|e| AppError::BadRequest(format!("Malformed send_message: {e}")))?;
        self.room_service
            .post_message(connection_id, &payload.text)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for ChannelReceiveHandler {
    async fn handle_message(&self, connection_id: &str, message: String) {
        let frame = match WireFrame::parse(&message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to parse channel frame"
                );
                return;
            }
        };

        debug!(connection_id = %connection_id, event = %frame.event, "Received frame");

        let result = match frame.event {
            EventName::Join => self.handle_join(connection_id, &frame).await,
            EventName::LeaveRoom => self.handle_leave(connection_id, &frame).await,
            EventName::SendMessage => self.handle_send(connection_id, &frame).await,
            EventName::Message | EventName::MessageHistory | EventName::Joined => {
                debug!(event = %frame.event, "Ignoring server-side event from client");
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(
                connection_id = %connection_id,
                event = %frame.event,
                error = %e,
                "Channel frame rejected"
            );
        }
    }
}

/// Websocket endpoint for the realtime channel
///
/// GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, app_state))
}

/// Runs an upgraded connection until it closes, then cleans up its membership
async fn handle_websocket_connection(socket: axum::extract::ws::WebSocket, app_state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    info!(connection_id = %connection_id, "WebSocket connection established");

    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    app_state
        .connection_manager
        .add_connection(connection_id.clone(), outbound_sender)
        .await;

    let message_handler = Arc::new(ChannelReceiveHandler::new(
        Arc::clone(&app_state.room_service),
        Arc::clone(&app_state.connection_manager),
    ));

    let connection = Connection::new(
        connection_id.clone(),
        Box::new(socket),
        outbound_receiver,
        message_handler,
    );

    match connection.run().await {
        Ok(()) => info!(connection_id = %connection_id, "WebSocket connection closed cleanly"),
        Err(e) => warn!(
            connection_id = %connection_id,
            error = %e,
            "WebSocket connection error"
        ),
    }

    app_state
        .connection_manager
        .remove_connection(&connection_id)
        .await;

    if let Err(e) = app_state.room_service.disconnect(&connection_id).await {
        warn!(connection_id = %connection_id, error = %e, "Failed to clean up membership");
    }
}
