#![allow(dead_code)] // Test utilities may not all be used in every test

use tokio::time::{sleep, Duration};

use roomchat::websockets::{MessageHandler, WireFrame};

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Feed a raw text frame from a connection and let room events settle
    pub async fn send_text(&self, connection_id: &str, text: &str) {
        self.input_handler
            .handle_message(connection_id, text.to_string())
            .await;
        sleep(Duration::from_millis(20)).await;
    }

    pub async fn send_frame(&self, connection_id: &str, frame: WireFrame) {
        let text = frame.to_text().unwrap();
        self.send_text(connection_id, &text).await;
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn send_join(&self, connection_id: &str, user: &str, room: &str) {
        self.send_frame(connection_id, WireFrame::join(user.into(), room.into()))
            .await;
    }

    pub async fn send_chat(&self, connection_id: &str, user: &str, room: &str, text: &str) {
        self.send_frame(
            connection_id,
            WireFrame::send_message(user.into(), room.into(), text.into()),
        )
        .await;
    }

    pub async fn send_leave(&self, connection_id: &str, room: &str) {
        self.send_frame(connection_id, WireFrame::leave_room(room.into()))
            .await;
    }

    /// What the websocket endpoint does when a socket goes away
    pub async fn disconnect(&self, connection_id: &str) {
        self.state
            .room_service
            .disconnect(connection_id)
            .await
            .unwrap();
        sleep(Duration::from_millis(20)).await;
    }

    pub async fn clear_messages(&self) {
        self.mock_conn_manager.clear_messages().await;
    }
}
