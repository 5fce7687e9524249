#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;

use roomchat::{
    client::{ConnectionState, RoomSession},
    contacts::InMemoryContactRepository,
    message::InMemoryMessageRepository,
    room::repository::InMemoryRoomRepository,
    websockets::ChannelReceiveHandler,
    AppState,
};

use super::mocks::{MockChannel, MockConnectionManager, MockHistoryApi};

// ============================================================================
// Server workflow setup
// ============================================================================

/// Backend wired with in-memory repositories and a recording connection manager
pub struct TestSetup {
    pub state: AppState,
    pub mock_conn_manager: Arc<MockConnectionManager>,
    pub input_handler: ChannelReceiveHandler,
}

pub struct TestSetupBuilder {
    history_limit: usize,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self { history_limit: 100 }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn build(self) -> TestSetup {
        let mock_conn_manager = Arc::new(MockConnectionManager::new());

        let state = AppState::new(
            Arc::new(InMemoryRoomRepository::new()),
            Arc::new(InMemoryMessageRepository::new()),
            Arc::new(InMemoryContactRepository::new()),
            mock_conn_manager.clone(),
            "test-token".to_string(),
            self.history_limit,
        );

        let input_handler = ChannelReceiveHandler::new(
            Arc::clone(&state.room_service),
            mock_conn_manager.clone(),
        );

        TestSetup {
            state,
            mock_conn_manager,
            input_handler,
        }
    }
}

// ============================================================================
// Client session setup
// ============================================================================

/// A RoomSession over a recording channel and a scripted History API
pub struct SessionHarness {
    pub session: RoomSession,
    pub channel: Arc<MockChannel>,
    pub history: Arc<MockHistoryApi>,
}

impl SessionHarness {
    /// Connected session for `user`
    pub fn new(user: &str, history: MockHistoryApi) -> Self {
        let channel = Arc::new(MockChannel::connected());
        let history = Arc::new(history);
        let mut session = RoomSession::new(user, channel.clone(), history.clone());
        session.set_connection_state(ConnectionState::Connected);

        Self {
            session,
            channel,
            history,
        }
    }
}
