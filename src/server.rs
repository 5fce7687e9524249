use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::contacts::{self, InMemoryContactRepository};
use crate::message::InMemoryMessageRepository;
use crate::room::{self, repository::InMemoryRoomRepository};
use crate::shared::AppState;
use crate::websockets::{self, InMemoryConnectionManager};

/// State backed by the in-memory repositories
pub fn in_memory_state(config: &ServerConfig) -> AppState {
    AppState::new(
        Arc::new(InMemoryRoomRepository::new()),
        Arc::new(InMemoryMessageRepository::new()),
        Arc::new(InMemoryContactRepository::new()),
        Arc::new(InMemoryConnectionManager::new()),
        config.csrf_token.clone(),
        config.history_limit,
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rooms", get(room::list_rooms))
        .route("/api/rooms/messages", get(room::room_messages))
        .route("/api/csrf-token", get(contacts::csrf_token))
        .route(
            "/contacts/get_contacts/:username",
            get(contacts::get_contacts),
        )
        .route("/contacts/add_contact", post(contacts::add_contact))
        .route("/ws", get(websockets::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on an already bound listener until the task is dropped
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Server running on http://{addr}");
    }
    axum::serve(listener, router(state)).await
}
