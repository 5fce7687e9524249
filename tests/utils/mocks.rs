#![allow(dead_code)] // Test utilities may not all be used in every test

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use roomchat::client::{
    AddContactResponse, ChannelError, HistoryApi, HistoryError, Message, RealtimeChannel,
};
use roomchat::websockets::{ConnectionManager, EventName, WireFrame};

// ============================================================================
// Server side
// ============================================================================

/// Records every frame queued for each connection id
#[derive(Clone)]
pub struct MockConnectionManager {
    sent_messages: Arc<RwLock<HashMap<String, VecDeque<String>>>>,
    connected: Arc<RwLock<Vec<String>>>,
}

impl MockConnectionManager {
    pub fn new() -> Self {
        Self {
            sent_messages: Arc::new(RwLock::new(HashMap::new())),
            connected: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn get_messages_for(&self, connection_id: &str) -> Vec<String> {
        self.sent_messages
            .read()
            .await
            .get(connection_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes and returns the first frame for a connection with the given event
    pub async fn consume_event_for(&self, connection_id: &str, event: EventName) -> Option<String> {
        let mut sent = self.sent_messages.write().await;
        let queue = sent.get_mut(connection_id)?;
        let index = queue.iter().position(|text| {
            WireFrame::parse(text)
                .map(|frame| frame.event == event)
                .unwrap_or(false)
        })?;
        queue.remove(index)
    }

    pub async fn clear_messages(&self) {
        self.sent_messages.write().await.clear();
    }

    pub async fn is_connected(&self, connection_id: &str) -> bool {
        self.connected
            .read()
            .await
            .iter()
            .any(|c| c == connection_id)
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(&self, connection_id: String, _sender: mpsc::UnboundedSender<String>) {
        self.connected.write().await.push(connection_id);
    }

    async fn remove_connection(&self, connection_id: &str) {
        self.connected.write().await.retain(|c| c != connection_id);
    }

    async fn send_to_connection(&self, connection_id: &str, message: &str) {
        self.sent_messages
            .write()
            .await
            .entry(connection_id.to_string())
            .or_default()
            .push_back(message.to_string());
    }

    async fn send_to_connections(&self, connection_ids: &[String], message: &str) {
        for connection_id in connection_ids {
            self.send_to_connection(connection_id, message).await;
        }
    }
}

// ============================================================================
// Client side
// ============================================================================

/// Realtime channel that records emitted frames
pub struct MockChannel {
    frames: Mutex<Vec<WireFrame>>,
    connected: AtomicBool,
}

impl MockChannel {
    pub fn connected() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn frames(&self) -> Vec<WireFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<EventName> {
        self.frames().iter().map(|f| f.event).collect()
    }

    /// Frames with the given event, as JSON values
    pub fn data_of(&self, event: EventName) -> Vec<serde_json::Value> {
        self.frames()
            .into_iter()
            .filter(|f| f.event == event)
            .map(|f| f.data)
            .collect()
    }
}

#[async_trait]
impl RealtimeChannel for MockChannel {
    async fn emit(&self, frame: WireFrame) -> Result<(), ChannelError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ChannelError::NotConnected);
        }
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RoomScript {
    messages: Vec<Message>,
    delay: Option<Duration>,
    failing: bool,
}

/// Scripted History API
pub struct MockHistoryApi {
    rooms: Mutex<HashMap<String, RoomScript>>,
    contacts: Mutex<Vec<String>>,
    contacts_failing: AtomicBool,
    add_response: Mutex<AddContactResponse>,
    add_calls: AtomicUsize,
    fetches: Mutex<Vec<String>>,
}

impl MockHistoryApi {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            contacts: Mutex::new(Vec::new()),
            contacts_failing: AtomicBool::new(false),
            add_response: Mutex::new(AddContactResponse {
                success: true,
                message: None,
            }),
            add_calls: AtomicUsize::new(0),
            fetches: Mutex::new(Vec::new()),
        }
    }

    fn script(&self, room: &str, edit: impl FnOnce(&mut RoomScript)) {
        edit(self.rooms.lock().unwrap().entry(room.to_string()).or_default());
    }

    pub fn with_room(self, room: &str, messages: Vec<Message>) -> Self {
        self.script(room, |s| s.messages = messages);
        self
    }

    pub fn with_delay(self, room: &str, delay: Duration) -> Self {
        self.script(room, |s| s.delay = Some(delay));
        self
    }

    pub fn failing_room(self, room: &str) -> Self {
        self.script(room, |s| s.failing = true);
        self
    }

    pub fn with_contacts(self, contacts: &[&str]) -> Self {
        *self.contacts.lock().unwrap() = contacts.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn failing_contacts(self) -> Self {
        self.contacts_failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn rejecting_adds(self, message: &str) -> Self {
        *self.add_response.lock().unwrap() = AddContactResponse {
            success: false,
            message: Some(message.to_string()),
        };
        self
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryApi for MockHistoryApi {
    async fn fetch_messages(&self, room: &str) -> Result<Vec<Message>, HistoryError> {
        self.fetches.lock().unwrap().push(room.to_string());
        let script = self
            .rooms
            .lock()
            .unwrap()
            .get(room)
            .cloned()
            .unwrap_or_default();

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }
        if script.failing {
            return Err(HistoryError::Status {
                status: 500,
                url: format!("mock://api/rooms/messages?room={room}"),
            });
        }
        Ok(script.messages)
    }

    async fn fetch_contacts(&self, _user: &str) -> Result<Vec<String>, HistoryError> {
        if self.contacts_failing.load(Ordering::SeqCst) {
            return Err(HistoryError::Transport {
                url: "mock://contacts".to_string(),
                detail: "connection refused".to_string(),
            });
        }
        Ok(self.contacts.lock().unwrap().clone())
    }

    async fn add_contact(
        &self,
        _user: &str,
        contact_name: &str,
        _csrf_token: &str,
    ) -> Result<AddContactResponse, HistoryError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.add_response.lock().unwrap().clone();
        if response.success {
            self.contacts.lock().unwrap().push(contact_name.to_string());
        }
        Ok(response)
    }
}

/// A message stamped at a fixed minute, for readable ordering assertions
pub fn message_at(sender: &str, body: &str, minute: u32) -> Message {
    Message::new(sender, body, at(minute))
}

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap()
}
