use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::channel::{RealtimeChannel, ServerEvent};
use super::errors::{HistoryError, SessionError};
use super::history::HistoryApi;
use super::models::{ConnectionState, LogStatus, Membership, Message, Room};
use crate::websockets::WireFrame;

/// Identifies one history request. Results are only applied while the
/// ticket's generation is still the session's current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTicket {
    pub room: Room,
    pub generation: u64,
}

/// What happened to a history result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// The log now holds exactly the fetched messages
    Applied,
    /// The fetch failed; the log shows the placeholder
    Failed(String),
    /// A newer join superseded the request; the result was dropped
    Stale,
    /// The room was already current, nothing was fetched
    AlreadyCurrent,
    /// A snapshot for this join was already applied; the result was dropped
    AlreadyLoaded,
}

/// What happened to an inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Appended,
    Replaced,
    Confirmed,
    Discarded,
}

/// Client-side room membership and message log.
///
/// All mutation goes through `&mut self`, so handlers run one at a time to
/// completion. The only suspension points are channel emits and history
/// fetches.
pub struct RoomSession {
    user: String,
    channel: Arc<dyn RealtimeChannel>,
    history: Arc<dyn HistoryApi>,
    current_room: Option<Room>,
    connection_state: ConnectionState,
    membership: Membership,
    generation: u64,
    log: Vec<Message>,
    log_status: LogStatus,
}

impl RoomSession {
    pub fn new(
        user: impl Into<String>,
        channel: Arc<dyn RealtimeChannel>,
        history: Arc<dyn HistoryApi>,
    ) -> Self {
        Self {
            user: user.into(),
            channel,
            history,
            current_room: None,
            connection_state: ConnectionState::Disconnected,
            membership: Membership::Pending,
            generation: 0,
            log: Vec::new(),
            log_status: LogStatus::Empty,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn current_room(&self) -> Option<&Room> {
        self.current_room.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn membership(&self) -> Membership {
        self.membership
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn log(&self) -> &[Message] {
        &self.log
    }

    pub fn log_status(&self) -> &LogStatus {
        &self.log_status
    }

    pub fn history_api(&self) -> Arc<dyn HistoryApi> {
        Arc::clone(&self.history)
    }

    fn is_current(&self, room_id: &str) -> bool {
        self.current_room
            .as_ref()
            .is_some_and(|current| current.id == room_id)
    }

    /// Records the channel state. Losing the socket loses the server-side
    /// membership too.
    pub fn set_connection_state(&mut self, state: ConnectionState) {
        if state == self.connection_state {
            return;
        }
        info!(user = %self.user, from = ?self.connection_state, to = ?state, "Connection state changed");
        if state != ConnectionState::Connected {
            self.membership = Membership::Pending;
        }
        self.connection_state = state;
    }

    /// Emits a fire-and-forget event, logging instead of failing
    async fn emit_unconfirmed(&self, frame: WireFrame) {
        let event = frame.event;
        if let Err(e) = self.channel.emit(frame).await {
            warn!(user = %self.user, event = %event, error = %e, "Unconfirmed emit failed");
        }
    }

    /// Switches membership to `room` and returns the ticket for its history.
    ///
    /// Returns `None` when `room` is already current.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn begin_join(&mut self, room: Room) -> Result<Option<HistoryTicket>, SessionError> {
        if self.connection_state != ConnectionState::Connected {
            return Err(SessionError::TransportUnavailable);
        }
        if self.is_current(&room.id) {
            debug!(room = %room.id, "Already in room");
            return Ok(None);
        }

        if let Some(old) = &self.current_room {
            info!(from = %old.id, to = %room.id, "Leaving room");
            self.emit_unconfirmed(WireFrame::leave_room(old.id.clone()))
                .await;
        }
        self.emit_unconfirmed(WireFrame::join(self.user.clone(), room.id.clone()))
            .await;

        Ok(Some(self.start_generation(room)))
    }

    /// Re-requests membership of the current room, e.g. after a reconnect
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn rejoin(&mut self) -> Result<Option<HistoryTicket>, SessionError> {
        if self.connection_state != ConnectionState::Connected {
            return Err(SessionError::TransportUnavailable);
        }
        let Some(room) = self.current_room.clone() else {
            return Ok(None);
        };

        info!(room = %room.id, "Rejoining room");
        self.emit_unconfirmed(WireFrame::join(self.user.clone(), room.id.clone()))
            .await;

        Ok(Some(self.start_generation(room)))
    }

    fn start_generation(&mut self, room: Room) -> HistoryTicket {
        self.generation += 1;
        self.current_room = Some(room.clone());
        self.membership = Membership::Pending;
        self.log.clear();
        self.log_status = LogStatus::Loading;

        HistoryTicket {
            room,
            generation: self.generation,
        }
    }

    /// Applies a history result if its ticket is still current
    pub fn complete_history(
        &mut self,
        ticket: &HistoryTicket,
        result: Result<Vec<Message>, HistoryError>,
    ) -> HistoryOutcome {
        if ticket.generation != self.generation || !self.is_current(&ticket.room.id) {
            debug!(
                room = %ticket.room.id,
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                "Discarding stale history"
            );
            return HistoryOutcome::Stale;
        }

        if self.log_status == LogStatus::Ready {
            debug!(room = %ticket.room.id, "History already loaded for this join, dropping result");
            if result.is_ok() {
                self.membership = Membership::Confirmed;
            }
            return HistoryOutcome::AlreadyLoaded;
        }

        match result {
            Ok(messages) => {
                self.apply_history(messages);
                self.membership = Membership::Confirmed;
                HistoryOutcome::Applied
            }
            Err(e) => {
                warn!(room = %ticket.room.id, error = %e, "Failed to load room history");
                let reason = e.to_string();
                self.log_status = LogStatus::Failed(reason.clone());
                HistoryOutcome::Failed(reason)
            }
        }
    }

    /// Replaces the log with the room's history. Live messages that arrived
    /// while it loaded are kept after it unless the history already holds
    /// them.
    fn apply_history(&mut self, history: Vec<Message>) {
        let live = std::mem::replace(&mut self.log, history);
        debug!(count = self.log.len(), live = live.len(), "Replacing log with history");
        for message in live {
            if !self.log.contains(&message) {
                self.log.push(message);
            }
        }
        self.log_status = LogStatus::Ready;
    }

    /// Joins `room` and loads its history inline
    pub async fn join(&mut self, room: Room) -> Result<HistoryOutcome, SessionError> {
        let Some(ticket) = self.begin_join(room).await? else {
            return Ok(HistoryOutcome::AlreadyCurrent);
        };
        let result = self.history.fetch_messages(&ticket.room.id).await;
        Ok(self.complete_history(&ticket, result))
    }

    /// Relinquishes the current room
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn leave(&mut self) -> Result<Room, SessionError> {
        let room = self.current_room.take().ok_or(SessionError::NoCurrentRoom)?;

        if self.connection_state == ConnectionState::Connected {
            self.emit_unconfirmed(WireFrame::leave_room(room.id.clone()))
                .await;
        }

        // Invalidates any outstanding history request
        self.generation += 1;
        self.membership = Membership::Pending;
        self.log.clear();
        self.log_status = LogStatus::Empty;

        info!(room = %room.id, "Left room");
        Ok(room)
    }

    /// Reconciles the log with a server-pushed event
    pub fn receive(&mut self, event: ServerEvent) -> ReceiveOutcome {
        match event {
            ServerEvent::Message { message, room } => {
                if self.current_room.is_none() {
                    debug!("Message received outside any room, discarding");
                    return ReceiveOutcome::Discarded;
                }
                if let Some(room) = room.as_deref() {
                    if !self.is_current(room) {
                        debug!(room = %room, "Message for another room, discarding");
                        return ReceiveOutcome::Discarded;
                    }
                }
                self.log.push(message);
                ReceiveOutcome::Appended
            }
            ServerEvent::History { room, messages } => {
                if self.current_room.is_none()
                    || room.as_deref().is_some_and(|room| !self.is_current(room))
                {
                    debug!(room = ?room, "History snapshot for another room, discarding");
                    return ReceiveOutcome::Discarded;
                }
                if self.log_status == LogStatus::Ready {
                    debug!("History already loaded for this join, discarding snapshot");
                    return ReceiveOutcome::Discarded;
                }
                self.apply_history(messages);
                ReceiveOutcome::Replaced
            }
            ServerEvent::Joined { room } => {
                let confirms = match room.as_deref() {
                    Some(room) => self.is_current(room),
                    None => self.current_room.is_some(),
                };
                if confirms {
                    self.membership = Membership::Confirmed;
                    ReceiveOutcome::Confirmed
                } else {
                    debug!(room = ?room, "Acknowledgement for a room no longer current");
                    ReceiveOutcome::Discarded
                }
            }
        }
    }

    /// Requests delivery of `text` to the current room. The message only
    /// shows up in the log once the server reflects it.
    #[instrument(skip(self, text), fields(user = %self.user))]
    pub async fn send(&self, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let room = self.current_room.as_ref().ok_or(SessionError::NoCurrentRoom)?;
        if self.connection_state != ConnectionState::Connected {
            return Err(SessionError::TransportUnavailable);
        }

        self.channel
            .emit(WireFrame::send_message(
                self.user.clone(),
                room.id.clone(),
                text.to_string(),
            ))
            .await?;

        debug!(room = %room.id, "Message sent");
        Ok(())
    }
}
