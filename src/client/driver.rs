use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::channel::{ChannelEvent, ServerEvent};
use super::contacts::ContactBook;
use super::errors::{HistoryError, SessionError};
use super::models::{ConnectionState, LogStatus, Message, Room};
use super::session::{HistoryOutcome, HistoryTicket, ReceiveOutcome, RoomSession};

/// User actions fed into the driver
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// Switch rooms; a blank name means the default room
    Join(String),
    Send(String),
    AddContact(String),
    ReloadContacts,
    Leave,
    Quit,
}

impl UiCommand {
    /// Reads a line of terminal input. Slash commands are `/join <room>`,
    /// `/add <contact>`, `/contacts`, `/leave` and `/quit`; any other
    /// non-blank line is a message.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (line, ""),
        };

        Some(match command {
            "/join" => UiCommand::Join(argument.to_string()),
            "/add" => UiCommand::AddContact(argument.to_string()),
            "/contacts" => UiCommand::ReloadContacts,
            "/leave" => UiCommand::Leave,
            "/quit" => UiCommand::Quit,
            _ => UiCommand::Send(line.to_string()),
        })
    }
}

/// View changes published for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    ConnectionChanged(ConnectionState),
    RoomChanged(Option<Room>),
    LogReplaced {
        messages: Vec<Message>,
        status: LogStatus,
    },
    MessageAppended(Message),
    ContactsChanged(Vec<String>),
    Notice(String),
}

type HistoryCompletion = (HistoryTicket, Result<Vec<Message>, HistoryError>);

/// Runs a [`RoomSession`] and a [`ContactBook`] on one cooperative loop.
///
/// Channel events, UI commands and history completions are handled one at
/// a time. History fetches run as background tasks and come back tagged
/// with their ticket; superseded ones are aborted and their results dropped.
pub struct SessionDriver {
    session: RoomSession,
    contacts: ContactBook,
    csrf_token: Option<String>,
    default_room: Room,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    commands: mpsc::UnboundedReceiver<UiCommand>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    completion_sender: mpsc::UnboundedSender<HistoryCompletion>,
    completion_receiver: mpsc::UnboundedReceiver<HistoryCompletion>,
    in_flight: Option<JoinHandle<()>>,
}

impl SessionDriver {
    pub fn new(
        session: RoomSession,
        contacts: ContactBook,
        default_room: Room,
        events: mpsc::UnboundedReceiver<ChannelEvent>,
        commands: mpsc::UnboundedReceiver<UiCommand>,
        updates: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Self {
        let (completion_sender, completion_receiver) = mpsc::unbounded_channel();
        Self {
            session,
            contacts,
            csrf_token: None,
            default_room,
            events,
            commands,
            updates,
            completion_sender,
            completion_receiver,
            in_flight: None,
        }
    }

    /// Anti-forgery token attached to contact additions
    pub fn with_csrf_token(mut self, token: Option<String>) -> Self {
        self.csrf_token = token;
        self
    }

    pub fn session(&self) -> &RoomSession {
        &self.session
    }

    pub fn contacts(&self) -> &ContactBook {
        &self.contacts
    }

    /// Runs until `Quit`, or until the command or event source goes away
    pub async fn run(mut self) -> Self {
        info!(user = %self.session.user(), "Session driver started");
        self.reload_contacts().await;

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle_channel_event(event).await,
                    None => {
                        info!("Realtime channel closed");
                        break;
                    }
                },

                command = self.commands.recv() => match command {
                    Some(UiCommand::Quit) | None => break,
                    Some(command) => self.handle_command(command).await,
                },

                Some((ticket, result)) = self.completion_receiver.recv() => {
                    self.handle_history(ticket, result);
                }
            }
        }

        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        info!(user = %self.session.user(), "Session driver stopped");
        self
    }

    fn publish(&self, update: SessionUpdate) {
        let _ = self.updates.send(update);
    }

    fn notice(&self, err: SessionError) {
        debug!(error = %err, "Surfacing notice");
        self.publish(SessionUpdate::Notice(err.to_string()));
    }

    fn publish_log(&self) {
        self.publish(SessionUpdate::LogReplaced {
            messages: self.session.log().to_vec(),
            status: self.session.log_status().clone(),
        });
    }

    async fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                self.session.set_connection_state(ConnectionState::Connected);
                self.publish(SessionUpdate::ConnectionChanged(ConnectionState::Connected));

                let result = if self.session.current_room().is_some() {
                    self.session.rejoin().await
                } else {
                    self.session.begin_join(self.default_room.clone()).await
                };
                self.after_join(result);
            }
            ChannelEvent::Disconnected => {
                self.session.set_connection_state(ConnectionState::Disconnected);
                self.publish(SessionUpdate::ConnectionChanged(ConnectionState::Disconnected));
            }
            ChannelEvent::Reconnecting => {
                self.session.set_connection_state(ConnectionState::Connecting);
                self.publish(SessionUpdate::ConnectionChanged(ConnectionState::Connecting));
            }
            ChannelEvent::Server(event) => {
                let appended = match &event {
                    ServerEvent::Message { message, .. } => Some(message.clone()),
                    _ => None,
                };
                match self.session.receive(event) {
                    ReceiveOutcome::Appended => {
                        if let Some(message) = appended {
                            self.publish(SessionUpdate::MessageAppended(message));
                        }
                    }
                    ReceiveOutcome::Replaced => self.publish_log(),
                    ReceiveOutcome::Confirmed => self.reload_contacts().await,
                    ReceiveOutcome::Discarded => {}
                }
            }
        }
    }

    async fn handle_command(&mut self, command: UiCommand) {
        match command {
            UiCommand::Join(name) => {
                let name = name.trim();
                let room = if name.is_empty() {
                    self.default_room.clone()
                } else {
                    Room::new(name)
                };
                let result = self.session.begin_join(room).await;
                self.after_join(result);
            }
            UiCommand::Send(text) => {
                if let Err(e) = self.session.send(&text).await {
                    self.notice(e);
                }
            }
            UiCommand::AddContact(name) => {
                match self.contacts.add(&name, self.csrf_token.as_deref()).await {
                    Ok(()) => self.publish(SessionUpdate::ContactsChanged(
                        self.contacts.contacts().to_vec(),
                    )),
                    Err(e) => self.notice(e),
                }
            }
            UiCommand::ReloadContacts => self.reload_contacts().await,
            UiCommand::Leave => match self.session.leave().await {
                Ok(_) => {
                    self.abort_in_flight();
                    self.publish(SessionUpdate::RoomChanged(None));
                    self.publish_log();
                }
                Err(e) => self.notice(e),
            },
            UiCommand::Quit => {}
        }
    }

    fn after_join(&mut self, result: Result<Option<HistoryTicket>, SessionError>) {
        match result {
            Ok(Some(ticket)) => {
                self.publish(SessionUpdate::RoomChanged(Some(ticket.room.clone())));
                self.publish_log();
                self.spawn_history_fetch(ticket);
            }
            Ok(None) => {}
            Err(e) => self.notice(e),
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    fn spawn_history_fetch(&mut self, ticket: HistoryTicket) {
        self.abort_in_flight();

        let history = self.session.history_api();
        let completions = self.completion_sender.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = history.fetch_messages(&ticket.room.id).await;
            let _ = completions.send((ticket, result));
        }));
    }

    fn handle_history(&mut self, ticket: HistoryTicket, result: Result<Vec<Message>, HistoryError>) {
        match self.session.complete_history(&ticket, result) {
            HistoryOutcome::Applied | HistoryOutcome::Failed(_) => self.publish_log(),
            HistoryOutcome::Stale
            | HistoryOutcome::AlreadyCurrent
            | HistoryOutcome::AlreadyLoaded => {}
        }
    }

    async fn reload_contacts(&mut self) {
        let loaded = self.contacts.load().await.map(<[String]>::to_vec);
        match loaded {
            Ok(contacts) => self.publish(SessionUpdate::ContactsChanged(contacts)),
            Err(e) => self.notice(e),
        }
    }
}
