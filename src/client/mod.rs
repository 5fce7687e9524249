// Client side of the chat: room membership, message log and contacts.
//
// `RoomSession` holds the membership/log state machine, `ContactBook` the
// contact list, and `SessionDriver` runs both on one event loop. The
// transport and the HTTP API are reached through the `RealtimeChannel` and
// `HistoryApi` traits.

// Public API - what other modules can use
pub use channel::{ChannelEvent, RealtimeChannel, ServerEvent};
pub use contacts::ContactBook;
pub use driver::{SessionDriver, SessionUpdate, UiCommand};
pub use errors::{ChannelError, HistoryError, SessionError};
pub use crate::contacts::types::{AddContactResponse, CSRF_HEADER};
pub use history::{HistoryApi, HttpHistoryClient};
pub use models::{ConnectionState, LogStatus, Membership, Message, Room};
pub use session::{HistoryOutcome, HistoryTicket, ReceiveOutcome, RoomSession};
pub use ws_channel::{ChannelConfig, WebSocketChannel};

// Internal modules
mod channel;
mod contacts;
mod driver;
mod errors;
mod history;
pub mod models;
mod session;
mod ws_channel;
