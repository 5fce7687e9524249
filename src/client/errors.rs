use thiserror::Error;

/// Errors raised by a realtime channel
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Channel is not connected")]
    NotConnected,

    #[error("Failed to connect to {url}: {detail}")]
    ConnectFailed { url: String, detail: String },

    #[error("Failed to send event: {0}")]
    SendFailed(String),

    #[error("Channel closed")]
    Closed,
}

/// Errors raised by the history API
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HistoryError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Request to {url} failed: {detail}")]
    Transport { url: String, detail: String },

    #[error("Could not decode response: {0}")]
    Decode(String),
}

/// Everything a session operation can report back to the user.
///
/// None of these are fatal and none are retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("Not connected to the chat server")]
    TransportUnavailable,

    #[error("Join a room first")]
    NoCurrentRoom,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Contact name is empty")]
    EmptyContactName,

    #[error("Contact already exists")]
    DuplicateContact,

    #[error("Missing CSRF token")]
    MissingToken,

    #[error("{0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(#[from] ChannelError),

    #[error("Request failed: {0}")]
    Request(#[from] HistoryError),
}
