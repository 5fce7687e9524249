use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::channel::{ChannelEvent, RealtimeChannel, ServerEvent};
use super::errors::ChannelError;
use super::models::ConnectionState;
use crate::websockets::WireFrame;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection parameters for [`WebSocketChannel`]
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    /// Consecutive failed connection attempts before giving up
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

/// Why a live connection ended
enum ConnectionEnd {
    /// The channel handle was dropped
    OutboundClosed,
    /// The server went away or the socket errored
    SocketClosed,
}

/// [`RealtimeChannel`] over a websocket carrying JSON text frames.
///
/// A background task owns the socket, reconnects after drops and reports
/// `Connected`/`Disconnected` on the event stream. Dropping the handle shuts
/// the task down.
pub struct WebSocketChannel {
    outbound: mpsc::UnboundedSender<String>,
    state: watch::Receiver<ConnectionState>,
}

impl WebSocketChannel {
    /// Starts connecting in the background and returns the handle plus the
    /// inbound event stream
    pub fn connect(config: ChannelConfig) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
        let (event_sender, event_receiver) = mpsc::unbounded_channel::<ChannelEvent>();
        let (state_sender, state_receiver) = watch::channel(ConnectionState::Disconnected);

        tokio::spawn(supervise(config, outbound_receiver, event_sender, state_sender));

        (
            Self {
                outbound: outbound_sender,
                state: state_receiver,
            },
            event_receiver,
        )
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

#[async_trait]
impl RealtimeChannel for WebSocketChannel {
    async fn emit(&self, frame: WireFrame) -> Result<(), ChannelError> {
        if self.state() != ConnectionState::Connected {
            return Err(ChannelError::NotConnected);
        }
        let text = frame
            .to_text()
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        self.outbound.send(text).map_err(|_| ChannelError::Closed)
    }
}

/// Connect/reconnect loop owning the socket
async fn supervise(
    config: ChannelConfig,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    state: watch::Sender<ConnectionState>,
) {
    let mut failures = 0u32;

    loop {
        state.send_replace(ConnectionState::Connecting);

        match tokio_tungstenite::connect_async(config.url.as_str()).await {
            Ok((socket, _response)) => {
                failures = 0;
                info!(url = %config.url, "Realtime channel connected");

                // Frames queued while offline belong to a previous membership
                while outbound.try_recv().is_ok() {}

                state.send_replace(ConnectionState::Connected);
                if events.send(ChannelEvent::Connected).is_err() {
                    break;
                }

                let end = run_connection(socket, &mut outbound, &events).await;

                state.send_replace(ConnectionState::Disconnected);
                if events.send(ChannelEvent::Disconnected).is_err() {
                    break;
                }
                if let ConnectionEnd::OutboundClosed = end {
                    break;
                }
                warn!(url = %config.url, "Realtime channel lost, reconnecting");
                if events.send(ChannelEvent::Reconnecting).is_err() {
                    break;
                }
            }
            Err(e) => {
                failures += 1;
                warn!(
                    url = %config.url,
                    attempt = failures,
                    error = %e,
                    "Realtime channel connection failed"
                );
                state.send_replace(ConnectionState::Disconnected);
                if failures > config.reconnect_attempts {
                    warn!(url = %config.url, "Giving up on realtime channel");
                    let _ = events.send(ChannelEvent::Disconnected);
                    break;
                }
            }
        }

        if events.is_closed() || outbound.is_closed() {
            break;
        }
        tokio::time::sleep(config.reconnect_delay).await;
    }

    state.send_replace(ConnectionState::Disconnected);
    debug!(url = %config.url, "Realtime channel task finished");
}

/// Pumps frames both ways until either side closes
async fn run_connection(
    mut socket: Socket,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    events: &mpsc::UnboundedSender<ChannelEvent>,
) -> ConnectionEnd {
    loop {
        tokio::select! {
            msg = outbound.recv() => {
                match msg {
                    Some(text) => {
                        if let Err(e) = socket.send(WsMessage::Text(text)).await {
                            warn!(error = %e, "Failed to write frame");
                            return ConnectionEnd::SocketClosed;
                        }
                    }
                    None => {
                        let _ = socket.close(None).await;
                        return ConnectionEnd::OutboundClosed;
                    }
                }
            }

            frame = socket.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => match ServerEvent::decode(&text) {
                        Ok(Some(event)) => {
                            if events.send(ChannelEvent::Server(event)).is_err() {
                                let _ = socket.close(None).await;
                                return ConnectionEnd::OutboundClosed;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "Failed to parse inbound frame"),
                    },
                    Some(Ok(WsMessage::Close(_))) | None => return ConnectionEnd::SocketClosed,
                    Some(Ok(_)) => {} // ping/pong/binary
                    Some(Err(e)) => {
                        warn!(error = %e, "Realtime channel read error");
                        return ConnectionEnd::SocketClosed;
                    }
                }
            }
        }
    }
}
