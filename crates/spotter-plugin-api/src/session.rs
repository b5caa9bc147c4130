//! Transport session to the host.
//!
//! The session owns the single WebSocket connection. Inbound frames are
//! forwarded, in arrival order, to one receiver; outbound payloads are taken
//! from a channel and written to the socket by the same pump task.
//!
//! ```text
//!            ┌──────────── pump task ────────────┐
//! host ws ──►│ frame ──► inbound_tx ─────────────┼──► Dispatcher
//!            │                                   │
//! host ws ◄──│ sink ◄── outbound_rx ◄────────────┼─── Outbox::send
//!            └───────────────────────────────────┘
//! ```
//!
//! There is no reconnect. A failed connect or a closed connection ends the
//! session for this run.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::codec::JsonCodec;
use crate::error::SessionError;
use spotter_core::PluginMessage;

// =============================================================================
// Session State
// =============================================================================

/// Connection lifecycle, broadcast through [`Session::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    /// The connect attempt failed. Terminal.
    Failed(String),
    /// The connection was lost or closed. Terminal.
    Closed,
}

// =============================================================================
// Outbox
// =============================================================================

/// Best-effort sender to the host.
///
/// Cheap to clone. Until a connection is attached, and after it closes,
/// every send is a silent no-op.
#[derive(Clone, Default)]
pub struct Outbox {
    tx: Arc<RwLock<Option<mpsc::UnboundedSender<Vec<u8>>>>>,
}

impl Outbox {
    /// Create a detached outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route sends to a connection.
    pub fn attach(&self, tx: mpsc::UnboundedSender<Vec<u8>>) {
        *self.tx.write() = Some(tx);
    }

    /// Stop routing sends. Dropping the last sender closes the socket.
    pub fn detach(&self) {
        self.tx.write().take();
    }

    /// Whether a live connection is attached.
    pub fn is_connected(&self) -> bool {
        self.tx
            .read()
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    /// Send a message. Returns `false` if it was dropped.
    pub fn send(&self, message: &PluginMessage) -> bool {
        let guard = self.tx.read();
        let Some(tx) = guard.as_ref() else {
            tracing::debug!("Not connected, dropping message '{}'", message.id);
            return false;
        };

        let bytes = match JsonCodec::encode(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("{}", e);
                return false;
            }
        };

        tx.send(bytes).is_ok()
    }

    /// Push an action path suggestion to the host. No response is expected.
    pub fn suggest(&self, action_path: impl Into<String>) -> bool {
        self.send(&PluginMessage::suggestion(action_path))
    }
}

// =============================================================================
// Connection
// =============================================================================

/// An established connection: the sending half and the inbound stream.
pub struct Connection {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    inbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Connection {
    /// Wrap an accepted or connected WebSocket and start its pump task.
    pub fn from_websocket<S>(
        ws: WebSocketStream<S>,
        state_tx: watch::Sender<SessionState>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        // Detached; ends when the socket closes or every sender is dropped
        tokio::spawn(pump(ws, inbound_tx, outbound_rx, state_tx));

        Self { outbound, inbound }
    }

    /// An in-memory connection and the host end that drives it.
    pub fn loopback() -> (Self, LoopbackHost) {
        let (to_plugin, inbound) = mpsc::unbounded_channel();
        let (outbound, from_plugin) = mpsc::unbounded_channel();

        let connection = Self { outbound, inbound };
        let host = LoopbackHost {
            to_plugin: Some(to_plugin),
            from_plugin,
        };
        (connection, host)
    }

    /// Split into the sender and the inbound receiver.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<Vec<u8>>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        (self.outbound, self.inbound)
    }
}

async fn pump<S>(
    ws: WebSocketStream<S>,
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    mut outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    state_tx: watch::Sender<SessionState>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if inbound_tx.send(text.into_bytes()).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    if inbound_tx.send(data).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("Host closed the connection: {:?}", frame);
                    break;
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("Connection error: {}", e);
                    break;
                }
                None => break,
            },
            outgoing = outbound_rx.recv() => match outgoing {
                Some(bytes) => {
                    let message = match String::from_utf8(bytes) {
                        Ok(text) => Message::Text(text),
                        Err(e) => Message::Binary(e.into_bytes()),
                    };
                    if let Err(e) = sink.send(message).await {
                        tracing::warn!("Failed to send to host: {}", e);
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
        }
    }

    state_tx.send_replace(SessionState::Closed);
    tracing::info!("Connection to host closed");
}

// =============================================================================
// Loopback Host
// =============================================================================

/// Host end of [`Connection::loopback`].
pub struct LoopbackHost {
    to_plugin: Option<mpsc::UnboundedSender<Vec<u8>>>,
    from_plugin: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl LoopbackHost {
    /// Deliver a raw payload to the plugin.
    pub fn send_raw(&self, bytes: impl Into<Vec<u8>>) {
        if let Some(tx) = &self.to_plugin {
            let _ = tx.send(bytes.into());
        }
    }

    /// Deliver a JSON value to the plugin.
    pub fn send_json(&self, value: &serde_json::Value) {
        self.send_raw(value.to_string());
    }

    /// Next message from the plugin, or `None` once it disconnected.
    pub async fn recv(&mut self) -> Option<PluginMessage> {
        let bytes = self.from_plugin.recv().await?;
        match serde_json::from_slice(&bytes) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::error!("Plugin sent invalid JSON: {}", e);
                None
            }
        }
    }

    /// Close the plugin's inbound stream, as if the socket dropped.
    pub fn disconnect(&mut self) {
        self.to_plugin.take();
    }
}

// =============================================================================
// Session
// =============================================================================

/// Connects to the host at a fixed endpoint.
pub struct Session {
    endpoint: String,
    connect_timeout: Duration,
    state_tx: watch::Sender<SessionState>,
}

impl Session {
    /// Create a session for `endpoint`. Nothing happens until [`connect`](Self::connect).
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            state_tx,
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Connect once. Suspends until the host accepts or the attempt fails.
    ///
    /// # Errors
    ///
    /// [`SessionError::ConnectFailed`] if the host is unreachable, rejects
    /// the handshake, or does not answer within the connect timeout.
    pub async fn connect(&self) -> Result<Connection, SessionError> {
        self.state_tx.send_replace(SessionState::Connecting);
        tracing::info!("Connecting to {}", self.endpoint);

        let attempt = tokio::time::timeout(
            self.connect_timeout,
            tokio_tungstenite::connect_async(self.endpoint.as_str()),
        )
        .await;

        let ws = match attempt {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => return Err(self.fail(e.to_string())),
            Err(_) => {
                return Err(self.fail(format!("timed out after {:?}", self.connect_timeout)))
            }
        };

        self.state_tx.send_replace(SessionState::Connected);
        tracing::info!("Connected to {}", self.endpoint);
        Ok(Connection::from_websocket(ws, self.state_tx.clone()))
    }

    fn fail(&self, reason: String) -> SessionError {
        tracing::error!("connectFailed: {}", reason);
        self.state_tx
            .send_replace(SessionState::Failed(reason.clone()));
        SessionError::ConnectFailed {
            endpoint: self.endpoint.clone(),
            reason,
        }
    }
}
