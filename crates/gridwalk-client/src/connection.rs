//! Network layer for the client application.
//!
//! Architecture:
//! - `ClientConnection` owns the write half of the TCP stream.
//! - A background task drives the read loop and forwards decoded messages as
//!   [`ClientEvent`]s on an `mpsc` channel.
//! - Outbound requests (START, QUIT) are sent through the connection.
//!
//! A failed connect or handshake leaves the connection unused; the caller
//! can simply retry. A disconnect mid-run surfaces as
//! [`ClientEvent::Disconnected`] and returns the connection to the
//! not-connected state.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use gridwalk_core::{
    recv_message, send_message, MessageType, SimulationParameters, StateUpdate, WalkMessage,
    WireError,
};

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP connection to the server failed.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The wire protocol failed while sending or receiving.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The server answered the handshake with something other than HELLO_ACK.
    #[error("unexpected handshake reply: {0:?}")]
    UnexpectedHandshakeReply(MessageType),

    /// A request was made while not connected.
    #[error("not connected to a server")]
    NotConnected,
}

/// Configuration for the client's connection.
#[derive(Debug, Clone)]
pub struct ClientConnectionConfig {
    /// `host:port` of the server.
    pub server_addr: String,
    /// Short greeting text carried in the HELLO message.
    pub client_name: String,
}

impl Default for ClientConnectionConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5555".to_string(),
            client_name: "gridwalk-client".to_string(),
        }
    }
}

/// Events delivered by the read loop to the application layer.
#[derive(Debug, PartialEq)]
pub enum ClientEvent {
    /// One walk step of the running simulation.
    State(StateUpdate),
    /// The current run finished.
    Done,
    /// The connection was lost or closed.
    Disconnected,
}

/// Manages the connection from the client to the simulation server.
pub struct ClientConnection {
    config: ClientConnectionConfig,
    write_half: Arc<Mutex<Option<OwnedWriteHalf>>>,
}

impl ClientConnection {
    /// Creates a new (not yet connected) `ClientConnection`.
    pub fn new(config: ClientConnectionConfig) -> Self {
        Self {
            config,
            write_half: Arc::new(Mutex::new(None)),
        }
    }

    /// True while a connection is established.
    pub async fn is_connected(&self) -> bool {
        self.write_half.lock().await.is_some()
    }

    /// Connects to the server and performs the HELLO / HELLO_ACK handshake.
    ///
    /// On success the read loop starts in the background and the returned
    /// receiver delivers [`ClientEvent`]s until disconnect.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectFailed`] if the TCP connect fails,
    /// [`ClientError::Wire`] for transport or protocol failures during the
    /// handshake, and [`ClientError::UnexpectedHandshakeReply`] if the first
    /// server message is not HELLO_ACK.
    pub async fn connect(&self) -> Result<mpsc::Receiver<ClientEvent>, ClientError> {
        let stream = TcpStream::connect(&self.config.server_addr)
            .await
            .map_err(|source| ClientError::ConnectFailed {
                addr: self.config.server_addr.clone(),
                source,
            })?;
        let (mut reader, mut writer) = stream.into_split();

        send_message(
            &mut writer,
            &WalkMessage::Hello(self.config.client_name.clone()),
        )
        .await?;
        match recv_message(&mut reader).await? {
            WalkMessage::HelloAck => {}
            other => {
                return Err(ClientError::UnexpectedHandshakeReply(other.message_type()));
            }
        }
        info!("connected to server at {}", self.config.server_addr);

        {
            let mut guard = self.write_half.lock().await;
            *guard = Some(writer);
        }

        let (tx, rx) = mpsc::channel(128);
        let write_half = Arc::clone(&self.write_half);
        tokio::spawn(async move {
            read_loop(reader, &tx).await;
            // Drop our write half so the server sees the close promptly.
            write_half.lock().await.take();
            let _ = tx.send(ClientEvent::Disconnected).await;
        });

        Ok(rx)
    }

    /// Requests a simulation run.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if there is no live connection,
    /// or [`ClientError::Wire`] if the send fails.
    pub async fn send_start(&self, params: SimulationParameters) -> Result<(), ClientError> {
        self.send(&WalkMessage::Start(params)).await
    }

    /// Asks the server to shut down, then drops this side of the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if there is no live connection,
    /// or [`ClientError::Wire`] if the send fails.
    pub async fn send_quit(&self) -> Result<(), ClientError> {
        self.send(&WalkMessage::Quit).await?;
        self.write_half.lock().await.take();
        Ok(())
    }

    async fn send(&self, msg: &WalkMessage) -> Result<(), ClientError> {
        let mut guard = self.write_half.lock().await;
        match guard.as_mut() {
            Some(writer) => {
                send_message(writer, msg).await?;
                Ok(())
            }
            None => Err(ClientError::NotConnected),
        }
    }
}

/// Reads messages until the stream ends and forwards them as events.
async fn read_loop(mut reader: OwnedReadHalf, tx: &mpsc::Sender<ClientEvent>) {
    loop {
        match recv_message(&mut reader).await {
            Ok(WalkMessage::State(update)) => {
                if tx.send(ClientEvent::State(update)).await.is_err() {
                    return;
                }
            }
            Ok(WalkMessage::Done) => {
                if tx.send(ClientEvent::Done).await.is_err() {
                    return;
                }
            }
            Ok(other) => {
                debug!("ignoring unexpected {:?} from server", other.message_type());
            }
            Err(e) => {
                if !e.is_disconnect() {
                    warn!("protocol error from server: {e}");
                }
                return;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
