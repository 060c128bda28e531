//! TCP client for the relay

use std::net::SocketAddr;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ChatPayload, ClientEvent, ServerEvent};

/// Client handle for the relay
pub struct RelayClient {
    event_rx: mpsc::Receiver<ServerEvent>,
    cmd_tx: mpsc::Sender<ClientCommand>,
}

enum ClientCommand {
    Send(ClientEvent),
    Disconnect,
}

impl RelayClient {
    /// Connect to a relay
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to relay");

        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = tokio::io::split(stream);

        let (event_tx, event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);

        tokio::spawn(connection_task(reader, writer, event_tx, cmd_rx));

        Ok(RelayClient { event_rx, cmd_tx })
    }

    /// Subscribe to a group's room
    pub async fn join_group(&self, group_url: &str) -> Result<()> {
        self.send(ClientEvent::JoinGroup {
            group_url: group_url.to_string(),
        })
        .await
    }

    /// Unsubscribe from a group's room
    pub async fn leave_group(&self, group_url: &str) -> Result<()> {
        self.send(ClientEvent::LeaveGroup {
            group_url: group_url.to_string(),
        })
        .await
    }

    /// Relay a message to a group's room
    pub async fn send_message(&self, group_url: &str, message: ChatPayload) -> Result<()> {
        self.send(ClientEvent::SendMessage {
            group_url: group_url.to_string(),
            message,
        })
        .await
    }

    /// Get the next server event
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.event_rx.recv().await
    }

    /// Disconnect from the relay
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect).await;
    }

    async fn send(&self, event: ClientEvent) -> Result<()> {
        self.cmd_tx
            .send(ClientCommand::Send(event))
            .await
            .map_err(|_| Error::NotConnected)
    }
}

/// Main connection task
async fn connection_task(
    mut reader: ReadHalf<TcpStream>,
    mut writer: WriteHalf<TcpStream>,
    event_tx: mpsc::Sender<ServerEvent>,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
) {
    loop {
        tokio::select! {
            // Incoming event from the relay
            result = read_frame(&mut reader) => {
                match result {
                    Ok(event) => {
                        if event_tx.send(event).await.is_err() {
                            debug!("Event receiver dropped");
                            break;
                        }
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!("Relay closed connection");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Read error");
                        break;
                    }
                }
            }

            // Outgoing command
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Send(event)) => {
                        if let Err(e) = write_frame(&mut writer, &event).await {
                            warn!(error = %e, "Write error");
                            break;
                        }
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        debug!("Disconnect requested");
                        break;
                    }
                }
            }
        }
    }

    info!("Disconnected from relay");
}
