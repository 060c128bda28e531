//! TCP relay for realtime message fan-out
//!
//! Clients connect, join the rooms of the groups they are viewing, and
//! receive a `newMessage` event whenever someone posts to one of those
//! rooms. The relay carries traffic only; persistence lives elsewhere,
//! which publishes into the shared [`RoomRegistry`] after a write.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::WriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ClientEvent, ServerEvent};
use crate::rooms::RoomRegistry;

/// Relay server handle
pub struct Relay {
    addr: SocketAddr,
    rooms: Arc<RoomRegistry>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Relay {
    /// Start the relay on the given port (0 picks a free one)
    pub async fn start(port: u16, rooms: Arc<RoomRegistry>) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Relay started");

        let (shutdown_tx, _) = broadcast::channel(1);

        let rooms_clone = rooms.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(listener, rooms_clone, shutdown_rx));

        Ok(Relay {
            addr: bound_addr,
            rooms,
            shutdown_tx,
        })
    }

    /// Get the relay's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the shared room registry
    pub fn rooms(&self) -> Arc<RoomRegistry> {
        self.rooms.clone()
    }

    /// Shutdown the relay
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        info!("Relay shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    rooms: Arc<RoomRegistry>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        let rooms = rooms.clone();
                        tokio::spawn(handle_connection(stream, addr, rooms));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(stream: TcpStream, addr: SocketAddr, rooms: Arc<RoomRegistry>) {
    let conn_id = Uuid::new_v4();
    let (mut reader, writer) = tokio::io::split(stream);

    // Spawn writer task
    let (event_tx, event_rx) = mpsc::channel(64);
    rooms.register(conn_id, event_tx).await;
    let writer_handle = tokio::spawn(writer_task(writer, event_rx));

    info!(addr = %addr, conn_id = %conn_id, "Client connected");

    // Read loop
    loop {
        match read_frame(&mut reader).await {
            Ok(event) => {
                handle_event(event, conn_id, &rooms).await;
            }
            Err(Error::ConnectionClosed) => {
                debug!(conn_id = %conn_id, "Connection closed");
                break;
            }
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "Read error");
                break;
            }
        }
    }

    // Cleanup
    writer_handle.abort();
    rooms.drop_connection(conn_id).await;

    info!(conn_id = %conn_id, "Client disconnected");
}

/// Writer task - sends events to the client
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<ServerEvent>) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &event).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

/// Handle an incoming client event
async fn handle_event(event: ClientEvent, conn_id: Uuid, rooms: &Arc<RoomRegistry>) {
    match event {
        ClientEvent::JoinGroup { group_url } => {
            rooms.join(conn_id, &group_url).await;
        }
        ClientEvent::LeaveGroup { group_url } => {
            rooms.leave(conn_id, &group_url).await;
        }
        ClientEvent::SendMessage { group_url, message } => {
            // Fan out to the whole room, the sender included
            let delivered = rooms
                .publish(&group_url, ServerEvent::NewMessage { message })
                .await;
            debug!(
                conn_id = %conn_id,
                group_url = %group_url,
                delivered = delivered,
                "Message relayed"
            );
        }
    }
}
