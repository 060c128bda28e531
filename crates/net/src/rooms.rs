//! Room membership registry
//!
//! Tracks which connections have joined which group rooms and fans
//! server events out to every member. Shared between the relay's
//! connection handlers and the HTTP layer, which publishes a room
//! event after persisting a message.

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::protocol::ServerEvent;

#[derive(Default)]
struct Inner {
    /// Outbound channel per live connection
    connections: HashMap<Uuid, mpsc::Sender<ServerEvent>>,
    /// Room membership, keyed by group slug
    rooms: HashMap<String, HashSet<Uuid>>,
    /// Reverse index for cleanup on disconnect
    joined: HashMap<Uuid, HashSet<String>>,
}

/// Registry of rooms and the connections subscribed to them
#[derive(Default)]
pub struct RoomRegistry {
    inner: RwLock<Inner>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound channel
    pub async fn register(&self, conn_id: Uuid, tx: mpsc::Sender<ServerEvent>) {
        let mut inner = self.inner.write().await;
        inner.connections.insert(conn_id, tx);
    }

    /// Add a connection to a room
    pub async fn join(&self, conn_id: Uuid, group_url: &str) {
        let mut inner = self.inner.write().await;
        inner
            .rooms
            .entry(group_url.to_string())
            .or_default()
            .insert(conn_id);
        inner
            .joined
            .entry(conn_id)
            .or_default()
            .insert(group_url.to_string());
        debug!("Connection {} joined room {}", conn_id, group_url);
    }

    /// Remove a connection from a room
    pub async fn leave(&self, conn_id: Uuid, group_url: &str) {
        let mut inner = self.inner.write().await;
        let emptied = match inner.rooms.get_mut(group_url) {
            Some(members) => {
                members.remove(&conn_id);
                members.is_empty()
            }
            None => false,
        };
        if emptied {
            inner.rooms.remove(group_url);
        }
        if let Some(rooms) = inner.joined.get_mut(&conn_id) {
            rooms.remove(group_url);
        }
        debug!("Connection {} left room {}", conn_id, group_url);
    }

    /// Deliver an event to every member of a room, returning the number
    /// of connections it was queued for. Sends to connections that have
    /// gone away are dropped silently.
    pub async fn publish(&self, group_url: &str, event: ServerEvent) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(group_url) else {
            return 0;
        };

        let mut delivered = 0;
        for conn_id in members {
            if let Some(tx) = inner.connections.get(conn_id) {
                if tx.send(event.clone()).await.is_ok() {
                    delivered += 1;
                } else {
                    debug!("Dropping event for closed connection {}", conn_id);
                }
            }
        }
        delivered
    }

    /// Remove a connection from the registry and every room it joined
    pub async fn drop_connection(&self, conn_id: Uuid) {
        let mut inner = self.inner.write().await;
        inner.connections.remove(&conn_id);
        if let Some(rooms) = inner.joined.remove(&conn_id) {
            for room in rooms {
                let emptied = match inner.rooms.get_mut(&room) {
                    Some(members) => {
                        members.remove(&conn_id);
                        members.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    inner.rooms.remove(&room);
                }
            }
        }
        debug!("Connection {} dropped", conn_id);
    }

    /// Current member count of a room
    pub async fn room_size(&self, group_url: &str) -> usize {
        let inner = self.inner.read().await;
        inner.rooms.get(group_url).map(|m| m.len()).unwrap_or(0)
    }
}
