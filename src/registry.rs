//! Registry of live dashboard connections and their guild subscriptions
//!
//! Owned by `AppState` for the lifetime of the process. Connections are
//! inserted after authentication, removed when their socket closes, and
//! the whole set is drained at shutdown. A guild has no representation of
//! its own here; it is purely a grouping key over connections.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};

use crate::auth::Principal;
use crate::protocol::ServerMessage;
use crate::types::{ConnectionId, GuildId};

/// Outbound handle for one live connection.
///
/// `tx` feeds the connection's write loop; dropping it ends that loop and
/// closes the socket.
struct ConnectionEntry {
    principal: Principal,
    guild: Option<GuildId>,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

/// All open dashboard connections, keyed by connection ID
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register an authenticated connection. The connection starts without
    /// a guild subscription and matches no broadcasts until it subscribes.
    pub async fn insert(
        &self,
        principal: Principal,
        tx: mpsc::UnboundedSender<ServerMessage>,
    ) -> ConnectionId {
        let id = ulid::Ulid::new().to_string();
        let mut connections = self.connections.write().await;
        tracing::debug!(connection = %id, user = %principal.user_id, "connection registered");
        connections.insert(
            id.clone(),
            ConnectionEntry {
                principal,
                guild: None,
                tx,
            },
        );
        id
    }

    /// Set the connection's guild subscription, replacing any previous one.
    ///
    /// A connection watches at most one guild; resubscribing moves it.
    /// Unknown connection IDs are ignored (the socket already closed).
    pub async fn subscribe(&self, connection_id: &str, guild_id: GuildId) {
        let mut connections = self.connections.write().await;
        if let Some(entry) = connections.get_mut(connection_id) {
            tracing::debug!(
                connection = %connection_id,
                user = %entry.principal.user_id,
                guild = %guild_id,
                "subscription set"
            );
            entry.guild = Some(guild_id);
        }
    }

    /// Deliver an event to every open connection subscribed to `guild_id`.
    ///
    /// Best-effort: a connection whose write loop has already ended simply
    /// misses the event. Returns how many connections the event was handed
    /// to, for logging only; the caller makes no delivery promise.
    pub async fn broadcast(&self, guild_id: &str, msg: &ServerMessage) -> usize {
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for entry in connections.values() {
            if entry.guild.as_deref() != Some(guild_id) {
                continue;
            }
            if entry.tx.send(msg.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Remove a closed connection. Its subscription disappears with it.
    pub async fn remove(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        if connections.remove(connection_id).is_some() {
            tracing::debug!(connection = %connection_id, "connection removed");
        }
    }

    /// Drop every connection, ending each socket's write loop. Used at
    /// shutdown.
    pub async fn drain(&self) {
        let mut connections = self.connections.write().await;
        let count = connections.len();
        connections.clear();
        if count > 0 {
            tracing::info!(count, "closed all live connections");
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
