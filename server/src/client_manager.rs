//! Connected websocket clients, keyed by username
//!
//! This module tracks who is connected and how to reach them:
//! - Admission of new connections with a capacity limit
//! - Replacement of a stale connection when a username reconnects
//! - Routing of encoded frames to one client or to everyone
//!
//! Every connection carries a server-assigned id. Cleanup for a connection
//! only applies while that id is still the current one for its username, so
//! a replaced socket closing late cannot evict its successor.

use log::info;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc;

/// A connected client and the channel feeding its websocket writer
#[derive(Debug)]
pub struct Client {
    /// Username given in the websocket query string
    pub username: String,
    /// Server-assigned id of the live connection
    pub connection_id: u64,
    /// When the connection was admitted
    pub connected_at: Instant,
    sender: mpsc::UnboundedSender<String>,
}

impl Client {
    pub fn new(username: &str, connection_id: u64, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            username: username.to_string(),
            connection_id,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a frame for the writer task. Returns false if the writer is gone.
    pub fn send(&self, frame: &str) -> bool {
        self.sender.send(frame.to_string()).is_ok()
    }
}

/// Result of admitting a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// An older connection for the same username was dropped
    Replaced,
    Full,
}

/// Registry of every connected client
pub struct ClientManager {
    clients: HashMap<String, Client>,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    /// Admits a connection, replacing any previous one for the same username
    ///
    /// Dropping the replaced client drops its sender, which ends its writer
    /// task and closes the old socket.
    pub fn add_client(
        &mut self,
        username: &str,
        connection_id: u64,
        sender: mpsc::UnboundedSender<String>,
    ) -> Admission {
        let client = Client::new(username, connection_id, sender);

        if let Some(previous) = self.clients.insert(username.to_string(), client) {
            info!(
                "Client {} reconnected, replacing connection {}",
                username, previous.connection_id
            );
            return Admission::Replaced;
        }

        if self.clients.len() > self.max_clients {
            self.clients.remove(username);
            return Admission::Full;
        }

        info!("Client {} connected (connection {})", username, connection_id);
        Admission::Accepted
    }

    /// Removes a client if `connection_id` is still its live connection
    pub fn remove_client(&mut self, username: &str, connection_id: u64) -> bool {
        if !self.is_current(username, connection_id) {
            return false;
        }

        if let Some(client) = self.clients.remove(username) {
            info!(
                "Client {} disconnected after {:.1}s",
                client.username,
                client.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    pub fn is_current(&self, username: &str, connection_id: u64) -> bool {
        self.clients
            .get(username)
            .is_some_and(|client| client.connection_id == connection_id)
    }

    /// Sends a frame to one client. Returns false if it is not connected.
    pub fn send_to(&self, username: &str, frame: &str) -> bool {
        self.clients
            .get(username)
            .is_some_and(|client| client.send(frame))
    }

    /// Sends a frame to every client and returns how many accepted it
    pub fn broadcast(&self, frame: &str) -> usize {
        self.clients
            .values()
            .filter(|client| client.send(frame))
            .count()
    }

    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
