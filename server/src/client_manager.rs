//! Client connection management for the game server
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Client connection lifecycle (connect, register, disconnect, timeout)
//! - Mapping registered player names to connections for targeted delivery
//! - Connection health monitoring and automatic cleanup
//! - Client capacity management
//!
//! The manager never touches the game state; it only knows who is
//! connected and how to reach them.

use log::info;
use shared::DELIMITER;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Represents a connected client
///
/// Each client maintains:
/// - Connection metadata (ID, address, last activity)
/// - The player name it registered, once it has done so
/// - The queue its writer task drains into the socket
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Remote address of the connection
    pub addr: SocketAddr,
    /// Player name, set by `RGST`
    pub name: Option<String>,
    /// Lines queued for this client's socket
    pub sender: mpsc::UnboundedSender<String>,
    /// Last time we received any line from this client
    pub last_seen: Instant,
}

impl Client {
    /// Creates a new, unregistered client marked as recently active
    pub fn new(id: u32, addr: SocketAddr, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            addr,
            name: None,
            sender,
            last_seen: Instant::now(),
        }
    }

    /// Queues a line for delivery; false once the writer task is gone
    pub fn send(&self, line: &str) -> bool {
        self.sender.send(line.to_string()).is_ok()
    }

    /// Checks if the client has exceeded the connection timeout
    ///
    /// Returns true if no line has been received from this client within
    /// the given duration, indicating a likely dead connection.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Why a registration was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    UnknownClient,
    InvalidName,
    NameTaken,
}

/// Manages all connected clients
///
/// The ClientManager provides centralized control over client connections
/// and enforces the server's capacity limit. Player names are unique among
/// connected clients so that outbound messages can be routed by name.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
    /// Silence after which a client is dropped
    timeout: Duration,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit
    ///
    /// Client IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if the server is at
    /// capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<String>,
    ) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender));
        Some(client_id)
    }

    /// Removes a client from the server
    ///
    /// Returns the removed client so callers can see which player left.
    pub fn remove_client(&mut self, client_id: u32) -> Option<Client> {
        let client = self.clients.remove(&client_id)?;
        info!(
            "Client {} ({}) disconnected",
            client.id,
            client.name.as_deref().unwrap_or("unregistered")
        );
        Some(client)
    }

    /// Binds a player name to a connection
    ///
    /// Names must be non-empty, free of the protocol delimiter and not in
    /// use by another connected client. Re-registering renames the client.
    pub fn register(&mut self, client_id: u32, name: &str) -> Result<(), RegisterError> {
        let name = name.trim();
        if name.is_empty() || name.contains(DELIMITER) {
            return Err(RegisterError::InvalidName);
        }
        if self
            .clients
            .values()
            .any(|c| c.id != client_id && c.name.as_deref() == Some(name))
        {
            return Err(RegisterError::NameTaken);
        }
        let client = self
            .clients
            .get_mut(&client_id)
            .ok_or(RegisterError::UnknownClient)?;
        info!("Client {} registered as {}", client_id, name);
        client.name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, client_id: u32) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Finds the client that registered under `name`
    pub fn find_by_name(&self, name: &str) -> Option<&Client> {
        self.clients
            .values()
            .find(|c| c.name.as_deref() == Some(name))
    }

    /// Registered player names in connection order
    pub fn names(&self) -> Vec<String> {
        let mut registered: Vec<&Client> =
            self.clients.values().filter(|c| c.name.is_some()).collect();
        registered.sort_by_key(|c| c.id);
        registered
            .into_iter()
            .filter_map(|c| c.name.clone())
            .collect()
    }

    /// Marks the client as alive
    pub fn touch(&mut self, client_id: u32) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Queues a line for every connected client
    pub fn broadcast(&self, line: &str) {
        for client in self.clients.values() {
            client.send(line);
        }
    }

    /// Checks for and removes timed-out clients
    ///
    /// Returns the removed clients so their players can be reported.
    pub fn check_timeouts(&mut self) -> Vec<Client> {
        let timed_out: Vec<u32> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(self.timeout))
            .map(|client| client.id)
            .collect();

        timed_out
            .into_iter()
            .filter_map(|id| self.remove_client(id))
            .collect()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
