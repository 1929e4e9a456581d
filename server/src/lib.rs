//! # Game Server Library
//!
//! This library provides the authoritative server for Yggdrasil, a turn-based
//! board game for two to four players set across the nine Norse worlds. It
//! owns the canonical game state, validates every client request against the
//! rules and broadcasts the resulting state to all connected clients.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Rules
//! All game decisions are made here. Clients send requests (`BUYT$0$0`) and
//! receive either an `OK$...` echo or an `ERR$...` line; they never change
//! state on their own.
//!
//! ### Client Management
//! Handles the lifecycle of TCP connections:
//! - Connection establishment and name registration
//! - Lobby handshake (start and end of a game)
//! - Disconnection and timeout cleanup
//!
//! ### State Broadcasting
//! After every accepted action the full state snapshot (`SYNC$...`) is sent
//! to every client, so a client can always rebuild its view from the last
//! line it received.
//!
//! ## Architecture Design
//!
//! ### Reader/Writer Lock
//! The game state lives behind a single `tokio::sync::RwLock` owned by the
//! [`dispatcher::Dispatcher`]. Snapshot queries share the read guard; every
//! action holds the write guard for its whole validate-then-mutate sequence.
//! The guard is downgraded to render and enqueue the snapshot, then
//! released. Socket writes happen later on the sender task.
//!
//! ### Validate Before Mutate
//! Every action checks target, ownership and resources before touching
//! anything. A rejected action leaves the state exactly as it found it.
//!
//! ### Line Protocol
//! Messages are `$`-delimited lines with a four-letter tag followed by a
//! fixed number of arguments per tag.
//!
//! ## Module Organization
//!
//! ### Domain (`board`, `player`, `entity`, `status`, `catalog`)
//! The mutable state graph: tiles, players, the structures, statues and
//! monuments that stand on tiles, artifacts, and the buff profile shared by
//! players and tiles. Entity definitions are data, loaded from JSON.
//!
//! ### Rules (`game`, `turn`, `actions`)
//! The aggregate root, turn rotation with upkeep and income, and one
//! executor per player action.
//!
//! ### Service (`dispatcher`, `snapshot`, `session`)
//! Request routing and locking, snapshot rendering, and the outbound queue.
//!
//! ### Transport (`network`, `client_manager`)
//! Tokio TCP server, per-connection tasks and client bookkeeping.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::catalog::Catalog;
//! use server::config::GameConfig;
//! use server::network::Server;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Arc::new(Catalog::embedded()?);
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         16,
//!         Duration::from_secs(30),
//!         GameConfig::default(),
//!         catalog,
//!     )
//!     .await?;
//!
//!     // Accepts connections and serves games until the listener fails
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod board;
pub mod catalog;
pub mod client_manager;
pub mod config;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod game;
pub mod network;
pub mod player;
pub mod session;
pub mod snapshot;
pub mod status;
pub mod turn;
