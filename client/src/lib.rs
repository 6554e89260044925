//! # Tilemeet Client Library
//!
//! Everything the windowed client needs: fetching the room, talking to the
//! server, tracking peers and chat, reading input and drawing the scene.
//!
//! ## Architecture Overview
//!
//! The client is built around a single owner of game state. The frame loop
//! runs on the macroquad executor and is the only code that mutates
//! [`game::GameState`]. The websocket lives on a tokio runtime inside
//! [`network::Connection`]; the two sides meet through channels.
//!
//! ### Local Authority Over Movement
//! Moves are validated locally against the room grid and committed at once.
//! An accepted move is broadcast as a `position` frame; a rejected move only
//! raises a short collision flag. There is no server round trip before the
//! player sees the result.
//!
//! ### Server-Side Adjacency
//! The client never computes who it stands next to. The server sends
//! `proximity` events and the client keeps a single slot for the adjacent
//! peer, which gates opening a chat.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The state owned by the frame loop:
//! - Committed local position and transient move/collision flags
//! - Peer positions, proximity slot and the open chat
//! - Dispatch of inbound frames and input events
//!
//! ### Network Module (`network`)
//! The session controller:
//! - Websocket connect, read and write on a tokio task
//! - Reconnect with exponential backoff
//! - Connection state published through a `watch` channel
//!
//! ### Presence, Proximity and Chat (`presence`, `proximity`, `chat`)
//! Small state holders for peers, the adjacency slot and one chat session.
//!
//! ### Input and Rendering (`input`, `rendering`)
//! Keyboard/mouse to [`input::InputEvent`], and macroquad drawing.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::game::GameState;
//! use client::network::{websocket_url, Connection, ReconnectPolicy};
//! use client::presence::PeerExpiry;
//! use client::room::fetch_room;
//! use reqwest::Url;
//! use shared::Identity;
//! use std::time::Instant;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let base = Url::parse("http://127.0.0.1:8080")?;
//! let identity = Identity::new("alice").ok_or("blank name")?;
//! let room = fetch_room(&base, "room1").await?;
//!
//! let url = websocket_url(&base, &identity)?;
//! let mut connection = Connection::open(
//!     &tokio::runtime::Handle::current(),
//!     url,
//!     ReconnectPolicy::default(),
//! );
//! let mut game = GameState::new(identity, room, connection.outbox(), PeerExpiry::Never);
//!
//! while let Some(inbound) = connection.next().await {
//!     game.handle_inbound(inbound, Instant::now());
//! }
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod flags;
pub mod game;
pub mod input;
pub mod network;
pub mod presence;
pub mod proximity;
pub mod rendering;
pub mod room;
