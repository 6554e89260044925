//! # Tilemeet Server Library
//!
//! This library provides the server side of tilemeet: the room endpoint,
//! the websocket relay that keeps every client's view of its peers up to
//! date, and the authority that decides when two players stand next to each
//! other.
//!
//! ## Core Responsibilities
//!
//! ### Room Distribution
//! Rooms are served as JSON arrays of equal-length strings from
//! `GET /api/room/{room_id}`. Every room is validated with the shared grid
//! loader before it is served, so a client never receives a grid it cannot
//! load.
//!
//! ### Position Relay
//! Each `position` frame a client sends is stored and broadcast to every
//! connected client, the sender included. Clients drop their own echo.
//!
//! ### Proximity Authority
//! The server is the only party that compares positions. When two players
//! become orthogonally adjacent it broadcasts a pair of `approach` events,
//! one targeting each of them; when they separate, or one of them
//! disconnects, it broadcasts `leave` events. Clients only react to events
//! that target them.
//!
//! ### Chat Routing
//! `chat` frames are delivered to their recipient only. The server does not
//! check adjacency for chat; that gate lives in the client's chat session.
//!
//! ## Architecture Design
//!
//! ### Single Server Loop
//! Every websocket gets its own reader and writer task, but all of them talk
//! to one loop through an unbounded channel. The loop owns the client
//! registry and the world, so frames are handled strictly in arrival order
//! and no state is shared between tasks.
//!
//! ### Identity
//! A connection is keyed by the `username` query parameter given when the
//! socket is opened. Frames claiming another identity are dropped. A second
//! connection with the same username replaces the first.
//!
//! ## Module Organization
//!
//! - `client_manager`: connected clients, admission and frame routing
//! - `game`: last known positions and adjacency transitions
//! - `network`: axum router, websocket tasks and the server loop
//! - `rooms`: the room store behind the room endpoint
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::rooms::RoomStore;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let server = Server::new(64, RoomStore::with_default_room());
//!
//!     // Serves /api/room/{room_id} and /ws?username=... until the
//!     // listener fails.
//!     server.run(listener).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
pub mod rooms;
