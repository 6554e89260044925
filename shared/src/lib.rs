//! Types and rules shared by the tilemeet client and server.
//!
//! Both sides agree on three things: what a room looks like once loaded
//! ([`grid`]), which steps a player may take inside it ([`movement`]), and
//! the JSON frames exchanged over the websocket ([`protocol`]).

pub mod grid;
pub mod movement;
pub mod protocol;

pub use grid::{GridError, House, Room, Tile, HOUSE_SIZE};
pub use movement::{validate_move, Direction, MoveOutcome, Position, Rejection};
pub use protocol::{decode, encode, Identity, ProtocolError, ProximityAction, WireMessage};

/// Room served when a client does not ask for a specific one.
pub const DEFAULT_ROOM_ID: &str = "room1";

/// Time the collision flag stays raised after a rejected move.
pub const COLLISION_FLAG_MS: u64 = 300;

/// Time the move flag stays raised after an accepted move.
pub const MOVE_FLAG_MS: u64 = 200;

/// Longest chat line the input surface accepts, in characters.
pub const MAX_CHAT_CHARS: usize = 50;
