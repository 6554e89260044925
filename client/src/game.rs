use crate::chat::ChatSession;
use crate::flags::TransientFlag;
use crate::input::InputEvent;
use crate::network::{ConnectionState, Inbound, Outbox};
use crate::presence::{PeerExpiry, PeerMap};
use crate::proximity::{ProximityChange, ProximityDetector};
use chrono::Local;
use log::{debug, info};
use shared::{
    validate_move, Direction, Identity, MoveOutcome, Position, ProximityAction, Room,
    WireMessage, COLLISION_FLAG_MS, MOVE_FLAG_MS,
};
use std::time::{Duration, Instant};

/// Everything the local player sees, owned by the frame loop
pub struct GameState {
    identity: Identity,
    room: Room,
    position: Position,
    moved: TransientFlag,
    collided: TransientFlag,
    peers: PeerMap,
    proximity: ProximityDetector,
    chat: Option<ChatSession>,
    outbox: Outbox,
    connection: ConnectionState,
}

impl GameState {
    pub fn new(identity: Identity, room: Room, outbox: Outbox, expiry: PeerExpiry) -> Self {
        let position = room.spawn();
        let connection = outbox.state();

        Self {
            identity,
            room,
            position,
            moved: TransientFlag::new(Duration::from_millis(MOVE_FLAG_MS)),
            collided: TransientFlag::new(Duration::from_millis(COLLISION_FLAG_MS)),
            peers: PeerMap::new(expiry),
            proximity: ProximityDetector::new(),
            chat: None,
            outbox,
            connection,
        }
    }

    /// Validates one step against the committed position.
    ///
    /// An accepted step is committed and broadcast right away; a rejected one
    /// only raises the collision flag.
    pub fn try_move(&mut self, direction: Direction, now: Instant) -> MoveOutcome {
        let outcome = validate_move(&self.room, self.position, direction);

        match outcome {
            MoveOutcome::Accepted(target) => {
                self.position = target;
                self.moved.raise(now);
                self.outbox
                    .send(WireMessage::position(&self.identity, target));
            }
            MoveOutcome::Rejected(reason) => {
                debug!("Move {:?} rejected: {:?}", direction, reason);
                self.collided.raise(now);
            }
        }

        outcome
    }

    /// Opens a chat with whoever is adjacent. No-op with an empty slot or a
    /// chat already open.
    pub fn open_chat(&mut self) -> bool {
        if self.chat.is_some() {
            return false;
        }
        let Some(recipient) = self.proximity.adjacent() else {
            return false;
        };

        info!("Opening chat with {}", recipient);
        self.chat = Some(ChatSession::open(recipient, Local::now()));
        true
    }

    pub fn close_chat(&mut self) -> bool {
        match self.chat.take() {
            Some(session) => {
                info!("Closed chat with {}", session.recipient());
                true
            }
            None => false,
        }
    }

    pub fn send_chat(&mut self, text: &str) -> bool {
        let Some(session) = self.chat.as_mut() else {
            return false;
        };

        match session.compose(&self.identity, text, Local::now()) {
            Some(frame) => {
                self.outbox.send(frame);
                true
            }
            None => false,
        }
    }

    pub fn apply_input(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::Move(direction) => {
                self.try_move(direction, now);
            }
            InputEvent::OpenChat => {
                self.open_chat();
            }
            InputEvent::CloseChat | InputEvent::Cancel => {
                self.close_chat();
            }
            InputEvent::Submit(text) => {
                self.send_chat(&text);
            }
        }
    }

    pub fn handle_inbound(&mut self, inbound: Inbound, now: Instant) {
        match inbound {
            Inbound::Message(message) => self.handle_message(message, now),
            Inbound::State(state) => self.handle_state(state),
        }
    }

    fn handle_message(&mut self, message: WireMessage, now: Instant) {
        match message {
            WireMessage::Position { username, row, col } => {
                self.peers
                    .apply(&self.identity, &username, Position::new(row, col), now);
            }
            WireMessage::Proximity {
                username,
                target,
                action,
            } => {
                match self
                    .proximity
                    .handle(&self.identity, &username, &target, action)
                {
                    ProximityChange::Approached(peer) => debug!("{} is next to us", peer),
                    ProximityChange::Left(peer) => debug!("{} moved away", peer),
                    ProximityChange::Unchanged => {}
                }

                // Closes even when the slot already moved on to someone else.
                let leaving = action == ProximityAction::Leave && self.identity == target;
                if leaving && self.chat_recipient() == Some(username.as_str()) {
                    self.close_chat();
                }
            }
            WireMessage::Chat {
                message, sender, ..
            } => {
                let accepted = self
                    .chat
                    .as_mut()
                    .is_some_and(|session| session.receive(&sender, &message, Local::now()));
                if !accepted {
                    debug!("Ignoring chat from {}", sender);
                }
            }
        }
    }

    fn handle_state(&mut self, state: ConnectionState) {
        self.connection = state;

        match state {
            ConnectionState::Connected => {
                self.outbox
                    .send(WireMessage::position(&self.identity, self.position));
            }
            ConnectionState::Disconnected | ConnectionState::Closed => {
                // The server forgets our adjacency when the socket drops.
                self.proximity.clear();
                self.close_chat();
            }
            ConnectionState::Connecting => {}
        }
    }

    pub fn expire_peers(&mut self, now: Instant) -> Vec<String> {
        let expired = self.peers.expire(now);
        for name in &expired {
            info!("Peer {} timed out", name);
        }
        expired
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_moving(&self, now: Instant) -> bool {
        self.moved.is_active(now)
    }

    pub fn is_colliding(&self, now: Instant) -> bool {
        self.collided.is_active(now)
    }

    pub fn peers(&self) -> &PeerMap {
        &self.peers
    }

    pub fn adjacent(&self) -> Option<&str> {
        self.proximity.adjacent()
    }

    pub fn chat(&self) -> Option<&ChatSession> {
        self.chat.as_ref()
    }

    pub fn chat_recipient(&self) -> Option<&str> {
        self.chat.as_ref().map(ChatSession::recipient)
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }
}
