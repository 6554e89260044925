//! Server network layer: HTTP/websocket endpoints and the single server loop

use crate::client_manager::{Admission, ClientManager};
use crate::game::World;
use crate::rooms::RoomStore;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use shared::{decode, encode, Position, WireMessage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Messages sent from connection tasks to the server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        username: String,
        connection_id: u64,
        sender: mpsc::UnboundedSender<String>,
    },
    FrameReceived {
        username: String,
        connection_id: u64,
        frame: String,
    },
    Disconnected {
        username: String,
        connection_id: u64,
    },
}

#[derive(Clone)]
struct AppState {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    rooms: Arc<RoomStore>,
    next_connection_id: Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    username: Option<String>,
}

/// Owns the client registry and the world; every frame passes through here
pub struct Server {
    clients: ClientManager,
    world: World,
    rooms: Arc<RoomStore>,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub fn new(max_clients: usize, rooms: RoomStore) -> Self {
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Server {
            clients: ClientManager::new(max_clients),
            world: World::new(),
            rooms: Arc::new(rooms),
            server_tx,
            server_rx,
        }
    }

    fn router(&self) -> Router {
        let state = AppState {
            server_tx: self.server_tx.clone(),
            rooms: Arc::clone(&self.rooms),
            next_connection_id: Arc::new(AtomicU64::new(1)),
        };

        Router::new()
            .route("/api/room/{room_id}", get(get_room))
            .route("/ws", get(connect))
            .with_state(state)
    }

    /// Serves HTTP on `listener` and runs the server loop until serving stops
    pub async fn run(mut self, listener: TcpListener) -> std::io::Result<()> {
        let app = self.router();
        if let Ok(addr) = listener.local_addr() {
            info!("Server listening on {}", addr);
        }

        let mut serve = tokio::spawn(async move { axum::serve(listener, app).await });

        loop {
            tokio::select! {
                result = &mut serve => {
                    return match result {
                        Ok(result) => result,
                        Err(e) => Err(std::io::Error::other(e)),
                    };
                }

                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => self.handle_message(message),
                        None => {
                            info!("Server shutting down");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Connected {
                username,
                connection_id,
                sender,
            } => match self.clients.add_client(&username, connection_id, sender) {
                Admission::Accepted => {
                    debug!("{} clients online", self.clients.len());
                }
                Admission::Replaced => {
                    // The new session starts from a clean slate and announces itself.
                    info!("{} reconnected as connection {}", username, connection_id);
                    let events = self.world.remove_player(&username);
                    self.broadcast_all(&events);
                }
                Admission::Full => {
                    warn!("Server full, refusing {}", username);
                }
            },

            ServerMessage::FrameReceived {
                username,
                connection_id,
                frame,
            } => {
                if !self.clients.is_current(&username, connection_id) {
                    debug!("Ignoring frame from stale connection {}", connection_id);
                    return;
                }

                match decode(&frame) {
                    Ok(message) => self.handle_wire_message(&username, message),
                    Err(e) => warn!("Dropping frame from {}: {}", username, e),
                }
            }

            ServerMessage::Disconnected {
                username,
                connection_id,
            } => {
                if self.clients.remove_client(&username, connection_id) {
                    let events = self.world.remove_player(&username);
                    self.broadcast_all(&events);
                }
            }
        }
    }

    fn handle_wire_message(&mut self, from: &str, message: WireMessage) {
        match message {
            WireMessage::Position { username, row, col } => {
                if username != from {
                    warn!("{} sent a position for {}, dropping", from, username);
                    return;
                }

                let events = self.world.update_position(from, Position::new(row, col));
                for event in &events {
                    if let WireMessage::Proximity {
                        username,
                        target,
                        action,
                    } = event
                    {
                        debug!("{} {:?} {}", username, action, target);
                    }
                }
                self.broadcast_all(&events);
                self.broadcast(&WireMessage::Position { username, row, col });
            }

            WireMessage::Chat {
                recipient,
                message,
                sender,
            } => {
                if sender != from {
                    warn!("{} sent a chat as {}, dropping", from, sender);
                    return;
                }

                let frame = match encode(&WireMessage::Chat {
                    recipient: recipient.clone(),
                    message,
                    sender,
                }) {
                    Ok(frame) => frame,
                    Err(e) => {
                        error!("Failed to encode chat: {}", e);
                        return;
                    }
                };
                if !self.clients.send_to(&recipient, &frame) {
                    debug!("Chat recipient {} is not connected", recipient);
                }
            }

            WireMessage::Proximity { .. } => {
                warn!("{} sent a proximity event, dropping", from);
            }
        }
    }

    fn broadcast_all(&self, messages: &[WireMessage]) {
        for message in messages {
            self.broadcast(message);
        }
    }

    fn broadcast(&self, message: &WireMessage) {
        match encode(message) {
            Ok(frame) => {
                self.clients.broadcast(&frame);
            }
            Err(e) => error!("Failed to encode {} frame: {}", message.tag(), e),
        }
    }
}

async fn get_room(State(state): State<AppState>, Path(room_id): Path<String>) -> Response {
    match state.rooms.get(&room_id) {
        Some(rows) => Json(rows.to_vec()).into_response(),
        None => (StatusCode::NOT_FOUND, format!("unknown room {}", room_id)).into_response(),
    }
}

async fn connect(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let Some(username) = params.username.filter(|name| !name.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "username required").into_response();
    };

    info!("Incoming websocket request for {}", username);
    ws.on_upgrade(move |socket| handle_socket(socket, username, state))
}

/// Runs one websocket: a writer task fed by the server loop, and this task
/// forwarding inbound frames to the server loop
async fn handle_socket(socket: WebSocket, username: String, state: AppState) {
    let connection_id = state.next_connection_id.fetch_add(1, Ordering::Relaxed);
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    if state
        .server_tx
        .send(ServerMessage::Connected {
            username: username.clone(),
            connection_id,
            sender: tx,
        })
        .is_err()
    {
        error!("Server loop is gone, closing {}", username);
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let message = ServerMessage::FrameReceived {
                    username: username.clone(),
                    connection_id,
                    frame: text.as_str().to_owned(),
                };
                if state.server_tx.send(message).is_err() {
                    break;
                }
            }
            Ok(Message::Binary(_)) => warn!("Ignoring binary frame from {}", username),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("{} disconnected: {}", username, e);
                break;
            }
        }
    }

    let _ = state.server_tx.send(ServerMessage::Disconnected {
        username,
        connection_id,
    });
    writer.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ProximityAction;

    struct TestClient {
        rx: mpsc::UnboundedReceiver<String>,
    }

    impl TestClient {
        fn drain(&mut self) -> Vec<WireMessage> {
            let mut messages = Vec::new();
            while let Ok(frame) = self.rx.try_recv() {
                messages.push(decode(&frame).unwrap());
            }
            messages
        }
    }

    fn test_server() -> Server {
        Server::new(8, RoomStore::with_default_room())
    }

    fn join(server: &mut Server, username: &str, connection_id: u64) -> TestClient {
        let (sender, rx) = mpsc::unbounded_channel();
        server.handle_message(ServerMessage::Connected {
            username: username.to_string(),
            connection_id,
            sender,
        });
        TestClient { rx }
    }

    fn send(server: &mut Server, username: &str, connection_id: u64, message: &WireMessage) {
        server.handle_message(ServerMessage::FrameReceived {
            username: username.to_string(),
            connection_id,
            frame: encode(message).unwrap(),
        });
    }

    fn position(username: &str, row: i32, col: i32) -> WireMessage {
        WireMessage::Position {
            username: username.to_string(),
            row,
            col,
        }
    }

    #[test]
    fn test_position_is_broadcast_to_everyone() {
        let mut server = test_server();
        let mut alice = join(&mut server, "alice", 1);
        let mut bob = join(&mut server, "bob", 2);

        send(&mut server, "alice", 1, &position("alice", 3, 3));

        assert_eq!(alice.drain(), vec![position("alice", 3, 3)]);
        assert_eq!(bob.drain(), vec![position("alice", 3, 3)]);
    }

    #[test]
    fn test_proximity_events_precede_position() {
        let mut server = test_server();
        let mut alice = join(&mut server, "alice", 1);
        let mut bob = join(&mut server, "bob", 2);

        send(&mut server, "alice", 1, &position("alice", 3, 3));
        send(&mut server, "bob", 2, &position("bob", 3, 4));
        assert_eq!(
            alice.drain()[1..],
            [
                WireMessage::proximity("bob", "alice", ProximityAction::Approach),
                WireMessage::proximity("alice", "bob", ProximityAction::Approach),
                position("bob", 3, 4),
            ]
        );
        bob.drain();

        send(&mut server, "bob", 2, &position("bob", 3, 5));
        assert_eq!(
            bob.drain(),
            vec![
                WireMessage::proximity("bob", "alice", ProximityAction::Leave),
                WireMessage::proximity("alice", "bob", ProximityAction::Leave),
                position("bob", 3, 5),
            ]
        );
        assert_eq!(alice.drain().len(), 3);
    }

    #[test]
    fn test_chat_reaches_only_recipient() {
        let mut server = test_server();
        let mut alice = join(&mut server, "alice", 1);
        let mut bob = join(&mut server, "bob", 2);
        let mut carol = join(&mut server, "carol", 3);

        let alice_id = shared::Identity::new("alice").unwrap();
        let chat = WireMessage::chat(&alice_id, "bob", "hello");
        send(&mut server, "alice", 1, &chat);

        assert_eq!(bob.drain(), vec![chat]);
        assert!(alice.drain().is_empty());
        assert!(carol.drain().is_empty());
    }

    #[test]
    fn test_spoofed_frames_are_dropped() {
        let mut server = test_server();
        let mut alice = join(&mut server, "alice", 1);
        let mut bob = join(&mut server, "bob", 2);

        send(&mut server, "alice", 1, &position("bob", 1, 1));
        let bob_id = shared::Identity::new("bob").unwrap();
        send(&mut server, "alice", 1, &WireMessage::chat(&bob_id, "alice", "hi"));
        send(
            &mut server,
            "alice",
            1,
            &WireMessage::proximity("alice", "bob", ProximityAction::Approach),
        );

        assert!(alice.drain().is_empty());
        assert!(bob.drain().is_empty());
        assert_eq!(server.world.player_count(), 0);
    }

    #[test]
    fn test_malformed_frames_do_not_break_the_loop() {
        let mut server = test_server();
        let mut alice = join(&mut server, "alice", 1);

        for frame in ["not json", r#"{"type":"dance"}"#, r#"{"row":1}"#] {
            server.handle_message(ServerMessage::FrameReceived {
                username: "alice".to_string(),
                connection_id: 1,
                frame: frame.to_string(),
            });
        }
        send(&mut server, "alice", 1, &position("alice", 2, 2));

        assert_eq!(alice.drain(), vec![position("alice", 2, 2)]);
    }

    #[test]
    fn test_disconnect_releases_neighbours() {
        let mut server = test_server();
        let _alice = join(&mut server, "alice", 1);
        let mut bob = join(&mut server, "bob", 2);

        send(&mut server, "alice", 1, &position("alice", 3, 3));
        send(&mut server, "bob", 2, &position("bob", 4, 3));
        bob.drain();

        server.handle_message(ServerMessage::Disconnected {
            username: "alice".to_string(),
            connection_id: 1,
        });

        assert_eq!(
            bob.drain(),
            vec![WireMessage::proximity(
                "alice",
                "bob",
                ProximityAction::Leave
            )]
        );
        assert_eq!(server.clients.usernames(), vec!["bob".to_string()]);
    }

    #[test]
    fn test_stale_connection_is_ignored() {
        let mut server = test_server();
        let _old = join(&mut server, "alice", 1);
        let mut new = join(&mut server, "alice", 2);

        send(&mut server, "alice", 1, &position("alice", 1, 1));
        assert!(new.drain().is_empty());

        server.handle_message(ServerMessage::Disconnected {
            username: "alice".to_string(),
            connection_id: 1,
        });
        assert_eq!(server.clients.len(), 1);
    }

    #[test]
    fn test_replaced_connection_is_reintroduced_on_announce() {
        let mut server = test_server();
        let _old = join(&mut server, "alice", 1);
        let mut bob = join(&mut server, "bob", 2);

        send(&mut server, "alice", 1, &position("alice", 3, 3));
        send(&mut server, "bob", 2, &position("bob", 3, 4));
        bob.drain();

        let mut alice = join(&mut server, "alice", 3);
        assert_eq!(
            bob.drain(),
            vec![WireMessage::proximity(
                "alice",
                "bob",
                ProximityAction::Leave
            )]
        );
        assert_eq!(server.world.position_of("alice"), None);

        send(&mut server, "alice", 3, &position("alice", 3, 3));
        assert_eq!(
            alice.drain()[1..],
            [
                WireMessage::proximity("alice", "bob", ProximityAction::Approach),
                WireMessage::proximity("bob", "alice", ProximityAction::Approach),
                position("alice", 3, 3),
            ]
        );
        assert!(server.world.are_adjacent("alice", "bob"));
    }

    #[test]
    fn test_full_server_refuses_connection() {
        let mut server = Server::new(1, RoomStore::new());
        let _alice = join(&mut server, "alice", 1);
        let mut bob = join(&mut server, "bob", 2);

        send(&mut server, "bob", 2, &position("bob", 1, 1));
        assert!(bob.drain().is_empty());
        assert_eq!(server.clients.usernames(), vec!["alice".to_string()]);
    }

    #[test]
    fn test_room_endpoint() {
        let server = test_server();
        let state = AppState {
            server_tx: server.server_tx.clone(),
            rooms: Arc::clone(&server.rooms),
            next_connection_id: Arc::new(AtomicU64::new(1)),
        };

        let found = tokio_test::block_on(get_room(
            State(state.clone()),
            Path("room1".to_string()),
        ));
        assert_eq!(found.status(), StatusCode::OK);

        let missing = tokio_test::block_on(get_room(State(state), Path("nowhere".to_string())));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
