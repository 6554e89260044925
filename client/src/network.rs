//! Session controller: owns the websocket to the server
//!
//! The connection runs as one tokio task. Game code never touches the socket;
//! it gets an [`Outbox`] to send frames, reads [`Inbound`] items in arrival
//! order, and can watch the [`ConnectionState`] from anywhere. When the socket
//! drops the task reconnects according to its [`ReconnectPolicy`].

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use reqwest::Url;
use shared::{decode, encode, Identity, WireMessage};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    /// Shut down or out of reconnect attempts; nothing more will arrive.
    Closed,
}

/// Items delivered to the game loop, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(WireMessage),
    State(ConnectionState),
}

/// Exponential backoff between reconnect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(8),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (0-based), or `None` to give up
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|limit| attempt >= limit) {
            return None;
        }

        let factor = 2u32.saturating_pow(attempt.min(16));
        Some(self.initial.saturating_mul(factor).min(self.max))
    }
}

/// The narrow send capability handed to game code
///
/// Sends are fire-and-forget. While the connection is not up they are
/// dropped rather than queued, so a reconnect never replays stale moves.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<WireMessage>,
    state: watch::Receiver<ConnectionState>,
}

impl Outbox {
    pub fn new(
        sender: mpsc::UnboundedSender<WireMessage>,
        state: watch::Receiver<ConnectionState>,
    ) -> Self {
        Self { sender, state }
    }

    /// Returns true if the frame was handed to the connection
    pub fn send(&self, message: WireMessage) -> bool {
        if *self.state.borrow() != ConnectionState::Connected {
            debug!("Not connected, dropping {} frame", message.tag());
            return false;
        }

        self.sender.send(message).is_ok()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

/// Derives `ws://host/ws?username=...` from the server's HTTP base URL
pub fn websocket_url(base: &Url, identity: &Identity) -> Result<Url, Box<dyn std::error::Error>> {
    let mut url = base.join("ws")?;
    let scheme = match base.scheme() {
        "https" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme)
        .map_err(|_| format!("cannot derive a websocket url from {}", base))?;
    url.query_pairs_mut()
        .clear()
        .append_pair("username", identity.as_str());
    Ok(url)
}

pub struct Connection {
    outbox: Outbox,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    state: watch::Receiver<ConnectionState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Connection {
    /// Starts the connection task on `runtime`
    pub fn open(runtime: &Handle, url: Url, policy: ReconnectPolicy) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = runtime.spawn(run_connection(
            url,
            policy,
            outgoing_rx,
            inbound_tx,
            state_tx,
            shutdown_rx,
        ));

        Connection {
            outbox: Outbox::new(outgoing_tx, state_rx.clone()),
            inbound: inbound_rx,
            state: state_rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver for observing state changes from other tasks
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Next queued item without waiting, for frame loops
    pub fn try_next(&mut self) -> Option<Inbound> {
        self.inbound.try_recv().ok()
    }

    /// Next item, waiting for it. `None` once the connection task is gone.
    pub async fn next(&mut self) -> Option<Inbound> {
        self.inbound.recv().await
    }

    /// Closes the socket and stops reconnecting
    pub fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

enum SessionEnd {
    Lost,
    Shutdown,
}

fn publish(
    state_tx: &watch::Sender<ConnectionState>,
    inbound_tx: &mpsc::UnboundedSender<Inbound>,
    state: ConnectionState,
) {
    state_tx.send_replace(state);
    let _ = inbound_tx.send(Inbound::State(state));
}

async fn run_connection(
    url: Url,
    policy: ReconnectPolicy,
    mut outgoing_rx: mpsc::UnboundedReceiver<WireMessage>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    state_tx: watch::Sender<ConnectionState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut attempt = 0;

    loop {
        publish(&state_tx, &inbound_tx, ConnectionState::Connecting);
        info!("Connecting to {}", url);

        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                attempt = 0;
                while outgoing_rx.try_recv().is_ok() {}
                publish(&state_tx, &inbound_tx, ConnectionState::Connected);
                info!("Connected to {}", url);

                let (mut sink, mut stream) = socket.split();
                let end = loop {
                    tokio::select! {
                        outgoing = outgoing_rx.recv() => {
                            let Some(message) = outgoing else {
                                break SessionEnd::Shutdown;
                            };
                            let frame = match encode(&message) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    error!("Failed to encode {} frame: {}", message.tag(), e);
                                    continue;
                                }
                            };
                            if let Err(e) = sink.send(Message::Text(frame.into())).await {
                                warn!("Send failed: {}", e);
                                break SessionEnd::Lost;
                            }
                        }

                        incoming = stream.next() => {
                            match incoming {
                                Some(Ok(Message::Text(text))) => match decode(text.as_str()) {
                                    Ok(message) => {
                                        let _ = inbound_tx.send(Inbound::Message(message));
                                    }
                                    Err(e) => warn!("Dropping inbound frame: {}", e),
                                },
                                Some(Ok(Message::Binary(_))) => warn!("Dropping binary frame"),
                                Some(Ok(Message::Close(_))) | None => {
                                    warn!("Server closed the connection");
                                    break SessionEnd::Lost;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    warn!("Connection error: {}", e);
                                    break SessionEnd::Lost;
                                }
                            }
                        }

                        _ = &mut shutdown_rx => {
                            let _ = sink.send(Message::Close(None)).await;
                            break SessionEnd::Shutdown;
                        }
                    }
                };

                if let SessionEnd::Shutdown = end {
                    break;
                }
                publish(&state_tx, &inbound_tx, ConnectionState::Disconnected);
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", url, e);
                publish(&state_tx, &inbound_tx, ConnectionState::Disconnected);
            }
        }

        let Some(delay) = policy.delay(attempt) else {
            error!("Giving up after {} reconnect attempts", attempt);
            break;
        };
        attempt += 1;
        info!("Reconnecting in {:?}", delay);

        tokio::select! {
            _ = sleep(delay) => {}
            _ = &mut shutdown_rx => break,
        }
    }

    publish(&state_tx, &inbound_tx, ConnectionState::Closed);
}
