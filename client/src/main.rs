use clap::Parser;
use client::game::GameState;
use client::input::InputManager;
use client::network::{websocket_url, Connection, ReconnectPolicy};
use client::presence::PeerExpiry;
use client::rendering::{chat_close_box, Renderer};
use client::room::RoomLoader;
use log::{error, info};
use macroquad::prelude::*;
use reqwest::Url;
use shared::{Identity, DEFAULT_ROOM_ID};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTTP address of the server
    #[arg(short = 's', long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Name to join under
    #[arg(short = 'u', long)]
    username: String,

    /// Room to load
    #[arg(short = 'r', long, default_value = DEFAULT_ROOM_ID)]
    room: String,

    /// First reconnect delay in milliseconds
    #[arg(long, default_value = "500")]
    reconnect_initial_ms: u64,

    /// Upper bound for the reconnect delay in milliseconds
    #[arg(long, default_value = "8000")]
    reconnect_max_ms: u64,

    /// Give up after this many failed reconnects (unlimited when unset)
    #[arg(long)]
    max_reconnect_attempts: Option<u32>,

    /// Forget peers silent for this many seconds (never when unset)
    #[arg(long)]
    peer_timeout_secs: Option<u64>,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Tilemeet".to_owned(),
        window_width: 1024,
        window_height: 768,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let identity = Identity::new(args.username.as_str()).ok_or("username must not be blank")?;
    let base = Url::parse(&args.server)?;
    let runtime = tokio::runtime::Runtime::new()?;
    let mut renderer = Renderer::new();

    info!("Starting client as {}", identity);

    let mut loader = RoomLoader::spawn(runtime.handle(), base.clone(), args.room.clone());
    let room = loop {
        match loader.poll() {
            Some(Ok(room)) => break room,
            Some(Err(e)) => {
                error!("Failed to load room {}: {}", args.room, e);
                let reason = e.to_string();
                loop {
                    renderer.render_load_failure(&reason);
                    if is_key_pressed(KeyCode::Escape) {
                        return Ok(());
                    }
                    next_frame().await;
                }
            }
            None => {
                renderer.render_loading(&args.room);
                next_frame().await;
            }
        }
    };

    let policy = ReconnectPolicy {
        initial: Duration::from_millis(args.reconnect_initial_ms),
        max: Duration::from_millis(args.reconnect_max_ms),
        max_attempts: args.max_reconnect_attempts,
    };
    let expiry = args
        .peer_timeout_secs
        .map_or(PeerExpiry::Never, |secs| PeerExpiry::After(Duration::from_secs(secs)));

    let url = websocket_url(&base, &identity)?;
    let mut connection = Connection::open(runtime.handle(), url, policy);
    let mut game = GameState::new(identity, room, connection.outbox(), expiry);
    let mut input = InputManager::new();

    info!("Controls: arrows/WASD to move, C to chat, Esc to close chat");

    loop {
        let now = Instant::now();

        while let Some(inbound) = connection.try_next() {
            game.handle_inbound(inbound, now);
        }
        game.expire_peers(now);

        let chat_open = game.chat().is_some();
        let close_box = chat_open.then(|| chat_close_box(screen_width(), screen_height()));
        for event in input.update(chat_open, close_box) {
            game.apply_input(event, now);
        }

        renderer.render(&game, input.chat_input(), now);
        next_frame().await;
    }
}
