use clap::Parser;
use log::{error, info};
use server::network::Server;
use server::rooms::RoomStore;
use std::path::PathBuf;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of concurrent clients
    #[arg(short, long, default_value = "64")]
    max_clients: usize,

    /// Directory of extra `<room_id>.json` rooms to serve
    #[arg(short, long)]
    rooms_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut rooms = RoomStore::with_default_room();
    if let Some(dir) = &args.rooms_dir {
        let loaded = rooms.load_dir(dir)?;
        info!("Loaded {} rooms from {}", loaded, dir.display());
    }
    info!("Serving rooms: {}", rooms.room_ids().join(", "));

    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address).await?;
    let server = Server::new(args.max_clients, rooms);

    tokio::select! {
        result = server.run(listener) => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
