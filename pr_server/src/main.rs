//! Multi-room poker server using the async actor model.
//!
//! Spawns one RoomActor per room, managed by a RoomManager, with
//! PostgreSQL-backed room state and JWT identity resolution.

mod api;
mod config;

use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;

use poker_rooms::auth::JwtIdentityProvider;
use poker_rooms::room::RoomManager;
use poker_rooms::store::{Database, PgRoomStore};

use config::ServerConfig;

const HELP: &str = "\
Run a multi-room poker server

USAGE:
  pr_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --rooms      N           Rooms to create on first start  [default: 1]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required)
  ROOM_MAX_SEATS           Default seats per room
  ROOM_BIG_BLIND           Default big blind
  ROOM_AUTO_START          Start deals automatically (true/false)
  ROOM_ACTION_TIMEOUT_SECS Seconds before an idle turn is auto-folded
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists.
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override = pargs.opt_value_from_str("--bind")?;
    let db_url_override = pargs.opt_value_from_str("--db-url")?;
    let num_rooms_override = pargs.opt_value_from_str("--rooms")?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let server_config = ServerConfig::from_env(bind_override, db_url_override, num_rooms_override)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    server_config
        .validate()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    info!("Starting multi-room poker server at {}", server_config.bind);

    info!(
        "Connecting to database: {}",
        server_config.database.database_url
    );
    let db = Database::new(&server_config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
    info!("Database connected successfully");

    let store = Arc::new(PgRoomStore::new(db.pool().clone()));
    let defaults = server_config.room_defaults.to_room_config("New Room");
    let room_manager = Arc::new(RoomManager::new(store, defaults));

    // Respawn actors for rooms that survived a restart; only a fresh
    // deployment seeds new ones.
    let loaded = room_manager
        .load_existing_rooms()
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    if loaded > 0 {
        info!("Loaded {loaded} existing room(s)");
    } else {
        info!("Creating {} initial room(s)...", server_config.num_rooms);
        for i in 0..server_config.num_rooms {
            let config = server_config
                .room_defaults
                .to_room_config(&format!("Room {}", i + 1));
            match room_manager.create_room(config).await {
                Ok(room_id) => info!("Created room {} with ID {room_id}", i + 1),
                Err(e) => log::error!("Failed to create room {}: {e}", i + 1),
            }
        }
    }

    let active_count = room_manager.room_count().await;
    info!("Server ready with {active_count} active room(s)");

    match room_manager.list_rooms().await {
        Ok(rooms) => {
            info!("Active rooms:");
            for room in rooms {
                info!(
                    "  - {} (ID: {}) - {}/{} players, big blind {}",
                    room.name, room.id, room.player_count, room.max_seats, room.big_blind
                );
            }
        }
        Err(e) => log::error!("Failed to list rooms: {e}"),
    }

    let identity = Arc::new(JwtIdentityProvider::new(&server_config.jwt_secret));
    let api_state = api::AppState {
        room_manager,
        identity,
    };

    let app = api::create_router(api_state);

    info!("Starting HTTP/WebSocket server on {}", server_config.bind);
    let listener = tokio::net::TcpListener::bind(server_config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {e}", server_config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        server_config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install CTRL+C signal handler: {err}");
    }
}
