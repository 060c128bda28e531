//! Gather - ephemeral link-addressed group chat
//!
//! Serves the HTTP API and the realtime relay. Rooms created over HTTP
//! are fanned out over the relay through a shared room registry.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gather_core::storage::Database;
use gather_net::{Relay, RoomRegistry};

mod config;
mod http;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Gather");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db = match Database::open(&config.db_path) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let rooms = Arc::new(RoomRegistry::new());
    let relay = match Relay::start(config.relay_port, rooms.clone()).await {
        Ok(relay) => relay,
        Err(e) => {
            tracing::error!("Failed to start relay: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(db, rooms);
    let app = http::build_router(state, &config.allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, "Failed to bind HTTP listener: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %addr, "HTTP API listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }

    relay.shutdown();
}
