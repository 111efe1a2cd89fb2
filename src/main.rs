//! Code Heist Game Server
//!
//! Authoritative server binary: reads configuration from the
//! environment, wires the in-memory store, and serves WebSocket clients.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use code_heist::network::auth::AuthConfig;
use code_heist::network::server::{GameServer, ServerConfig};
use code_heist::store::memory::MemoryStore;
use code_heist::VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind_addr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()?;
    let reap_secs: u64 = std::env::var("ROOM_REAP_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(300);

    let config = ServerConfig {
        bind_addr,
        room_reap_after: Duration::from_secs(reap_secs),
        auth: AuthConfig::from_env(),
        ..Default::default()
    };

    info!("Code Heist Server v{}", VERSION);
    info!("Listening on {}", config.bind_addr);
    if !config.auth.is_configured() {
        info!("No AUTH_SECRET/AUTH_PUBLIC_KEY_PEM set; all connections will be rejected at auth");
    }

    let store = Arc::new(MemoryStore::new());
    let server = GameServer::new(config, store.clone(), store);
    server.run().await?;

    Ok(())
}
