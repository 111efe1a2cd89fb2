//! WebSocket Game Server
//!
//! Async WebSocket server for multiplayer connections. Handles the
//! authentication handshake and routes commands to room coordinators.
//! All game decisions happen inside the coordinators; this layer only
//! parses, authenticates, and forwards.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::game::state::PlayerId;
use crate::game::RulesError;
use crate::network::auth::{validate_token, AuthConfig};
use crate::network::protocol::{
    AuthResult, ClientCommand, ErrorCode, ErrorReply, ServerEvent,
};
use crate::network::room::{RoomCommand, RoomRegistry};
use crate::store::{RoomStore, StatsStore};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// How long an ended room lingers before it is reaped.
    pub room_reap_after: Duration,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// JWT validation settings.
    pub auth: AuthConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 1000,
            room_reap_after: Duration::from_secs(300),
            idle_timeout: Duration::from_secs(300),
            auth: AuthConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Connected client state.
struct ConnectedClient {
    /// Player identifier (after auth).
    player: Option<PlayerId>,
    /// Display name (after auth).
    username: Option<String>,
    /// Last activity.
    last_activity: Instant,
}

impl ConnectedClient {
    fn identity(&self) -> Option<(PlayerId, String)> {
        match (&self.player, &self.username) {
            (Some(player), Some(username)) => Some((*player, username.clone())),
            _ => None,
        }
    }
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Room registry (code -> coordinator handle).
    registry: Arc<RoomRegistry>,
    /// Stats store, served directly for leaderboard queries.
    stats: Arc<dyn StatsStore>,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server over the given stores.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn RoomStore>,
        stats: Arc<dyn StatsStore>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = Arc::new(RoomRegistry::new(
            store,
            stats.clone(),
            config.room_reap_after,
        ));

        Self {
            config,
            registry,
            stats,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        }
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("Game server listening on {}", self.config.bind_addr);

        // Spawn cleanup task
        let cleanup_clients = self.clients.clone();
        let cleanup_registry = self.registry.clone();
        let idle_timeout = self.config.idle_timeout;
        let cleanup_handle = tokio::spawn(async move {
            Self::run_cleanup_loop(cleanup_clients, cleanup_registry, idle_timeout).await;
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let registry = self.registry.clone();
        let stats = self.stats.clone();
        let config = self.config.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerEvent>(64);

            // Register client
            {
                let mut clients = clients.write().await;
                clients.insert(
                    addr,
                    ConnectedClient {
                        player: None,
                        username: None,
                        last_activity: Instant::now(),
                    },
                );
            }

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(event) = msg_rx.recv().await {
                    let text = match event.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let command = match ClientCommand::from_json(&text) {
                                    Ok(c) => c,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(ServerEvent::Error(ErrorReply {
                                            code: ErrorCode::InvalidCommand,
                                            message: "Invalid message format".to_string(),
                                        })).await;
                                        continue;
                                    }
                                };

                                // Update activity
                                {
                                    let mut clients = clients.write().await;
                                    if let Some(client) = clients.get_mut(&addr) {
                                        client.last_activity = Instant::now();
                                    }
                                }

                                Self::handle_client_command(
                                    addr,
                                    command,
                                    &clients,
                                    &registry,
                                    &stats,
                                    &config,
                                    &msg_tx,
                                ).await;
                            }
                            Some(Ok(Message::Ping(_))) => {
                                let _ = msg_tx.send(ServerEvent::Pong {
                                    timestamp: 0,
                                    server_time: unix_millis(),
                                }).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerEvent::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();

            let player = {
                let mut clients = clients.write().await;
                clients.remove(&addr).and_then(|c| c.player)
            };
            if let Some(player) = player {
                registry.disconnect(player).await;
            }

            info!("Client {} cleaned up", addr);
        });
    }

    /// Handle one parsed client command.
    async fn handle_client_command(
        addr: SocketAddr,
        command: ClientCommand,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        registry: &Arc<RoomRegistry>,
        stats: &Arc<dyn StatsStore>,
        config: &ServerConfig,
        sender: &mpsc::Sender<ServerEvent>,
    ) {
        // Auth and ping work before authentication; nothing else does.
        match &command {
            ClientCommand::Auth(request) => {
                Self::handle_auth(addr, &request.token, clients, stats, config, sender).await;
                return;
            }
            ClientCommand::Ping { timestamp } => {
                let _ = sender
                    .send(ServerEvent::Pong {
                        timestamp: *timestamp,
                        server_time: unix_millis(),
                    })
                    .await;
                return;
            }
            _ => {}
        }

        let identity = {
            let clients = clients.read().await;
            clients.get(&addr).and_then(|c| c.identity())
        };
        let (player, username) = match identity {
            Some(identity) => identity,
            None => {
                let _ = sender
                    .send(ServerEvent::Error(ErrorReply {
                        code: ErrorCode::NotAuthenticated,
                        message: "Must authenticate first".to_string(),
                    }))
                    .await;
                return;
            }
        };

        match command {
            ClientCommand::CreateRoom {
                room_name,
                max_players,
            } => {
                if let Err(err) = registry
                    .create_room(player, &username, &room_name, max_players, sender.clone())
                    .await
                {
                    let _ = sender.send(ServerEvent::Error(err)).await;
                }
            }
            ClientCommand::JoinRoom { room_code } => {
                if let Err(err) = registry
                    .join_room(&room_code, player, &username, sender.clone())
                    .await
                {
                    let _ = sender.send(ServerEvent::Error(err)).await;
                }
            }
            ClientCommand::LeaveRoom => {
                if let Err(err) = registry.leave_room(player).await {
                    let _ = sender.send(ServerEvent::Error(err)).await;
                }
            }
            ClientCommand::ToggleReady => {
                Self::route(registry, player, RoomCommand::ToggleReady { player }, sender).await;
            }
            ClientCommand::StartGame => {
                Self::route(registry, player, RoomCommand::StartGame { player }, sender).await;
            }
            ClientCommand::DrawCard => {
                Self::route(registry, player, RoomCommand::DrawCard { player }, sender).await;
            }
            ClientCommand::PlayCard { card, target } => {
                Self::route(
                    registry,
                    player,
                    RoomCommand::PlayCard {
                        player,
                        card,
                        target,
                    },
                    sender,
                )
                .await;
            }
            ClientCommand::EndTurn => {
                Self::route(registry, player, RoomCommand::EndTurn { player }, sender).await;
            }
            ClientCommand::ChallengeCard => {
                Self::route(registry, player, RoomCommand::Challenge { player }, sender).await;
            }
            ClientCommand::ChatMessage { text } => {
                Self::route(registry, player, RoomCommand::Chat { player, text }, sender).await;
            }
            ClientCommand::SyncRequest => {
                Self::route(registry, player, RoomCommand::Sync { player }, sender).await;
            }
            ClientCommand::GetActiveRooms => {
                let rooms = registry.active_rooms().await;
                let _ = sender.send(ServerEvent::ActiveRooms { rooms }).await;
            }
            ClientCommand::GetLeaderboard { limit } => {
                match stats.get_leaderboard(limit.min(100)).await {
                    Ok(rows) => {
                        let entries = rows.into_iter().map(Into::into).collect();
                        let _ = sender.send(ServerEvent::Leaderboard { entries }).await;
                    }
                    Err(err) => {
                        let _ = sender
                            .send(ServerEvent::Error(ErrorReply::from_store(&err)))
                            .await;
                    }
                }
            }
            ClientCommand::Auth(_) | ClientCommand::Ping { .. } => {}
        }
    }

    /// Forward a command into the player's room, if they are in one.
    async fn route(
        registry: &Arc<RoomRegistry>,
        player: PlayerId,
        command: RoomCommand,
        sender: &mpsc::Sender<ServerEvent>,
    ) {
        match registry.room_of(player).await {
            Some(room) => {
                if !room.send(command).await {
                    let _ = sender
                        .send(ServerEvent::Error(ErrorReply::room_not_found()))
                        .await;
                }
            }
            None => {
                let _ = sender
                    .send(ServerEvent::Error(ErrorReply::from_rules(
                        &RulesError::NotInRoom,
                    )))
                    .await;
            }
        }
    }

    /// Handle the authentication handshake.
    async fn handle_auth(
        addr: SocketAddr,
        token: &str,
        clients: &Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        stats: &Arc<dyn StatsStore>,
        config: &ServerConfig,
        sender: &mpsc::Sender<ServerEvent>,
    ) {
        match validate_token(token, &config.auth) {
            Ok(claims) => {
                let player = claims.player_id();
                let username = claims.display_name();

                {
                    let mut clients = clients.write().await;
                    if let Some(client) = clients.get_mut(&addr) {
                        client.player = Some(player);
                        client.username = Some(username.clone());
                    }
                }

                // Warm the stats row so the player shows up in profile
                // and leaderboard queries before their first game.
                if let Err(err) = stats.get_or_create_stats(player, &username).await {
                    warn!("stats lookup failed for {}: {}", addr, err);
                }

                debug!("Client {} authenticated as {}", addr, player.short());
                let _ = sender
                    .send(ServerEvent::AuthResult(AuthResult {
                        success: true,
                        player: Some(player),
                        username: Some(username),
                        error: None,
                        server_version: config.version.clone(),
                    }))
                    .await;
            }
            Err(err) => {
                warn!("Auth failed for {}: {}", addr, err);
                let _ = sender
                    .send(ServerEvent::AuthResult(AuthResult {
                        success: false,
                        player: None,
                        username: None,
                        error: Some(err.to_string()),
                        server_version: config.version.clone(),
                    }))
                    .await;
            }
        }
    }

    /// Run cleanup loop: drop idle connections and dead rooms.
    async fn run_cleanup_loop(
        clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
        registry: Arc<RoomRegistry>,
        idle_timeout: Duration,
    ) {
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;

            let now = Instant::now();
            let to_remove: Vec<_> = {
                let clients = clients.read().await;
                clients
                    .iter()
                    .filter(|(_, c)| now.duration_since(c.last_activity) > idle_timeout)
                    .map(|(addr, _)| *addr)
                    .collect()
            };

            for addr in to_remove {
                let player = {
                    let mut clients = clients.write().await;
                    clients.remove(&addr).and_then(|c| c.player)
                };
                if let Some(player) = player {
                    registry.disconnect(player).await;
                }
                info!("Removed idle client {}", addr);
            }

            registry.cleanup().await;
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get live room count.
    pub async fn room_count(&self) -> usize {
        self.registry.room_count().await
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn test_server() -> GameServer {
        let store = Arc::new(MemoryStore::new());
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        GameServer::new(config, store.clone(), store)
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.room_reap_after, Duration::from_secs(300));
        assert!(!config.auth.is_configured());
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = test_server();
        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = test_server();
        server.shutdown();
        // Should not panic
    }
}
