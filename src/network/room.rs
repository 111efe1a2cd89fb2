//! Room Coordination
//!
//! One coordinator task owns each room. All commands for a room flow
//! through its mailbox and are processed strictly one at a time, so every
//! command observes a fully committed prior state. A command mutates a
//! working copy, persists it, and only then swaps it in and broadcasts —
//! a failed persistence call aborts with no visible effect.
//!
//! Rooms never share mutable state; commands for different rooms proceed
//! fully in parallel. The registry maps room codes to mailbox handles and
//! players to rooms, and sweeps dead rooms.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::card::Card;
use crate::game::challenge;
use crate::game::effect;
use crate::game::events::GameEvent;
use crate::game::state::{GamePhase, PlayerId, RoomState};
use crate::game::turn;
use crate::game::RulesError;
use crate::network::protocol::{ErrorReply, RoomListing, RoomSnapshot, ServerEvent};
use crate::store::{RoomStore, StatDeltas, StatsStore, StoreError};

/// Mailbox depth per room.
const ROOM_MAILBOX: usize = 64;

/// Alphabet for room codes; ambiguous glyphs (0/O, 1/I) excluded.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Room code length.
const CODE_LEN: usize = 6;

// =============================================================================
// COMMANDS
// =============================================================================

/// A command for one room's coordinator.
///
/// `Join` and `Leave` carry a reply channel because the registry tracks
/// player-to-room membership; everything else reports failures straight
/// back to the issuing connection as an `Error` event.
#[derive(Debug)]
pub enum RoomCommand {
    /// Seat a player (or reattach a seated player's connection).
    Join {
        /// Who is joining.
        player: PlayerId,
        /// Their display name.
        username: String,
        /// Outbound channel for this player's events.
        sender: mpsc::Sender<ServerEvent>,
        /// Join outcome.
        reply: oneshot::Sender<Result<(), ErrorReply>>,
    },
    /// Give up the seat.
    Leave {
        /// Who is leaving.
        player: PlayerId,
        /// Leave outcome.
        reply: oneshot::Sender<Result<(), ErrorReply>>,
    },
    /// Connection dropped; keep the seat for resync.
    Disconnect {
        /// Whose connection dropped.
        player: PlayerId,
    },
    /// Flip lobby readiness.
    ToggleReady {
        /// Issuer.
        player: PlayerId,
    },
    /// Start the game (host only).
    StartGame {
        /// Issuer.
        player: PlayerId,
    },
    /// Draw a card.
    DrawCard {
        /// Issuer.
        player: PlayerId,
    },
    /// Play a card.
    PlayCard {
        /// Issuer.
        player: PlayerId,
        /// Card to play.
        card: Card,
        /// Target for targeted cards.
        target: Option<PlayerId>,
    },
    /// End the turn.
    EndTurn {
        /// Issuer.
        player: PlayerId,
    },
    /// Dispute the pending play.
    Challenge {
        /// Issuer.
        player: PlayerId,
    },
    /// Chat passthrough; never touches game state.
    Chat {
        /// Sender.
        player: PlayerId,
        /// Message text.
        text: String,
    },
    /// Send the issuer a fresh private snapshot.
    Sync {
        /// Issuer.
        player: PlayerId,
    },
    /// Describe the room for the active-rooms listing.
    Describe {
        /// Listing reply.
        reply: oneshot::Sender<RoomListing>,
    },
}

/// Handle for sending commands to a room coordinator.
#[derive(Clone)]
pub struct RoomHandle {
    code: String,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// The room's code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Send a command. Returns false if the room has shut down.
    pub async fn send(&self, command: RoomCommand) -> bool {
        self.tx.send(command).await.is_ok()
    }

    /// Whether the coordinator has shut down.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// =============================================================================
// ROOM COORDINATOR
// =============================================================================

/// Events plus private deliveries produced by one committed command.
#[derive(Debug, Default)]
struct Applied {
    events: Vec<GameEvent>,
    private: Vec<(PlayerId, ServerEvent)>,
}

impl Applied {
    fn none() -> Self {
        Self::default()
    }

    fn from_events(events: Vec<GameEvent>) -> Self {
        Self {
            events,
            private: Vec::new(),
        }
    }
}

/// The coordinator task owning one room.
pub struct RoomActor {
    doc_id: Uuid,
    state: RoomState,
    inbox: mpsc::Receiver<RoomCommand>,
    /// Per-room connection registry, owned by this task alone.
    connections: BTreeMap<PlayerId, mpsc::Sender<ServerEvent>>,
    store: Arc<dyn RoomStore>,
    stats: Arc<dyn StatsStore>,
    rng: StdRng,
    reap_after: Duration,
}

impl RoomActor {
    /// Spawn the coordinator task for a stored room.
    ///
    /// Initial connections (the host on creation; nobody on a revive)
    /// are attached immediately and greeted with a snapshot.
    pub fn spawn(
        doc_id: Uuid,
        state: RoomState,
        connections: BTreeMap<PlayerId, mpsc::Sender<ServerEvent>>,
        store: Arc<dyn RoomStore>,
        stats: Arc<dyn StatsStore>,
        reap_after: Duration,
    ) -> RoomHandle {
        let (tx, inbox) = mpsc::channel(ROOM_MAILBOX);
        let handle = RoomHandle {
            code: state.code.clone(),
            tx,
        };

        let actor = RoomActor {
            doc_id,
            state,
            inbox,
            connections,
            store,
            stats,
            rng: StdRng::from_entropy(),
            reap_after,
        };
        tokio::spawn(actor.run());

        handle
    }

    /// The serialized command loop.
    async fn run(mut self) {
        info!(room = %self.state.code, "room coordinator started");
        let connected: Vec<PlayerId> = self.connections.keys().copied().collect();
        for player in connected {
            self.send_snapshot(player).await;
        }

        loop {
            // Ended rooms linger for late syncs, then get reaped.
            let command = if self.state.phase == GamePhase::Ended {
                match tokio::time::timeout(self.reap_after, self.inbox.recv()).await {
                    Ok(command) => command,
                    Err(_) => {
                        info!(room = %self.state.code, "reaping ended room");
                        break;
                    }
                }
            } else {
                self.inbox.recv().await
            };

            let command = match command {
                Some(command) => command,
                None => break,
            };

            self.handle_command(command).await;

            if self.state.seats.is_empty() {
                info!(room = %self.state.code, "room empty, closing");
                break;
            }
        }

        self.broadcast(ServerEvent::Shutdown {
            reason: "room closed".to_string(),
        })
        .await;

        match self.store.delete_room(self.doc_id).await {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(err) => warn!(room = %self.state.code, %err, "failed to delete room document"),
        }
        info!(room = %self.state.code, "room coordinator stopped");
    }

    async fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join {
                player,
                username,
                sender,
                reply,
            } => {
                let result = self.handle_join(player, &username, sender).await;
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player, reply } => {
                let result = self.handle_leave(player).await;
                let _ = reply.send(result);
            }
            RoomCommand::Disconnect { player } => {
                self.handle_disconnect(player).await;
            }
            RoomCommand::ToggleReady { player } => {
                self.exec(player, |state, _| {
                    turn::toggle_ready(state, player).map(|_| Applied::none())
                })
                .await;
            }
            RoomCommand::StartGame { player } => {
                self.exec(player, |state, rng| {
                    turn::start_game(state, player, rng).map(Applied::from_events)
                })
                .await;
            }
            RoomCommand::DrawCard { player } => {
                self.exec(player, |state, rng| {
                    let (card, events) = turn::draw_card(state, player, rng)?;
                    let mut applied = Applied::from_events(events);
                    applied.private.push((
                        player,
                        ServerEvent::CardDrawn {
                            card,
                            deck_remaining: state.deck.len(),
                        },
                    ));
                    Ok(applied)
                })
                .await;
            }
            RoomCommand::PlayCard {
                player,
                card,
                target,
            } => {
                self.exec(player, |state, rng| {
                    let outcome = effect::play_card(state, player, card, target, rng)?;
                    let mut applied = Applied::from_events(outcome.events);
                    if let Some(reveal) = outcome.reveal {
                        applied.private.push((
                            player,
                            ServerEvent::Reveal {
                                target: reveal.target,
                                username: reveal.username,
                                hand: reveal.hand,
                                last_played: reveal.last_played,
                            },
                        ));
                    }
                    Ok(applied)
                })
                .await;
            }
            RoomCommand::EndTurn { player } => {
                self.exec(player, |state, _| {
                    turn::end_turn(state, player).map(Applied::from_events)
                })
                .await;
            }
            RoomCommand::Challenge { player } => {
                self.exec(player, |state, _| {
                    challenge::challenge_card(state, player).map(Applied::from_events)
                })
                .await;
            }
            RoomCommand::Chat { player, text } => {
                self.handle_chat(player, text).await;
            }
            RoomCommand::Sync { player } => {
                self.send_snapshot(player).await;
            }
            RoomCommand::Describe { reply } => {
                let _ = reply.send(RoomListing {
                    room_code: self.state.code.clone(),
                    room_name: self.state.name.clone(),
                    players: self.state.seats.len(),
                    max_players: self.state.max_players,
                    phase: self.state.phase,
                });
            }
        }
    }

    /// Run a rules mutation through the commit protocol and publish.
    ///
    /// Failures go back to the issuer only; nothing is broadcast and the
    /// committed state is untouched.
    async fn exec<F>(&mut self, issuer: PlayerId, mutate: F)
    where
        F: FnOnce(&mut RoomState, &mut StdRng) -> Result<Applied, RulesError>,
    {
        match self.commit(mutate).await {
            Ok(applied) => self.publish(applied).await,
            Err(err) => self.send_to(issuer, ServerEvent::Error(err)).await,
        }
    }

    /// Mutate a working copy, persist it, then swap it in.
    async fn commit<F>(&mut self, mutate: F) -> Result<Applied, ErrorReply>
    where
        F: FnOnce(&mut RoomState, &mut StdRng) -> Result<Applied, RulesError>,
    {
        let mut working = self.state.clone();
        let applied =
            mutate(&mut working, &mut self.rng).map_err(|err| ErrorReply::from_rules(&err))?;

        if let Err(err) = self.store.update_room(self.doc_id, working.clone()).await {
            warn!(room = %self.state.code, %err, "persist failed, command aborted");
            return Err(ErrorReply::from_store(&err));
        }

        self.state = working;
        Ok(applied)
    }

    /// Broadcast a committed command's events, then fresh snapshots.
    async fn publish(&mut self, applied: Applied) {
        let mut game_over = false;
        for event in &applied.events {
            debug!(room = %self.state.code, "{}", event.log_line());
            match event {
                GameEvent::CardDrawn {
                    player,
                    deck_remaining,
                } => {
                    // The drawn card goes only to the drawer (via the
                    // private list); everyone else sees a deck count.
                    self.broadcast_except(
                        *player,
                        ServerEvent::PlayerDrewCard {
                            player: *player,
                            deck_remaining: *deck_remaining,
                        },
                    )
                    .await;
                }
                other => {
                    if matches!(other, GameEvent::GameEnded { .. }) {
                        game_over = true;
                    }
                    self.broadcast(convert_event(other)).await;
                }
            }
        }

        for (player, event) in applied.private {
            self.send_to(player, event).await;
        }

        self.broadcast_snapshots().await;

        if game_over {
            self.post_stats().await;
        }
    }

    async fn handle_join(
        &mut self,
        player: PlayerId,
        username: &str,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<(), ErrorReply> {
        // A seated player reattaching (reconnect) just gets a resync.
        if self.state.seat(player).is_some() {
            self.connections.insert(player, sender);
            self.send_snapshot(player).await;
            return Ok(());
        }

        self.connections.insert(player, sender);
        match self
            .commit(|state, _| turn::join_room(state, player, username).map(Applied::from_events))
            .await
        {
            Ok(applied) => {
                self.publish(applied).await;
                Ok(())
            }
            Err(err) => {
                self.connections.remove(&player);
                Err(err)
            }
        }
    }

    async fn handle_leave(&mut self, player: PlayerId) -> Result<(), ErrorReply> {
        match self
            .commit(|state, _| turn::leave_room(state, player).map(Applied::from_events))
            .await
        {
            Ok(applied) => {
                self.connections.remove(&player);
                self.publish(applied).await;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn handle_disconnect(&mut self, player: PlayerId) {
        if self.connections.remove(&player).is_none() {
            return;
        }
        if let Some(seat) = self.state.seat(player) {
            let username = seat.username.clone();
            self.broadcast(ServerEvent::PlayerDisconnected { player, username })
                .await;
        }
    }

    async fn handle_chat(&mut self, player: PlayerId, text: String) {
        let username = match self.state.seat(player) {
            Some(seat) => seat.username.clone(),
            None => {
                self.send_to(
                    player,
                    ServerEvent::Error(ErrorReply::from_rules(&RulesError::NotInRoom)),
                )
                .await;
                return;
            }
        };

        self.broadcast(ServerEvent::ChatMessage {
            player,
            username,
            text,
            timestamp: unix_millis(),
        })
        .await;
    }

    /// Credit a finished game to the stats store. Failures are logged,
    /// not surfaced; the game result already committed.
    async fn post_stats(&self) {
        for seat in &self.state.seats {
            let won = self.state.winner.as_deref() == Some(seat.username.as_str());
            let deltas = StatDeltas {
                games_played: 1,
                wins: u32::from(won),
            };
            if let Err(err) = self
                .stats
                .update_stats(seat.id, &seat.username, deltas)
                .await
            {
                warn!(room = %self.state.code, player = %seat.id.short(), %err, "stats update failed");
            }
        }
    }

    async fn broadcast(&self, event: ServerEvent) {
        for sender in self.connections.values() {
            let _ = sender.send(event.clone()).await;
        }
    }

    async fn broadcast_except(&self, skip: PlayerId, event: ServerEvent) {
        for (id, sender) in &self.connections {
            if *id != skip {
                let _ = sender.send(event.clone()).await;
            }
        }
    }

    async fn send_to(&self, player: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.connections.get(&player) {
            let _ = sender.send(event).await;
        }
    }

    async fn send_snapshot(&self, player: PlayerId) {
        let snapshot = RoomSnapshot::for_player(&self.state, player);
        self.send_to(player, ServerEvent::RoomUpdate(snapshot)).await;
    }

    /// Everyone gets their own redacted view.
    async fn broadcast_snapshots(&self) {
        for (id, sender) in &self.connections {
            let snapshot = RoomSnapshot::for_player(&self.state, *id);
            let _ = sender.send(ServerEvent::RoomUpdate(snapshot)).await;
        }
    }
}

/// Map an internal event to its broadcast form.
fn convert_event(event: &GameEvent) -> ServerEvent {
    match event {
        GameEvent::PlayerJoined { player, username } => ServerEvent::PlayerJoined {
            player: *player,
            username: username.clone(),
        },
        GameEvent::PlayerLeft {
            player,
            username,
            new_host,
        } => ServerEvent::PlayerLeft {
            player: *player,
            username: username.clone(),
            new_host: *new_host,
        },
        GameEvent::GameStarted { first_player } => ServerEvent::GameStarted {
            first_player: *first_player,
        },
        // Handled separately in publish; kept total for completeness.
        GameEvent::CardDrawn {
            player,
            deck_remaining,
        } => ServerEvent::PlayerDrewCard {
            player: *player,
            deck_remaining: *deck_remaining,
        },
        GameEvent::CardPlayed {
            actor,
            card,
            detail,
        } => ServerEvent::CardPlayed {
            player: *actor,
            card: *card,
            log: detail.clone(),
        },
        GameEvent::ChallengeResolved {
            challenger,
            actor,
            card,
            legitimate,
        } => ServerEvent::ChallengeResolved {
            challenger: *challenger,
            actor: *actor,
            card: *card,
            legitimate: *legitimate,
            log: event.log_line(),
        },
        GameEvent::PlayerEliminated {
            player, username, ..
        } => ServerEvent::PlayerEliminated {
            player: *player,
            username: username.clone(),
            log: event.log_line(),
        },
        GameEvent::TurnEnded {
            next_player,
            turn_number,
        } => ServerEvent::TurnEnded {
            next_player: *next_player,
            turn_number: *turn_number,
        },
        GameEvent::GameEnded { winner } => ServerEvent::GameEnded {
            winner: winner.clone(),
        },
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// =============================================================================
// ROOM REGISTRY
// =============================================================================

/// Tracks live rooms and which room each player is seated in.
///
/// Handles here are the only way to reach a room; the registry never
/// touches room state itself.
pub struct RoomRegistry {
    rooms: RwLock<BTreeMap<String, RoomHandle>>,
    players: RwLock<BTreeMap<PlayerId, String>>,
    store: Arc<dyn RoomStore>,
    stats: Arc<dyn StatsStore>,
    reap_after: Duration,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new(
        store: Arc<dyn RoomStore>,
        stats: Arc<dyn StatsStore>,
        reap_after: Duration,
    ) -> Self {
        Self {
            rooms: RwLock::new(BTreeMap::new()),
            players: RwLock::new(BTreeMap::new()),
            store,
            stats,
            reap_after,
        }
    }

    /// Create a room with the caller as host. Returns the room code.
    pub async fn create_room(
        &self,
        host: PlayerId,
        username: &str,
        room_name: &str,
        max_players: usize,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<String, ErrorReply> {
        if self.is_seated(host).await {
            return Err(ErrorReply::from_rules(&RulesError::AlreadyInRoom));
        }

        let max_players = max_players.clamp(2, 8);
        let code = self.unique_code().await;
        let state = RoomState::new(code.clone(), room_name, host, username, max_players);

        let doc = self
            .store
            .create_room(state)
            .await
            .map_err(|err| ErrorReply::from_store(&err))?;

        let mut connections = BTreeMap::new();
        connections.insert(host, sender);
        let handle = RoomActor::spawn(
            doc.id,
            doc.state,
            connections,
            self.store.clone(),
            self.stats.clone(),
            self.reap_after,
        );

        self.rooms.write().await.insert(code.clone(), handle);
        self.players.write().await.insert(host, code.clone());
        info!(room = %code, host = %host.short(), "room created");
        Ok(code)
    }

    /// Join (or rejoin) a room by code.
    pub async fn join_room(
        &self,
        code: &str,
        player: PlayerId,
        username: &str,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<(), ErrorReply> {
        let current = self.players.read().await.get(&player).cloned();
        if let Some(current) = current {
            if current != code && self.room_alive(&current).await {
                return Err(ErrorReply::from_rules(&RulesError::AlreadyInRoom));
            }
        }

        let handle = {
            let rooms = self.rooms.read().await;
            rooms.get(code).cloned()
        };
        let handle = match handle {
            Some(handle) if !handle.is_closed() => handle,
            _ => self.revive_room(code).await?,
        };

        let (reply, result) = oneshot::channel();
        let sent = handle
            .send(RoomCommand::Join {
                player,
                username: username.to_string(),
                sender,
                reply,
            })
            .await;
        if !sent {
            return Err(ErrorReply::room_not_found());
        }

        match result.await {
            Ok(Ok(())) => {
                self.players
                    .write()
                    .await
                    .insert(player, code.to_string());
                Ok(())
            }
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ErrorReply::room_not_found()),
        }
    }

    /// Leave whatever room the player is seated in.
    pub async fn leave_room(&self, player: PlayerId) -> Result<(), ErrorReply> {
        let code = match self.players.read().await.get(&player) {
            Some(code) => code.clone(),
            None => return Err(ErrorReply::from_rules(&RulesError::NotInRoom)),
        };

        let handle = self.rooms.read().await.get(&code).cloned();
        if let Some(handle) = handle {
            let (reply, result) = oneshot::channel();
            if handle.send(RoomCommand::Leave { player, reply }).await {
                match result.await {
                    Ok(Ok(())) | Err(_) => {}
                    Ok(Err(err)) => return Err(err),
                }
            }
        }

        self.players.write().await.remove(&player);
        Ok(())
    }

    /// The room handle for a seated player, if any.
    pub async fn room_of(&self, player: PlayerId) -> Option<RoomHandle> {
        let code = self.players.read().await.get(&player).cloned()?;
        self.rooms.read().await.get(&code).cloned()
    }

    /// Route a connection drop; the seat survives for resync.
    pub async fn disconnect(&self, player: PlayerId) {
        if let Some(handle) = self.room_of(player).await {
            let _ = handle.send(RoomCommand::Disconnect { player }).await;
        }
    }

    /// Describe every live room.
    pub async fn active_rooms(&self) -> Vec<RoomListing> {
        let handles: Vec<RoomHandle> = self.rooms.read().await.values().cloned().collect();
        let mut listings = Vec::with_capacity(handles.len());
        for handle in handles {
            let (reply, result) = oneshot::channel();
            if handle.send(RoomCommand::Describe { reply }).await {
                if let Ok(listing) = result.await {
                    listings.push(listing);
                }
            }
        }
        listings
    }

    /// Drop handles to dead rooms and stale player mappings.
    pub async fn cleanup(&self) {
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, handle| !handle.is_closed());

        let live: Vec<String> = rooms.keys().cloned().collect();
        drop(rooms);

        let mut players = self.players.write().await;
        players.retain(|_, code| live.contains(code));
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Respawn a coordinator for a room that exists only in the store
    /// (its coordinator is gone, e.g. after a restart). Connections
    /// reattach through the normal join path.
    async fn revive_room(&self, code: &str) -> Result<RoomHandle, ErrorReply> {
        let doc = self
            .store
            .get_room_by_code(code)
            .await
            .map_err(|err| ErrorReply::from_store(&err))?
            .ok_or_else(ErrorReply::room_not_found)?;

        let mut rooms = self.rooms.write().await;
        if let Some(existing) = rooms.get(code) {
            if !existing.is_closed() {
                return Ok(existing.clone());
            }
        }

        let handle = RoomActor::spawn(
            doc.id,
            doc.state,
            BTreeMap::new(),
            self.store.clone(),
            self.stats.clone(),
            self.reap_after,
        );
        rooms.insert(code.to_string(), handle.clone());
        info!(room = %code, "room revived from store");
        Ok(handle)
    }

    /// Whether the player is seated in a room that is still alive.
    ///
    /// Mappings to reaped rooms don't count; they are swept by `cleanup`
    /// and overwritten on the next join.
    async fn is_seated(&self, player: PlayerId) -> bool {
        let code = match self.players.read().await.get(&player).cloned() {
            Some(code) => code,
            None => return false,
        };
        self.room_alive(&code).await
    }

    /// Whether a room code maps to a live coordinator.
    async fn room_alive(&self, code: &str) -> bool {
        self.rooms
            .read()
            .await
            .get(code)
            .map(|handle| !handle.is_closed())
            .unwrap_or(false)
    }

    /// Generate a code no live room is using.
    async fn unique_code(&self) -> String {
        let rooms = self.rooms.read().await;
        loop {
            let code = generate_code();
            if !rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

impl ErrorReply {
    /// The requested room does not exist (or has closed).
    pub fn room_not_found() -> Self {
        Self {
            code: crate::network::protocol::ErrorCode::RoomNotFound,
            message: "room not found".to_string(),
        }
    }
}

/// A short alphanumeric room code.
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
