//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON tagged enums for debugging ease. Room snapshots
//! are rendered per viewer: you see your own hand, everyone else is a
//! card count.

use serde::{Deserialize, Serialize};

use crate::game::card::Card;
use crate::game::state::{GamePhase, PlayerId, RoomState};
use crate::game::RulesError;
use crate::store::{PlayerStats, StoreError};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Commands sent from client to server.
///
/// Everything except `Auth` and `Ping` requires an authenticated
/// connection; room commands act on the room the player is seated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Authenticate with the server. Must be the first message.
    Auth(AuthRequest),

    /// Create a room and take the host seat.
    CreateRoom {
        /// Display name for the room.
        room_name: String,
        /// Seat limit (clamped to 2–8).
        max_players: usize,
    },

    /// Join (or rejoin) a room by code.
    JoinRoom {
        /// The room's short code.
        room_code: String,
    },

    /// Give up the seat and leave the room.
    LeaveRoom,

    /// Flip lobby readiness.
    ToggleReady,

    /// Start the game (host only).
    StartGame,

    /// Draw a card from the deck.
    DrawCard,

    /// Play a card, optionally at a target.
    PlayCard {
        /// The card to play, by name.
        card: Card,
        /// Target player for targeted cards.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<PlayerId>,
    },

    /// End the current turn.
    EndTurn,

    /// Dispute the pending challengeable play.
    ChallengeCard,

    /// Broadcast a chat line to the room.
    ChatMessage {
        /// The message text.
        text: String,
    },

    /// List rooms that are open to join.
    GetActiveRooms,

    /// Fetch the win leaderboard.
    GetLeaderboard {
        /// Maximum entries to return.
        limit: usize,
    },

    /// Request a fresh private snapshot (reconnection resync).
    SyncRequest,

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Authentication request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Externally-issued JWT.
    pub token: String,
    /// Client version for compatibility checks.
    pub client_version: String,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Events sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Authentication result.
    AuthResult(AuthResult),

    /// Full per-viewer room snapshot. Sent after every committed command.
    RoomUpdate(RoomSnapshot),

    /// A player joined the room.
    PlayerJoined {
        /// Who joined.
        player: PlayerId,
        /// Their display name.
        username: String,
    },

    /// A player left the room.
    PlayerLeft {
        /// Who left.
        player: PlayerId,
        /// Their display name.
        username: String,
        /// New host if the host changed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_host: Option<PlayerId>,
    },

    /// A player's connection dropped; their seat is kept for resync.
    PlayerDisconnected {
        /// Who disconnected.
        player: PlayerId,
        /// Their display name.
        username: String,
    },

    /// The game started.
    GameStarted {
        /// Whose turn it is first.
        first_player: PlayerId,
    },

    /// Private: the card you drew.
    CardDrawn {
        /// The drawn card.
        card: Card,
        /// Cards left in the deck.
        deck_remaining: usize,
    },

    /// Public: someone drew a card (count only).
    PlayerDrewCard {
        /// Who drew.
        player: PlayerId,
        /// Cards left in the deck.
        deck_remaining: usize,
    },

    /// A card was played.
    CardPlayed {
        /// The acting player.
        player: PlayerId,
        /// The card, by name.
        card: Card,
        /// Human-readable resolution line.
        log: String,
    },

    /// Private: Debugger output for the actor.
    Reveal {
        /// Whose hand was inspected.
        target: PlayerId,
        /// Their display name.
        username: String,
        /// The cards they hold.
        hand: Vec<Card>,
        /// Their last play this turn.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_played: Option<Card>,
    },

    /// A challenge was adjudicated.
    ChallengeResolved {
        /// Who disputed the play.
        challenger: PlayerId,
        /// Whose play was disputed.
        actor: PlayerId,
        /// The disputed card.
        card: Card,
        /// True when the play stood.
        legitimate: bool,
        /// Human-readable outcome line.
        log: String,
    },

    /// A player was eliminated.
    PlayerEliminated {
        /// Who was eliminated.
        player: PlayerId,
        /// Their display name.
        username: String,
        /// Human-readable line.
        log: String,
    },

    /// The turn moved on.
    TurnEnded {
        /// Whose turn it is now.
        next_player: PlayerId,
        /// The new turn number.
        turn_number: u32,
    },

    /// The game is over.
    GameEnded {
        /// Winner's username, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner: Option<String>,
    },

    /// Chat passthrough.
    ChatMessage {
        /// Sender.
        player: PlayerId,
        /// Sender's display name.
        username: String,
        /// The message text.
        text: String,
        /// Server receive time (unix millis).
        timestamp: u64,
    },

    /// Rooms open to join.
    ActiveRooms {
        /// One entry per live room.
        rooms: Vec<RoomListing>,
    },

    /// Win leaderboard.
    Leaderboard {
        /// Ranked entries.
        entries: Vec<LeaderboardEntry>,
    },

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server time (unix millis).
        server_time: u64,
    },

    /// Command failed; nothing changed.
    Error(ErrorReply),

    /// Server is shutting down.
    Shutdown {
        /// Why.
        reason: String,
    },
}

/// Authentication result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether auth succeeded.
    pub success: bool,
    /// Your player id if successful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerId>,
    /// Your display name if successful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Error message if failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Server version.
    pub server_version: String,
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// One player's seat as seen by a particular viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Player id.
    pub player: PlayerId,
    /// Display name.
    pub username: String,
    /// Remaining life tokens.
    pub life_tokens: u8,
    /// How many cards they hold.
    pub hand_count: usize,
    /// The cards themselves; present only for the viewer's own seat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    /// Lobby readiness.
    pub ready: bool,
    /// Out of the game.
    pub eliminated: bool,
    /// Shield up (played openly, so public).
    pub firewall: bool,
    /// Cloak up (played openly, so public).
    pub vpn_cloak: bool,
    /// May challenge the pending play.
    pub can_challenge: bool,
    /// Their last play this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played: Option<Card>,
    /// Hosting the room.
    pub is_host: bool,
}

/// Full room snapshot, redacted for one viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Room code.
    pub room_code: String,
    /// Room display name.
    pub room_name: String,
    /// Current host.
    pub host: PlayerId,
    /// Seat limit.
    pub max_players: usize,
    /// Lifecycle phase.
    pub phase: GamePhase,
    /// All seats, in turn order.
    pub players: Vec<PlayerSnapshot>,
    /// Cards left in the deck.
    pub deck_count: usize,
    /// The discard pile (public knowledge).
    pub discard: Vec<Card>,
    /// Whose turn it is, once playing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player: Option<PlayerId>,
    /// Turn counter.
    pub turn_number: u32,
    /// A challengeable play is awaiting resolution.
    pub challenge_open: bool,
    /// Winner's username once ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl RoomSnapshot {
    /// Render a room for one viewer, hiding everyone else's cards.
    pub fn for_player(room: &RoomState, viewer: PlayerId) -> Self {
        let players = room
            .seats
            .iter()
            .map(|seat| PlayerSnapshot {
                player: seat.id,
                username: seat.username.clone(),
                life_tokens: seat.life_tokens,
                hand_count: seat.hand.len(),
                hand: (seat.id == viewer).then(|| seat.hand.clone()),
                ready: seat.ready,
                eliminated: seat.eliminated,
                firewall: seat.firewall,
                vpn_cloak: seat.vpn_cloak,
                can_challenge: seat.can_challenge,
                last_played: seat.last_played,
                is_host: seat.id == room.host,
            })
            .collect();

        Self {
            room_code: room.code.clone(),
            room_name: room.name.clone(),
            host: room.host,
            max_players: room.max_players,
            phase: room.phase,
            players,
            deck_count: room.deck.len(),
            discard: room.discard.clone(),
            current_player: (room.phase == GamePhase::Playing)
                .then(|| room.current_seat().map(|s| s.id))
                .flatten(),
            turn_number: room.turn_number,
            challenge_open: room.challenge_open(),
            winner: room.winner.clone(),
        }
    }
}

/// A row in the active-rooms listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomListing {
    /// Room code.
    pub room_code: String,
    /// Room display name.
    pub room_name: String,
    /// Seated players.
    pub players: usize,
    /// Seat limit.
    pub max_players: usize,
    /// Lifecycle phase.
    pub phase: GamePhase,
}

/// A leaderboard row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player id.
    pub player: PlayerId,
    /// Display name.
    pub username: String,
    /// Games won.
    pub wins: u32,
    /// Games finished.
    pub games_played: u32,
}

impl From<PlayerStats> for LeaderboardEntry {
    fn from(stats: PlayerStats) -> Self {
        Self {
            player: stats.player,
            username: stats.username,
            wins: stats.wins,
            games_played: stats.games_played,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Structured command failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Failure class.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Failure classes, mirroring the engine's error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Authentication failed at handshake.
    AuthFailed,
    /// Command sent before authenticating.
    NotAuthenticated,
    /// Message could not be parsed.
    InvalidCommand,
    /// No room with that code.
    RoomNotFound,
    /// Not currently seated in a room.
    NotInRoom,
    /// Rule validation rejected the command.
    ValidationFailed,
    /// A precondition (start requirements, challenge permission) was unmet.
    PreconditionFailed,
    /// Persistence unavailable; retry the command.
    InfrastructureError,
    /// Unexpected server fault.
    InternalError,
}

impl ErrorReply {
    /// Map a rules rejection onto the wire taxonomy.
    pub fn from_rules(err: &RulesError) -> Self {
        let code = match err {
            RulesError::NotEnoughPlayers
            | RulesError::PlayersNotReady
            | RulesError::NotHost
            | RulesError::ChallengeNotAllowed
            | RulesError::NothingToChallenge => ErrorCode::PreconditionFailed,
            _ => ErrorCode::ValidationFailed,
        };
        Self {
            code,
            message: err.to_string(),
        }
    }

    /// Map a persistence failure onto the wire taxonomy.
    pub fn from_store(err: &StoreError) -> Self {
        Self {
            code: ErrorCode::InfrastructureError,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientCommand {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerEvent {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Seat;

    fn pid(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    #[test]
    fn test_client_command_json_roundtrip() {
        let msg = ClientCommand::PlayCard {
            card: Card::Botnet,
            target: Some(pid(2)),
        };

        let json = msg.to_json().unwrap();
        assert!(json.contains("play_card"));
        assert!(json.contains("botnet"));

        let parsed = ClientCommand::from_json(&json).unwrap();
        if let ClientCommand::PlayCard { card, target } = parsed {
            assert_eq!(card, Card::Botnet);
            assert_eq!(target, Some(pid(2)));
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_play_card_without_target() {
        let parsed =
            ClientCommand::from_json(r#"{"type":"play_card","card":"firewall"}"#).unwrap();
        if let ClientCommand::PlayCard { card, target } = parsed {
            assert_eq!(card, Card::Firewall);
            assert!(target.is_none());
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_server_event_json_roundtrip() {
        let msg = ServerEvent::CardPlayed {
            player: pid(1),
            card: Card::ExploitScript,
            log: "p1 runs an Exploit Script on p2".into(),
        };

        let json = msg.to_json().unwrap();
        assert!(json.contains("card_played"));

        let parsed = ServerEvent::from_json(&json).unwrap();
        if let ServerEvent::CardPlayed { card, .. } = parsed {
            assert_eq!(card, Card::ExploitScript);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_snapshot_redacts_other_hands() {
        let viewer = pid(1);
        let other = pid(2);
        let mut room = RoomState::new("HEIST1", "vault", viewer, "alice", 4);
        room.seats[0].hand = vec![Card::MasterAlgorithm];
        let mut bob = Seat::new(other, "bob");
        bob.hand = vec![Card::Botnet, Card::EncryptionKey];
        room.seats.push(bob);

        let snap = RoomSnapshot::for_player(&room, viewer);

        assert_eq!(snap.players[0].hand, Some(vec![Card::MasterAlgorithm]));
        assert_eq!(snap.players[0].hand_count, 1);
        assert!(snap.players[1].hand.is_none());
        assert_eq!(snap.players[1].hand_count, 2);
        assert!(snap.players[0].is_host);

        // Nothing about bob's cards leaks through serialization.
        let json = ServerEvent::RoomUpdate(snap).to_json().unwrap();
        assert!(!json.contains("encryption_key"));
    }

    #[test]
    fn test_snapshot_current_player_only_when_playing() {
        let host = pid(1);
        let room = RoomState::new("HEIST1", "vault", host, "alice", 4);
        let snap = RoomSnapshot::for_player(&room, host);
        assert!(snap.current_player.is_none());
        assert_eq!(snap.phase, GamePhase::Waiting);
    }

    #[test]
    fn test_error_taxonomy_mapping() {
        let precondition = ErrorReply::from_rules(&RulesError::NotHost);
        assert_eq!(precondition.code, ErrorCode::PreconditionFailed);

        let validation = ErrorReply::from_rules(&RulesError::NotYourTurn);
        assert_eq!(validation.code, ErrorCode::ValidationFailed);

        let infra = ErrorReply::from_store(&StoreError::Unavailable("down".into()));
        assert_eq!(infra.code, ErrorCode::InfrastructureError);

        let json = ServerEvent::Error(infra).to_json().unwrap();
        assert!(json.contains("infrastructure_error"));
    }

    #[test]
    fn test_auth_roundtrip() {
        let msg = ClientCommand::Auth(AuthRequest {
            token: "abc.def.ghi".into(),
            client_version: "1.0.0".into(),
        });
        let json = msg.to_json().unwrap();
        let parsed = ClientCommand::from_json(&json).unwrap();
        assert!(matches!(parsed, ClientCommand::Auth(_)));
    }
}
