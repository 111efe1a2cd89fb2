//! Room and Player State
//!
//! All state for one game room. These types are plain data: every
//! mutation goes through the rules functions in `turn`, `effect`, and
//! `challenge`, invoked from the room coordinator's serialized command
//! loop.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::game::card::Card;

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier (16 bytes, derived from the auth subject).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub [u8; 16]);

impl PlayerId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Full hex form, used on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the wire form (32 hex chars).
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 16] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl Serialize for PlayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PlayerId::from_hex(&s).ok_or_else(|| serde::de::Error::custom("expected 32 hex chars"))
    }
}

// =============================================================================
// GAME PHASE
// =============================================================================

/// Room lifecycle phase. `Ended` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Lobby: players joining and readying up.
    Waiting,
    /// Game running: turn machine active.
    Playing,
    /// Game over. The room lingers until reaped.
    Ended,
}

// =============================================================================
// SEAT (per-player state)
// =============================================================================

/// Hand capacity. A swap momentarily exceeds this per player but always
/// preserves each player's card count.
pub const HAND_CAPACITY: usize = 2;

/// One player's state inside a room.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Seat {
    /// Stable player identifier.
    pub id: PlayerId,
    /// Display name from the auth layer.
    pub username: String,
    /// Remaining lives. Zero implies eliminated.
    pub life_tokens: u8,
    /// Held cards (up to [`HAND_CAPACITY`]).
    pub hand: Vec<Card>,
    /// Lobby readiness. The host is implicitly ready.
    pub ready: bool,
    /// Out of the game.
    pub eliminated: bool,
    /// One-turn shield: absorbs the next attack, then clears.
    pub firewall: bool,
    /// One-turn cloak: attacks and swaps against this seat fizzle.
    pub vpn_cloak: bool,
    /// May dispute the current pending play.
    pub can_challenge: bool,
    /// Most recent play this turn, the thing a challenge disputes.
    pub last_played: Option<Card>,
}

impl Seat {
    /// Create a fresh lobby seat.
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            life_tokens: 0,
            hand: Vec::new(),
            ready: false,
            eliminated: false,
            firewall: false,
            vpn_cloak: false,
            can_challenge: false,
            last_played: None,
        }
    }

    /// Still in the game.
    pub fn alive(&self) -> bool {
        !self.eliminated
    }

    /// Whether the hand holds the given card.
    pub fn holds(&self, card: Card) -> bool {
        self.hand.contains(&card)
    }

    /// Remove one copy of `card` from the hand, if present.
    pub fn take_card(&mut self, card: Card) -> Option<Card> {
        let idx = self.hand.iter().position(|c| *c == card)?;
        Some(self.hand.remove(idx))
    }

    /// Reset the per-game transient flags (game start).
    pub fn clear_transient(&mut self) {
        self.firewall = false;
        self.vpn_cloak = false;
        self.can_challenge = false;
        self.last_played = None;
    }
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// A challengeable play awaiting either a challenge or the actor's
/// end-of-turn. While set, no further plays are accepted.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PendingPlay {
    /// Who played the card.
    pub actor: PlayerId,
    /// The card they played.
    pub card: Card,
}

/// Complete state of one room.
///
/// Mutated exclusively through the coordinator's serialized command loop;
/// the rules functions take `&mut RoomState` and either fully apply or
/// return an error leaving the state untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomState {
    /// Short alphanumeric room code, unique among live rooms.
    pub code: String,
    /// Display name chosen at creation.
    pub name: String,
    /// Current host. Reassigned if the host leaves.
    pub host: PlayerId,
    /// Seat limit (2–8).
    pub max_players: usize,
    /// Ordered seats. Turn order after game start.
    pub seats: Vec<Seat>,
    /// Draw pile; the back is the next draw.
    pub deck: Vec<Card>,
    /// Discard pile (unordered bag, kept as a Vec).
    pub discard: Vec<Card>,
    /// Lifecycle phase.
    pub phase: GamePhase,
    /// Index into `seats` of the player whose turn it is.
    pub current_turn: usize,
    /// 1-based turn counter.
    pub turn_number: u32,
    /// Open challenge window, if any.
    pub pending_play: Option<PendingPlay>,
    /// Winner's username once the game has ended with one.
    pub winner: Option<String>,
}

impl RoomState {
    /// Create a lobby room with the host seated.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        host: PlayerId,
        host_name: impl Into<String>,
        max_players: usize,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            host,
            max_players,
            seats: vec![Seat::new(host, host_name)],
            deck: Vec::new(),
            discard: Vec::new(),
            phase: GamePhase::Waiting,
            current_turn: 0,
            turn_number: 0,
            pending_play: None,
            winner: None,
        }
    }

    /// Find a seat by player id.
    pub fn seat(&self, id: PlayerId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == id)
    }

    /// Find a seat mutably by player id.
    pub fn seat_mut(&mut self, id: PlayerId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.id == id)
    }

    /// Index of a player's seat.
    pub fn seat_index(&self, id: PlayerId) -> Option<usize> {
        self.seats.iter().position(|s| s.id == id)
    }

    /// The seat whose turn it is.
    pub fn current_seat(&self) -> Option<&Seat> {
        self.seats.get(self.current_turn)
    }

    /// Whether it is this player's turn.
    pub fn is_current(&self, id: PlayerId) -> bool {
        self.current_seat().map(|s| s.id == id).unwrap_or(false)
    }

    /// Seats still in the game.
    pub fn alive_count(&self) -> usize {
        self.seats.iter().filter(|s| s.alive()).count()
    }

    /// Conservation check: cards across deck, discard, and hands.
    pub fn total_cards(&self) -> usize {
        self.deck.len()
            + self.discard.len()
            + self.seats.iter().map(|s| s.hand.len()).sum::<usize>()
    }

    /// A challengeable play is awaiting resolution.
    pub fn challenge_open(&self) -> bool {
        self.pending_play.is_some()
    }

    /// Close the challenge window and clear every challenge flag.
    pub fn close_challenge_window(&mut self) {
        self.pending_play = None;
        for seat in &mut self.seats {
            seat.can_challenge = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_hex_roundtrip() {
        let id = PlayerId::new([0xab; 16]);
        let hex = id.to_hex();
        assert_eq!(hex.len(), 32);
        assert_eq!(PlayerId::from_hex(&hex), Some(id));
        assert_eq!(PlayerId::from_hex("zz"), None);
    }

    #[test]
    fn test_player_id_serde_as_string() {
        let id = PlayerId::new([1; 16]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let back: PlayerId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_take_card_removes_one_copy() {
        let mut seat = Seat::new(PlayerId::default(), "alice");
        seat.hand = vec![Card::Firewall, Card::Firewall];

        assert_eq!(seat.take_card(Card::Firewall), Some(Card::Firewall));
        assert_eq!(seat.hand.len(), 1);
        assert_eq!(seat.take_card(Card::Botnet), None);
    }

    #[test]
    fn test_new_room_seats_host() {
        let host = PlayerId::new([7; 16]);
        let room = RoomState::new("ABC123", "heist", host, "eve", 4);

        assert_eq!(room.phase, GamePhase::Waiting);
        assert_eq!(room.seats.len(), 1);
        assert_eq!(room.seats[0].id, host);
        assert_eq!(room.total_cards(), 0);
    }

    #[test]
    fn test_close_challenge_window_clears_flags() {
        let host = PlayerId::new([1; 16]);
        let mut room = RoomState::new("ROOM", "r", host, "a", 4);
        room.seats.push(Seat::new(PlayerId::new([2; 16]), "b"));
        room.pending_play = Some(PendingPlay {
            actor: host,
            card: Card::Botnet,
        });
        room.seats[1].can_challenge = true;

        room.close_challenge_window();
        assert!(!room.challenge_open());
        assert!(room.seats.iter().all(|s| !s.can_challenge));
    }
}
