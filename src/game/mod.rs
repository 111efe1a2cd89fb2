//! Rules Engine
//!
//! All game logic for a Code Heist room. Pure state-in, state-out: no I/O,
//! no channels, no persistence. The room coordinator in `network/room`
//! drives these functions from its serialized command loop.
//!
//! ## Module Structure
//!
//! - `card`: the card catalogue, weight/challenge tables, deck operations
//! - `state`: room and per-player state
//! - `turn`: lobby and turn state machine (start, end-turn, win detection)
//! - `effect`: card-effect resolution for `playCard`
//! - `challenge`: bluff-challenge adjudication
//! - `events`: internal event log emitted by the rules functions

pub mod card;
pub mod challenge;
pub mod effect;
pub mod events;
pub mod state;
pub mod turn;

// Re-export key types
pub use card::{Card, CardKind, DECK_SIZE};
pub use events::{EliminationReason, GameEvent};
pub use state::{GamePhase, PendingPlay, PlayerId, RoomState, Seat};

/// A rejected command.
///
/// Validation and precondition failures are returned to the issuing client
/// as structured errors; they never mutate room state and are never
/// broadcast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// Command issued by someone other than the current player.
    #[error("not your turn")]
    NotYourTurn,

    /// Room is at its seat limit.
    #[error("room is full")]
    RoomFull,

    /// Player already holds a seat in this room.
    #[error("already in this room")]
    AlreadyInRoom,

    /// Player holds no seat in this room.
    #[error("not in this room")]
    NotInRoom,

    /// Lobby-only command issued after the game started.
    #[error("game already in progress")]
    GameInProgress,

    /// In-game command issued before the game started (or after it ended).
    #[error("game is not running")]
    GameNotRunning,

    /// The named card is not in the actor's hand.
    #[error("card not in hand")]
    CardNotInHand,

    /// Key-gated card played without an Encryption Key in hand.
    #[error("requires an Encryption Key")]
    MissingPrerequisite,

    /// Encryption Key and Master Algorithm cannot be played directly.
    #[error("this card cannot be played directly")]
    IllegalPlay,

    /// The card needs a target and none was given.
    #[error("this card requires a target")]
    TargetRequired,

    /// Target missing, eliminated, or otherwise not a valid choice.
    #[error("target is not eligible")]
    TargetIneligible,

    /// Hand already at capacity.
    #[error("hand is full")]
    HandFull,

    /// Fewer than two seated players.
    #[error("need at least two players to start")]
    NotEnoughPlayers,

    /// A non-host player has not readied up.
    #[error("not all players are ready")]
    PlayersNotReady,

    /// Start requested by a non-host player.
    #[error("only the host can start the game")]
    NotHost,

    /// Challenge issued without permission (flag not set, or eliminated).
    #[error("you cannot challenge this play")]
    ChallengeNotAllowed,

    /// Challenge issued with no play pending.
    #[error("there is no play to challenge")]
    NothingToChallenge,

    /// A challengeable play is still awaiting resolution.
    #[error("a play is awaiting challenges")]
    ChallengeWindowOpen,

    /// Both the deck and the discard pile are empty.
    #[error("no cards left to draw")]
    EmptyDeck,
}
