//! Game Events
//!
//! Internal events emitted by the rules functions. The room coordinator
//! converts these into wire events for broadcast; `log_line` supplies the
//! human-readable resolution text that rides along with `cardPlayed` and
//! friends.

use serde::{Deserialize, Serialize};

use crate::game::card::Card;
use crate::game::state::PlayerId;

/// Why a player left active play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationReason {
    /// Life tokens reached zero.
    OutOfLifeTokens,
    /// Forced to discard the Master Algorithm.
    LostMasterAlgorithm,
    /// Challenged a legitimate play.
    FailedChallenge,
    /// Caught by a successful challenge.
    CaughtBluffing,
    /// Left the room mid-game.
    Left,
}

/// One entry in a room's event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A player took a seat.
    PlayerJoined {
        /// Who joined.
        player: PlayerId,
        /// Their display name.
        username: String,
    },

    /// A player gave up their seat.
    PlayerLeft {
        /// Who left.
        player: PlayerId,
        /// Their display name.
        username: String,
        /// New host, when the departing player was hosting.
        new_host: Option<PlayerId>,
    },

    /// The game started.
    GameStarted {
        /// Seat order after the start shuffle.
        first_player: PlayerId,
    },

    /// A player drew a card. The card itself goes only to the drawer.
    CardDrawn {
        /// Who drew.
        player: PlayerId,
        /// Cards left in the draw pile afterwards.
        deck_remaining: usize,
    },

    /// A card was played and its effect resolved (or was blocked).
    CardPlayed {
        /// The acting player.
        actor: PlayerId,
        /// The card played.
        card: Card,
        /// Human-readable resolution line.
        detail: String,
    },

    /// A challenge was adjudicated.
    ChallengeResolved {
        /// Who disputed the play.
        challenger: PlayerId,
        /// Whose play was disputed.
        actor: PlayerId,
        /// The disputed card.
        card: Card,
        /// True when the play stood and the challenger paid for it.
        legitimate: bool,
    },

    /// A player is out of the game.
    PlayerEliminated {
        /// Who was eliminated.
        player: PlayerId,
        /// Their display name.
        username: String,
        /// Why.
        reason: EliminationReason,
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
        /// Winner's username, if a single player survived.
        winner: Option<String>,
    },
}

impl GameEvent {
    /// Human-readable line for room logs and broadcasts.
    pub fn log_line(&self) -> String {
        match self {
            GameEvent::PlayerJoined { username, .. } => format!("{username} joined the room"),
            GameEvent::PlayerLeft { username, .. } => format!("{username} left the room"),
            GameEvent::GameStarted { .. } => "The heist is on".to_string(),
            GameEvent::CardDrawn { deck_remaining, .. } => {
                format!("A card was drawn ({deck_remaining} left in the deck)")
            }
            GameEvent::CardPlayed { detail, .. } => detail.clone(),
            GameEvent::ChallengeResolved { card, legitimate, .. } => {
                if *legitimate {
                    format!("Challenge failed: the {} was legitimate", card.display_name())
                } else {
                    format!("Challenge succeeded: the {} was a bluff", card.display_name())
                }
            }
            GameEvent::PlayerEliminated { username, reason, .. } => match reason {
                EliminationReason::OutOfLifeTokens => format!("{username} is out of life tokens"),
                EliminationReason::LostMasterAlgorithm => {
                    format!("{username} lost the Master Algorithm and is eliminated")
                }
                EliminationReason::FailedChallenge => {
                    format!("{username} challenged a legitimate play and is eliminated")
                }
                EliminationReason::CaughtBluffing => {
                    format!("{username} was caught bluffing and is eliminated")
                }
                EliminationReason::Left => format!("{username} abandoned the heist"),
            },
            GameEvent::TurnEnded { turn_number, .. } => format!("Turn {turn_number} begins"),
            GameEvent::GameEnded { winner } => match winner {
                Some(name) => format!("{name} wins the heist"),
                None => "The heist ends with no survivor".to_string(),
            },
        }
    }
}
