//! Card Catalogue and Deck Operations
//!
//! The closed set of Code Heist cards plus the draw/discard pile logic.
//! All per-card data (tier, weight, key requirement, challengeability,
//! copies in the deck) lives here as exhaustive matches so an unhandled
//! card kind is a compile error, not a runtime surprise.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::RulesError;

/// Total cards in a freshly built deck.
///
/// Committed room states must satisfy
/// `deck + discard + all hands == DECK_SIZE` once a game has started.
pub const DECK_SIZE: usize = 26;

/// Card tier, mirroring how the catalogue groups effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// Protects the holder (Firewall, VPN Cloak).
    Defense,
    /// Reveals hidden information (Debugger).
    Recon,
    /// Costs the target (or the attacker) a life token (Botnet, Exploit Script).
    Attack,
    /// Exchanges hands (System Override).
    Swap,
    /// Cannot be played on its own, only spent alongside another card (Encryption Key).
    Mandatory,
    /// Cannot be played at all; losing it is instant elimination (Master Algorithm).
    Ultimate,
}

/// The eight cards of the Code Heist catalogue.
///
/// Card instances have no identity beyond their name; they move between
/// the deck, hands, and the discard pile as plain values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Card {
    /// One-turn shield: absorbs the next attack against the holder.
    Firewall,
    /// Peek at a target's hand and discards. Information goes to the actor only.
    Debugger,
    /// Key-gated attack resolved by comparing hand weights.
    Botnet,
    /// One-turn cloak: attacks and swaps against the holder fizzle.
    VpnCloak,
    /// Key-gated hand swap with a target.
    SystemOverride,
    /// Spent alongside Botnet or System Override; never played alone.
    EncryptionKey,
    /// The prize. Unplayable, and losing it eliminates you on the spot.
    MasterAlgorithm,
    /// Forces the target to discard a random card.
    ExploitScript,
}

impl Card {
    /// Every card name, one entry each.
    pub const CATALOGUE: [Card; 8] = [
        Card::Firewall,
        Card::Debugger,
        Card::Botnet,
        Card::VpnCloak,
        Card::SystemOverride,
        Card::EncryptionKey,
        Card::MasterAlgorithm,
        Card::ExploitScript,
    ];

    /// The card's tier.
    pub fn kind(self) -> CardKind {
        match self {
            Card::Firewall | Card::VpnCloak => CardKind::Defense,
            Card::Debugger => CardKind::Recon,
            Card::Botnet | Card::ExploitScript => CardKind::Attack,
            Card::SystemOverride => CardKind::Swap,
            Card::EncryptionKey => CardKind::Mandatory,
            Card::MasterAlgorithm => CardKind::Ultimate,
        }
    }

    /// Strength used to resolve Botnet duels.
    pub fn weight(self) -> u32 {
        match self {
            Card::MasterAlgorithm => 10,
            Card::SystemOverride => 8,
            Card::Botnet | Card::ExploitScript => 6,
            Card::Firewall => 4,
            Card::Debugger | Card::VpnCloak => 3,
            Card::EncryptionKey => 2,
        }
    }

    /// Whether playing this card also consumes an Encryption Key.
    pub fn requires_key(self) -> bool {
        matches!(self, Card::Botnet | Card::SystemOverride)
    }

    /// Whether a play of this card opens a challenge window.
    pub fn challengeable(self) -> bool {
        matches!(
            self,
            Card::SystemOverride | Card::Botnet | Card::ExploitScript | Card::Debugger
        )
    }

    /// Copies of this card in a standard deck.
    ///
    /// Master Algorithm and System Override are unique; the rest fill the
    /// deck out to [`DECK_SIZE`] cards.
    pub fn copies(self) -> usize {
        match self {
            Card::Firewall => 4,
            Card::Debugger => 4,
            Card::Botnet => 3,
            Card::VpnCloak => 4,
            Card::SystemOverride => 1,
            Card::EncryptionKey => 5,
            Card::MasterAlgorithm => 1,
            Card::ExploitScript => 4,
        }
    }

    /// Human-readable name, as shown in resolution log lines.
    pub fn display_name(self) -> &'static str {
        match self {
            Card::Firewall => "Firewall",
            Card::Debugger => "Debugger",
            Card::Botnet => "Botnet",
            Card::VpnCloak => "VPN Cloak",
            Card::SystemOverride => "System Override",
            Card::EncryptionKey => "Encryption Key",
            Card::MasterAlgorithm => "Master Algorithm",
            Card::ExploitScript => "Exploit Script",
        }
    }
}

/// Sum of [`Card::weight`] over a hand.
pub fn hand_weight(hand: &[Card]) -> u32 {
    hand.iter().map(|c| c.weight()).sum()
}

/// Build an unshuffled standard deck with the fixed multiplicity table.
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for card in Card::CATALOGUE {
        for _ in 0..card.copies() {
            deck.push(card);
        }
    }
    debug_assert_eq!(deck.len(), DECK_SIZE);
    deck
}

/// Shuffle a pile in place (Fisher–Yates via `rand`).
///
/// Casual-play randomness; nothing here is cryptographically strong.
pub fn shuffle<R: Rng>(pile: &mut [Card], rng: &mut R) {
    pile.shuffle(rng);
}

/// Draw the next card: pop from the back of the deck.
///
/// An empty deck reshuffles the discard pile into a fresh deck first.
/// Fails with [`RulesError::EmptyDeck`] only when both piles are empty,
/// which conservation rules out unless every remaining card is in hands.
pub fn draw<R: Rng>(
    deck: &mut Vec<Card>,
    discard: &mut Vec<Card>,
    rng: &mut R,
) -> Result<Card, RulesError> {
    if deck.is_empty() {
        if discard.is_empty() {
            return Err(RulesError::EmptyDeck);
        }
        deck.append(discard);
        shuffle(deck, rng);
    }
    // Non-empty after the reshuffle above.
    deck.pop().ok_or(RulesError::EmptyDeck)
}

/// Move a card to the discard pile. Always succeeds.
pub fn discard(discard_pile: &mut Vec<Card>, card: Card) {
    discard_pile.push(card);
}
