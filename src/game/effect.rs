//! Card Effect Resolution
//!
//! Resolves one `playCard` command against room state. Validation happens
//! up front; once the played card (and its Encryption Key, when required)
//! leaves the actor's hand it stays in the discard pile even if the
//! targeted effect is blocked — a shield or cloak stops the effect, not
//! the act of playing.

use rand::Rng;

use crate::game::card::{hand_weight, Card, CardKind};
use crate::game::events::{EliminationReason, GameEvent};
use crate::game::state::{GamePhase, PendingPlay, PlayerId, RoomState};
use crate::game::turn::{eliminate, lose_life_token};
use crate::game::RulesError;

/// Private information returned to a Debugger's actor, never broadcast.
#[derive(Clone, Debug)]
pub struct Reveal {
    /// Whose hand was inspected.
    pub target: PlayerId,
    /// Their display name.
    pub username: String,
    /// The cards they hold.
    pub hand: Vec<Card>,
    /// What they last played this turn, if anything.
    pub last_played: Option<Card>,
}

/// Result of a resolved play.
#[derive(Debug, Default)]
pub struct PlayOutcome {
    /// Public events, `CardPlayed` first.
    pub events: Vec<GameEvent>,
    /// Debugger peek, delivered only to the actor.
    pub reveal: Option<Reveal>,
}

impl PlayOutcome {
    fn new() -> Self {
        Self::default()
    }
}

/// Whether this card's effect needs a target seat.
fn needs_target(card: Card) -> bool {
    matches!(
        card,
        Card::Debugger | Card::Botnet | Card::SystemOverride | Card::ExploitScript
    )
}

/// Resolve a `playCard` command.
///
/// On success the played card (plus key, when required) is in the discard
/// pile, the effect has been applied or blocked, and a challenge window
/// is armed for challengeable cards. On error the room is untouched.
pub fn play_card<R: Rng>(
    room: &mut RoomState,
    actor: PlayerId,
    card: Card,
    target: Option<PlayerId>,
    rng: &mut R,
) -> Result<PlayOutcome, RulesError> {
    if room.phase != GamePhase::Playing {
        return Err(RulesError::GameNotRunning);
    }
    if room.challenge_open() {
        return Err(RulesError::ChallengeWindowOpen);
    }
    if !room.is_current(actor) {
        return Err(RulesError::NotYourTurn);
    }

    let actor_idx = room.current_turn;
    if !room.seats[actor_idx].holds(card) {
        return Err(RulesError::CardNotInHand);
    }
    if matches!(card.kind(), CardKind::Mandatory | CardKind::Ultimate) {
        return Err(RulesError::IllegalPlay);
    }
    if card.requires_key() && !room.seats[actor_idx].holds(Card::EncryptionKey) {
        return Err(RulesError::MissingPrerequisite);
    }

    let target_idx = if needs_target(card) {
        let target_id = target.ok_or(RulesError::TargetRequired)?;
        if target_id == actor {
            return Err(RulesError::TargetIneligible);
        }
        let idx = room
            .seat_index(target_id)
            .ok_or(RulesError::TargetIneligible)?;
        if !room.seats[idx].alive() {
            return Err(RulesError::TargetIneligible);
        }
        Some(idx)
    } else {
        None
    };

    let actor_name = room.seats[actor_idx].username.clone();
    // Duel weights are measured as the hands stood at play time, before
    // the played card and key leave the actor's hand.
    let actor_weight = hand_weight(&room.seats[actor_idx].hand);

    // The play itself is committed from here on.
    if let Some(played) = room.seats[actor_idx].take_card(card) {
        room.discard.push(played);
    }
    if card.requires_key() {
        if let Some(key) = room.seats[actor_idx].take_card(Card::EncryptionKey) {
            room.discard.push(key);
        }
    }
    room.seats[actor_idx].last_played = Some(card);

    let mut outcome = PlayOutcome::new();
    let mut after = Vec::new();
    let detail = match card {
        Card::Firewall => {
            room.seats[actor_idx].firewall = true;
            format!("{actor_name} raises a Firewall")
        }
        Card::VpnCloak => {
            room.seats[actor_idx].vpn_cloak = true;
            format!("{actor_name} slips behind a VPN Cloak")
        }
        Card::Debugger => {
            let idx = target_idx.ok_or(RulesError::TargetRequired)?;
            let seat = &room.seats[idx];
            outcome.reveal = Some(Reveal {
                target: seat.id,
                username: seat.username.clone(),
                hand: seat.hand.clone(),
                last_played: seat.last_played,
            });
            format!("{actor_name} runs a Debugger on {}", seat.username)
        }
        Card::Botnet => resolve_botnet(room, actor, actor_idx, actor_weight, target_idx, &mut after)?,
        Card::SystemOverride => resolve_override(room, actor_idx, target_idx)?,
        Card::ExploitScript => resolve_exploit(room, actor_idx, target_idx, rng, &mut after)?,
        Card::EncryptionKey | Card::MasterAlgorithm => {
            // Unreachable: rejected as IllegalPlay above.
            return Err(RulesError::IllegalPlay);
        }
    };

    outcome.events.push(GameEvent::CardPlayed {
        actor,
        card,
        detail,
    });
    outcome.events.extend(after);

    // Arm the challenge window, unless the play already ended the game or
    // took the actor down with it.
    let actor_alive = room.seat(actor).map(|s| s.alive()).unwrap_or(false);
    if card.challengeable() && room.phase == GamePhase::Playing && actor_alive {
        room.pending_play = Some(PendingPlay { actor, card });
        for seat in &mut room.seats {
            if seat.id != actor && seat.alive() {
                seat.can_challenge = true;
            }
        }
    }

    Ok(outcome)
}

/// Botnet: weight duel. Shield absorbs (and is consumed), cloak deflects
/// (and is kept). Ties favor the defender; a lost duel costs the actor.
fn resolve_botnet(
    room: &mut RoomState,
    actor: PlayerId,
    actor_idx: usize,
    actor_weight: u32,
    target_idx: Option<usize>,
    after: &mut Vec<GameEvent>,
) -> Result<String, RulesError> {
    let idx = target_idx.ok_or(RulesError::TargetRequired)?;
    let actor_name = room.seats[actor_idx].username.clone();
    let target_name = room.seats[idx].username.clone();
    let target_id = room.seats[idx].id;

    if room.seats[idx].firewall {
        room.seats[idx].firewall = false;
        return Ok(format!(
            "{actor_name} launches a Botnet at {target_name}, but a Firewall absorbs it"
        ));
    }
    if room.seats[idx].vpn_cloak {
        return Ok(format!(
            "{actor_name} launches a Botnet at {target_name}, but the VPN Cloak deflects it"
        ));
    }

    let target_weight = hand_weight(&room.seats[idx].hand);
    if actor_weight > target_weight {
        lose_life_token(room, target_id, after);
        Ok(format!(
            "{actor_name}'s Botnet breaches {target_name} ({actor_weight} vs {target_weight}) — \
             {target_name} loses a life token"
        ))
    } else {
        lose_life_token(room, actor, after);
        Ok(format!(
            "{actor_name}'s Botnet is repelled by {target_name} ({actor_weight} vs {target_weight}) — \
             it backfires and {actor_name} loses a life token"
        ))
    }
}

/// System Override: exchange remaining hands. A cloaked target shrugs it
/// off, but the override and its key stay in the discard pile.
fn resolve_override(
    room: &mut RoomState,
    actor_idx: usize,
    target_idx: Option<usize>,
) -> Result<String, RulesError> {
    let idx = target_idx.ok_or(RulesError::TargetRequired)?;
    let actor_name = room.seats[actor_idx].username.clone();
    let target_name = room.seats[idx].username.clone();

    if room.seats[idx].vpn_cloak {
        return Ok(format!(
            "{actor_name}'s System Override fails against {target_name}'s VPN Cloak"
        ));
    }

    let actor_hand = std::mem::take(&mut room.seats[actor_idx].hand);
    room.seats[actor_idx].hand = std::mem::replace(&mut room.seats[idx].hand, actor_hand);

    Ok(format!(
        "{actor_name} fires a System Override and swaps hands with {target_name}"
    ))
}

/// Exploit Script: force a uniformly-random discard. Shield absorbs (and
/// is consumed), cloak deflects. Losing the Master Algorithm this way is
/// instant elimination, life tokens notwithstanding.
fn resolve_exploit<R: Rng>(
    room: &mut RoomState,
    actor_idx: usize,
    target_idx: Option<usize>,
    rng: &mut R,
    after: &mut Vec<GameEvent>,
) -> Result<String, RulesError> {
    let idx = target_idx.ok_or(RulesError::TargetRequired)?;
    let actor_name = room.seats[actor_idx].username.clone();
    let target_name = room.seats[idx].username.clone();
    let target_id = room.seats[idx].id;

    if room.seats[idx].firewall {
        room.seats[idx].firewall = false;
        return Ok(format!(
            "{actor_name} runs an Exploit Script on {target_name}, but a Firewall absorbs it"
        ));
    }
    if room.seats[idx].vpn_cloak {
        return Ok(format!(
            "{actor_name} runs an Exploit Script on {target_name}, but the VPN Cloak deflects it"
        ));
    }

    if room.seats[idx].hand.is_empty() {
        return Ok(format!(
            "{actor_name} runs an Exploit Script on {target_name}, who had no cards to lose"
        ));
    }

    let pick = rng.gen_range(0..room.seats[idx].hand.len());
    let lost = room.seats[idx].hand.remove(pick);
    room.discard.push(lost);

    if lost == Card::MasterAlgorithm {
        eliminate(room, target_id, EliminationReason::LostMasterAlgorithm, after);
        Ok(format!(
            "{actor_name}'s Exploit Script rips the Master Algorithm from {target_name}"
        ))
    } else {
        Ok(format!(
            "{actor_name}'s Exploit Script makes {target_name} discard a {}",
            lost.display_name()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::DECK_SIZE;
    use crate::game::turn::{join_room, start_game, toggle_ready};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pid(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    /// A started 3-player room with rigged, deterministic hands.
    fn rigged() -> (RoomState, PlayerId, PlayerId, PlayerId) {
        let mut room = RoomState::new("TEST", "t", pid(0), "p0", 8);
        join_room(&mut room, pid(1), "p1").unwrap();
        join_room(&mut room, pid(2), "p2").unwrap();
        toggle_ready(&mut room, pid(1)).unwrap();
        toggle_ready(&mut room, pid(2)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        start_game(&mut room, pid(0), &mut rng).unwrap();

        // Normalize: put dealt cards back and hand out known hands.
        for seat in &mut room.seats {
            let hand: Vec<_> = seat.hand.drain(..).collect();
            room.deck.extend(hand);
            seat.life_tokens = 2;
        }
        let (a, b, c) = (room.seats[0].id, room.seats[1].id, room.seats[2].id);
        (room, a, b, c)
    }

    fn give(room: &mut RoomState, player: PlayerId, cards: &[Card]) {
        for card in cards {
            let pos = room
                .deck
                .iter()
                .position(|c| c == card)
                .expect("card available in deck");
            let card = room.deck.remove(pos);
            room.seat_mut(player).unwrap().hand.push(card);
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(99)
    }

    #[test]
    fn test_firewall_sets_shield_no_window() {
        let (mut room, a, _, _) = rigged();
        give(&mut room, a, &[Card::Firewall]);

        let outcome = play_card(&mut room, a, Card::Firewall, None, &mut rng()).unwrap();

        assert!(room.seat(a).unwrap().firewall);
        assert!(!room.challenge_open());
        assert!(room.seats.iter().all(|s| !s.can_challenge));
        assert_eq!(room.total_cards(), DECK_SIZE);
        assert!(matches!(outcome.events[0], GameEvent::CardPlayed { .. }));
    }

    #[test]
    fn test_vpn_cloak_sets_flag() {
        let (mut room, a, _, _) = rigged();
        give(&mut room, a, &[Card::VpnCloak]);

        play_card(&mut room, a, Card::VpnCloak, None, &mut rng()).unwrap();
        assert!(room.seat(a).unwrap().vpn_cloak);
        assert!(!room.challenge_open());
    }

    #[test]
    fn test_mandatory_and_ultimate_unplayable() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::EncryptionKey, Card::MasterAlgorithm]);

        assert_eq!(
            play_card(&mut room, a, Card::EncryptionKey, None, &mut rng()).unwrap_err(),
            RulesError::IllegalPlay
        );
        assert_eq!(
            play_card(&mut room, a, Card::MasterAlgorithm, Some(b), &mut rng()).unwrap_err(),
            RulesError::IllegalPlay
        );
        assert_eq!(room.seat(a).unwrap().hand.len(), 2);
    }

    #[test]
    fn test_botnet_without_key_rejected() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::Botnet]);

        assert_eq!(
            play_card(&mut room, a, Card::Botnet, Some(b), &mut rng()).unwrap_err(),
            RulesError::MissingPrerequisite
        );
        assert!(room.seat(a).unwrap().holds(Card::Botnet));
    }

    #[test]
    fn test_scenario_b_botnet_breach() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::Botnet, Card::EncryptionKey]); // weight 8
        give(&mut room, b, &[Card::Firewall]); // weight 4, flag not set

        let outcome = play_card(&mut room, a, Card::Botnet, Some(b), &mut rng()).unwrap();

        let target = room.seat(b).unwrap();
        assert_eq!(target.life_tokens, 1);
        assert!(target.alive());
        assert_eq!(room.seat(a).unwrap().life_tokens, 2);
        assert!(room.challenge_open());
        assert!(outcome.events[0].log_line().contains("loses a life token"));
    }

    #[test]
    fn test_botnet_backfires_on_tie() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::Botnet, Card::EncryptionKey]); // 8
        give(&mut room, b, &[Card::Botnet, Card::EncryptionKey]); // 8: tie favors defender

        play_card(&mut room, a, Card::Botnet, Some(b), &mut rng()).unwrap();

        assert_eq!(room.seat(a).unwrap().life_tokens, 1);
        assert_eq!(room.seat(b).unwrap().life_tokens, 2);
    }

    #[test]
    fn test_botnet_backfires_against_heavier_hand() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::Botnet, Card::EncryptionKey]); // 8
        give(&mut room, b, &[Card::MasterAlgorithm]); // 10

        play_card(&mut room, a, Card::Botnet, Some(b), &mut rng()).unwrap();
        assert_eq!(room.seat(a).unwrap().life_tokens, 1);
    }

    #[test]
    fn test_botnet_blocked_by_firewall_consumes_shield() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::Botnet, Card::EncryptionKey]);
        room.seat_mut(b).unwrap().firewall = true;

        play_card(&mut room, a, Card::Botnet, Some(b), &mut rng()).unwrap();

        let target = room.seat(b).unwrap();
        assert!(!target.firewall);
        assert_eq!(target.life_tokens, 2);
        // Card and key discarded even though the effect was blocked.
        assert!(room.discard.contains(&Card::Botnet));
        assert!(room.discard.contains(&Card::EncryptionKey));
    }

    #[test]
    fn test_botnet_blocked_by_cloak_keeps_cloak() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::Botnet, Card::EncryptionKey]);
        room.seat_mut(b).unwrap().vpn_cloak = true;

        play_card(&mut room, a, Card::Botnet, Some(b), &mut rng()).unwrap();

        let target = room.seat(b).unwrap();
        assert!(target.vpn_cloak);
        assert_eq!(target.life_tokens, 2);
    }

    #[test]
    fn test_scenario_c_override_fails_against_cloak_but_discards() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::SystemOverride, Card::EncryptionKey]);
        give(&mut room, b, &[Card::MasterAlgorithm]);
        room.seat_mut(b).unwrap().vpn_cloak = true;

        let outcome = play_card(&mut room, a, Card::SystemOverride, Some(b), &mut rng()).unwrap();

        // No swap happened.
        assert!(room.seat(b).unwrap().holds(Card::MasterAlgorithm));
        assert!(room.seat(a).unwrap().hand.is_empty());
        // But the override and key are in the discard pile.
        assert!(room.discard.contains(&Card::SystemOverride));
        assert!(room.discard.contains(&Card::EncryptionKey));
        assert!(outcome.events[0].log_line().contains("fails"));
        assert_eq!(room.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_override_swaps_remaining_hands() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::SystemOverride, Card::EncryptionKey]);
        give(&mut room, b, &[Card::MasterAlgorithm, Card::Firewall]);

        play_card(&mut room, a, Card::SystemOverride, Some(b), &mut rng()).unwrap();

        // Actor's remaining hand (empty after override+key) went to the
        // target; the target's two cards came back.
        let actor = room.seat(a).unwrap();
        assert_eq!(actor.hand.len(), 2);
        assert!(actor.holds(Card::MasterAlgorithm));
        assert!(room.seat(b).unwrap().hand.is_empty());
        assert_eq!(room.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_scenario_d_exploit_rips_master_algorithm() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::ExploitScript]);
        give(&mut room, b, &[Card::MasterAlgorithm]); // only card: forced pick

        let outcome = play_card(&mut room, a, Card::ExploitScript, Some(b), &mut rng()).unwrap();

        let target = room.seat(b).unwrap();
        assert!(target.eliminated);
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            GameEvent::PlayerEliminated { reason: EliminationReason::LostMasterAlgorithm, .. }
        )));
        assert_eq!(room.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_exploit_random_discard_plain_card() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::ExploitScript]);
        give(&mut room, b, &[Card::Firewall]);

        play_card(&mut room, a, Card::ExploitScript, Some(b), &mut rng()).unwrap();

        let target = room.seat(b).unwrap();
        assert!(target.hand.is_empty());
        assert!(target.alive());
        assert!(room.discard.contains(&Card::Firewall));
    }

    #[test]
    fn test_exploit_empty_hand_is_harmless() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::ExploitScript]);

        let outcome = play_card(&mut room, a, Card::ExploitScript, Some(b), &mut rng()).unwrap();
        assert!(outcome.events[0].log_line().contains("no cards"));
        assert!(room.seat(b).unwrap().alive());
    }

    #[test]
    fn test_debugger_reveals_privately() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::Debugger]);
        give(&mut room, b, &[Card::MasterAlgorithm]);

        let outcome = play_card(&mut room, a, Card::Debugger, Some(b), &mut rng()).unwrap();

        let reveal = outcome.reveal.expect("debugger returns a reveal");
        assert_eq!(reveal.target, b);
        assert_eq!(reveal.hand, vec![Card::MasterAlgorithm]);
        // The public log line names the action but not the cards.
        assert!(!outcome.events[0].log_line().contains("Master Algorithm"));
        assert!(room.challenge_open());
    }

    #[test]
    fn test_challengeable_play_arms_other_players() {
        let (mut room, a, b, c) = rigged();
        give(&mut room, a, &[Card::ExploitScript]);
        give(&mut room, b, &[Card::Firewall]);

        play_card(&mut room, a, Card::ExploitScript, Some(b), &mut rng()).unwrap();

        assert!(room.challenge_open());
        assert!(!room.seat(a).unwrap().can_challenge);
        assert!(room.seat(b).unwrap().can_challenge);
        assert!(room.seat(c).unwrap().can_challenge);
        assert_eq!(room.seat(a).unwrap().last_played, Some(Card::ExploitScript));
    }

    #[test]
    fn test_second_play_blocked_while_window_open() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::Debugger, Card::Firewall]);

        play_card(&mut room, a, Card::Debugger, Some(b), &mut rng()).unwrap();
        assert_eq!(
            play_card(&mut room, a, Card::Firewall, None, &mut rng()).unwrap_err(),
            RulesError::ChallengeWindowOpen
        );
    }

    #[test]
    fn test_wrong_turn_rejected_without_mutation() {
        let (mut room, _, b, _) = rigged();
        give(&mut room, b, &[Card::Firewall]);
        let snapshot = format!("{room:?}");

        assert_eq!(
            play_card(&mut room, b, Card::Firewall, None, &mut rng()).unwrap_err(),
            RulesError::NotYourTurn
        );
        assert_eq!(format!("{room:?}"), snapshot);
    }

    #[test]
    fn test_eliminated_target_rejected() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::ExploitScript]);
        room.seat_mut(b).unwrap().eliminated = true;

        assert_eq!(
            play_card(&mut room, a, Card::ExploitScript, Some(b), &mut rng()).unwrap_err(),
            RulesError::TargetIneligible
        );
        assert!(room.seat(a).unwrap().holds(Card::ExploitScript));
    }

    #[test]
    fn test_backfire_elimination_skips_challenge_window() {
        let (mut room, a, b, _) = rigged();
        give(&mut room, a, &[Card::Botnet, Card::EncryptionKey]);
        give(&mut room, b, &[Card::MasterAlgorithm]);
        room.seat_mut(a).unwrap().life_tokens = 1;

        let outcome = play_card(&mut room, a, Card::Botnet, Some(b), &mut rng()).unwrap();

        assert!(room.seat(a).unwrap().eliminated);
        assert!(!room.challenge_open());
        assert!(outcome.events.iter().any(|e| matches!(
            e,
            GameEvent::PlayerEliminated { reason: EliminationReason::OutOfLifeTokens, .. }
        )));
        // Turn moved off the dead actor.
        assert!(room.seats[room.current_turn].alive());
    }
}
