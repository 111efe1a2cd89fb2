//! Turn State Machine
//!
//! Room lifecycle transitions (waiting -> playing -> ended), lobby
//! membership, turn advancement, elimination bookkeeping, and win
//! detection. Everything here either fully applies or returns a
//! [`RulesError`] before touching state.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::card::{self, Card};
use crate::game::events::{EliminationReason, GameEvent};
use crate::game::state::{GamePhase, PlayerId, RoomState, Seat, HAND_CAPACITY};
use crate::game::RulesError;

/// Seat a player in a waiting room.
pub fn join_room(
    room: &mut RoomState,
    player: PlayerId,
    username: &str,
) -> Result<Vec<GameEvent>, RulesError> {
    if room.phase != GamePhase::Waiting {
        return Err(RulesError::GameInProgress);
    }
    if room.seat(player).is_some() {
        return Err(RulesError::AlreadyInRoom);
    }
    if room.seats.len() >= room.max_players {
        return Err(RulesError::RoomFull);
    }

    room.seats.push(Seat::new(player, username));
    Ok(vec![GameEvent::PlayerJoined {
        player,
        username: username.to_string(),
    }])
}

/// Remove a player's seat.
///
/// Mid-game the leaver is eliminated first (hand to the discard pile, win
/// check) so conservation and the turn pointer survive the removal. The
/// host role passes to the next remaining seat when the host leaves.
pub fn leave_room(room: &mut RoomState, player: PlayerId) -> Result<Vec<GameEvent>, RulesError> {
    let idx = room.seat_index(player).ok_or(RulesError::NotInRoom)?;
    let username = room.seats[idx].username.clone();

    let mut elim_events = Vec::new();
    if room.phase == GamePhase::Playing && room.seats[idx].alive() {
        eliminate(room, player, EliminationReason::Left, &mut elim_events);
    }

    // Seat order is stable through elimination, so `idx` still holds.
    room.seats.remove(idx);
    if idx < room.current_turn {
        room.current_turn -= 1;
    } else if room.current_turn >= room.seats.len() {
        room.current_turn = 0;
    }

    let mut new_host = None;
    if room.host == player {
        if let Some(next) = room.seats.first() {
            room.host = next.id;
            new_host = Some(next.id);
        }
    }

    let mut events = vec![GameEvent::PlayerLeft {
        player,
        username,
        new_host,
    }];
    events.extend(elim_events);
    Ok(events)
}

/// Flip a player's lobby readiness.
pub fn toggle_ready(room: &mut RoomState, player: PlayerId) -> Result<(), RulesError> {
    if room.phase != GamePhase::Waiting {
        return Err(RulesError::GameInProgress);
    }
    match room.seat_mut(player) {
        Some(seat) => {
            seat.ready = !seat.ready;
            Ok(())
        }
        None => Err(RulesError::NotInRoom),
    }
}

/// Start the game.
///
/// Host-only; needs at least two seats and every non-host seat ready
/// (the host is implicitly ready). Shuffles the deck and the seat order,
/// deals one card to everyone, and rolls 1–2 life tokens per player.
pub fn start_game<R: Rng>(
    room: &mut RoomState,
    actor: PlayerId,
    rng: &mut R,
) -> Result<Vec<GameEvent>, RulesError> {
    if room.phase != GamePhase::Waiting {
        return Err(RulesError::GameInProgress);
    }
    if actor != room.host {
        return Err(RulesError::NotHost);
    }
    if room.seats.len() < 2 {
        return Err(RulesError::NotEnoughPlayers);
    }
    if room.seats.iter().any(|s| s.id != room.host && !s.ready) {
        return Err(RulesError::PlayersNotReady);
    }

    let mut deck = card::build_deck();
    card::shuffle(&mut deck, rng);
    room.deck = deck;
    room.discard.clear();
    room.seats.shuffle(rng);

    for i in 0..room.seats.len() {
        let dealt = card::draw(&mut room.deck, &mut room.discard, rng)?;
        let seat = &mut room.seats[i];
        seat.clear_transient();
        seat.eliminated = false;
        seat.hand.clear();
        seat.hand.push(dealt);
        seat.life_tokens = rng.gen_range(1..=2);
    }

    room.phase = GamePhase::Playing;
    room.current_turn = 0;
    room.turn_number = 1;
    room.pending_play = None;
    room.winner = None;

    Ok(vec![GameEvent::GameStarted {
        first_player: room.seats[0].id,
    }])
}

/// Draw a card into the current player's hand.
///
/// Returns the drawn card (delivered privately) alongside the public
/// events. An empty deck reshuffles the discard pile.
pub fn draw_card<R: Rng>(
    room: &mut RoomState,
    actor: PlayerId,
    rng: &mut R,
) -> Result<(Card, Vec<GameEvent>), RulesError> {
    if room.phase != GamePhase::Playing {
        return Err(RulesError::GameNotRunning);
    }
    if !room.is_current(actor) {
        return Err(RulesError::NotYourTurn);
    }
    if room.seats[room.current_turn].hand.len() >= HAND_CAPACITY {
        return Err(RulesError::HandFull);
    }

    let drawn = card::draw(&mut room.deck, &mut room.discard, rng)?;
    room.seats[room.current_turn].hand.push(drawn);

    let events = vec![GameEvent::CardDrawn {
        player: actor,
        deck_remaining: room.deck.len(),
    }];
    Ok((drawn, events))
}

/// End the current player's turn.
///
/// Clears the ending player's one-turn flags and everyone's challenge
/// permission, closes any open challenge window, and advances the turn
/// pointer to the next non-eliminated seat. Win condition is checked
/// first so the scan can never spin on an all-eliminated room.
pub fn end_turn(room: &mut RoomState, actor: PlayerId) -> Result<Vec<GameEvent>, RulesError> {
    if room.phase != GamePhase::Playing {
        return Err(RulesError::GameNotRunning);
    }
    if !room.is_current(actor) {
        return Err(RulesError::NotYourTurn);
    }

    let mut events = Vec::new();
    if check_win(room, &mut events) {
        return Ok(events);
    }
    advance(room, &mut events);
    Ok(events)
}

/// Advance to the next non-eliminated seat.
///
/// Callers guarantee at least one live seat. The scan is bounded by the
/// seat count, so it terminates even with n-1 eliminations.
fn advance(room: &mut RoomState, events: &mut Vec<GameEvent>) {
    room.close_challenge_window();
    if let Some(seat) = room.seats.get_mut(room.current_turn) {
        seat.firewall = false;
        seat.vpn_cloak = false;
        seat.last_played = None;
    }

    let n = room.seats.len();
    let mut idx = room.current_turn;
    for _ in 0..n {
        idx = (idx + 1) % n;
        if room.seats[idx].alive() {
            break;
        }
    }
    room.current_turn = idx;
    room.turn_number += 1;

    events.push(GameEvent::TurnEnded {
        next_player: room.seats[idx].id,
        turn_number: room.turn_number,
    });
}

/// Check the win condition; ends the game when at most one seat is left.
///
/// Returns true when the room is (now) in the terminal phase.
pub(crate) fn check_win(room: &mut RoomState, events: &mut Vec<GameEvent>) -> bool {
    if room.phase != GamePhase::Playing {
        return room.phase == GamePhase::Ended;
    }

    let winner = match room.alive_count() {
        0 => None,
        1 => room.seats.iter().find(|s| s.alive()).map(|s| s.username.clone()),
        _ => return false,
    };

    room.phase = GamePhase::Ended;
    room.winner = winner.clone();
    room.close_challenge_window();
    events.push(GameEvent::GameEnded { winner });
    true
}

/// Take a player out of the game.
///
/// Their hand moves to the discard pile and life tokens drop to zero.
/// Runs the win check, and re-seats the turn pointer if it was left on
/// the eliminated player.
pub(crate) fn eliminate(
    room: &mut RoomState,
    player: PlayerId,
    reason: EliminationReason,
    events: &mut Vec<GameEvent>,
) {
    let (username, hand) = match room.seat_mut(player) {
        Some(seat) if !seat.eliminated => {
            seat.eliminated = true;
            seat.life_tokens = 0;
            seat.firewall = false;
            seat.vpn_cloak = false;
            seat.can_challenge = false;
            seat.last_played = None;
            (seat.username.clone(), seat.hand.drain(..).collect::<Vec<_>>())
        }
        _ => return,
    };
    room.discard.extend(hand);

    events.push(GameEvent::PlayerEliminated {
        player,
        username,
        reason,
    });

    if check_win(room, events) {
        return;
    }
    if room.current_seat().map(|s| !s.alive()).unwrap_or(false) {
        advance(room, events);
    }
}

/// Cost one life token; eliminates at zero.
pub(crate) fn lose_life_token(
    room: &mut RoomState,
    player: PlayerId,
    events: &mut Vec<GameEvent>,
) {
    let out = match room.seat_mut(player) {
        Some(seat) => {
            seat.life_tokens = seat.life_tokens.saturating_sub(1);
            seat.life_tokens == 0
        }
        None => false,
    };
    if out {
        eliminate(room, player, EliminationReason::OutOfLifeTokens, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::DECK_SIZE;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pid(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    fn lobby(n: u8) -> RoomState {
        let mut room = RoomState::new("TEST", "test room", pid(0), "p0", 8);
        for i in 1..n {
            join_room(&mut room, pid(i), &format!("p{i}")).unwrap();
            toggle_ready(&mut room, pid(i)).unwrap();
        }
        room
    }

    fn started(n: u8, seed: u64) -> RoomState {
        let mut room = lobby(n);
        let mut rng = StdRng::seed_from_u64(seed);
        start_game(&mut room, pid(0), &mut rng).unwrap();
        room
    }

    #[test]
    fn test_scenario_a_three_player_start() {
        let room = started(3, 42);

        assert_eq!(room.phase, GamePhase::Playing);
        assert_eq!(room.turn_number, 1);
        assert_eq!(room.current_turn, 0);
        for seat in &room.seats {
            assert_eq!(seat.hand.len(), 1);
            assert!(seat.life_tokens == 1 || seat.life_tokens == 2);
            assert!(seat.alive());
        }
        assert_eq!(room.deck.len(), DECK_SIZE - 3);
        assert_eq!(room.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_start_requires_host() {
        let mut room = lobby(3);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            start_game(&mut room, pid(1), &mut rng),
            Err(RulesError::NotHost)
        );
    }

    #[test]
    fn test_start_requires_two_players() {
        let mut room = lobby(1);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            start_game(&mut room, pid(0), &mut rng),
            Err(RulesError::NotEnoughPlayers)
        );
    }

    #[test]
    fn test_start_requires_ready_players() {
        let mut room = lobby(3);
        toggle_ready(&mut room, pid(2)).unwrap(); // un-ready p2
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            start_game(&mut room, pid(0), &mut rng),
            Err(RulesError::PlayersNotReady)
        );
    }

    #[test]
    fn test_host_is_implicitly_ready() {
        let mut room = lobby(2);
        assert!(!room.seats[0].ready);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(start_game(&mut room, pid(0), &mut rng).is_ok());
    }

    #[test]
    fn test_join_full_room() {
        let mut room = RoomState::new("TEST", "t", pid(0), "p0", 2);
        join_room(&mut room, pid(1), "p1").unwrap();
        assert_eq!(
            join_room(&mut room, pid(2), "p2"),
            Err(RulesError::RoomFull)
        );
    }

    #[test]
    fn test_join_twice_rejected() {
        let mut room = lobby(2);
        assert_eq!(
            join_room(&mut room, pid(1), "p1"),
            Err(RulesError::AlreadyInRoom)
        );
    }

    #[test]
    fn test_join_after_start_rejected() {
        let mut room = started(2, 3);
        assert_eq!(
            join_room(&mut room, pid(9), "late"),
            Err(RulesError::GameInProgress)
        );
    }

    #[test]
    fn test_end_turn_advances_and_clears_flags() {
        let mut room = started(3, 7);
        let first = room.seats[0].id;
        room.seats[0].firewall = true;
        room.seats[0].last_played = Some(Card::Firewall);
        room.seats[2].can_challenge = true;

        let events = end_turn(&mut room, first).unwrap();

        assert_eq!(room.current_turn, 1);
        assert_eq!(room.turn_number, 2);
        assert!(!room.seats[0].firewall);
        assert!(room.seats[0].last_played.is_none());
        assert!(room.seats.iter().all(|s| !s.can_challenge));
        assert!(matches!(events[0], GameEvent::TurnEnded { .. }));
    }

    #[test]
    fn test_end_turn_skips_eliminated() {
        let mut room = started(4, 9);
        let first = room.seats[0].id;
        room.seats[1].eliminated = true;
        room.seats[2].eliminated = true;

        end_turn(&mut room, first).unwrap();
        assert_eq!(room.current_turn, 3);
        assert!(room.seats[room.current_turn].alive());
    }

    #[test]
    fn test_end_turn_wrong_actor_no_mutation() {
        let mut room = started(3, 11);
        let snapshot = format!("{room:?}");
        let other = room.seats[1].id;

        assert_eq!(end_turn(&mut room, other), Err(RulesError::NotYourTurn));
        assert_eq!(format!("{room:?}"), snapshot);
    }

    #[test]
    fn test_draw_wrong_actor_no_mutation() {
        let mut room = started(3, 13);
        let snapshot = format!("{room:?}");
        let other = room.seats[2].id;
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(
            draw_card(&mut room, other, &mut rng).unwrap_err(),
            RulesError::NotYourTurn
        );
        assert_eq!(format!("{room:?}"), snapshot);
    }

    #[test]
    fn test_draw_adds_card_and_conserves() {
        let mut room = started(3, 17);
        let actor = room.seats[0].id;
        let mut rng = StdRng::seed_from_u64(0);

        let (card, _) = draw_card(&mut room, actor, &mut rng).unwrap();
        assert_eq!(room.seats[0].hand.len(), 2);
        assert_eq!(*room.seats[0].hand.last().unwrap(), card);
        assert_eq!(room.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_draw_hand_full() {
        let mut room = started(3, 19);
        let actor = room.seats[0].id;
        let mut rng = StdRng::seed_from_u64(0);

        draw_card(&mut room, actor, &mut rng).unwrap();
        assert_eq!(
            draw_card(&mut room, actor, &mut rng).unwrap_err(),
            RulesError::HandFull
        );
    }

    #[test]
    fn test_eliminate_discards_hand_and_checks_win() {
        let mut room = started(2, 23);
        let loser = room.seats[1].id;
        let mut events = Vec::new();

        eliminate(&mut room, loser, EliminationReason::OutOfLifeTokens, &mut events);

        assert_eq!(room.phase, GamePhase::Ended);
        assert_eq!(room.winner, Some(room.seats[0].username.clone()));
        assert!(room.seats[1].hand.is_empty());
        assert_eq!(room.total_cards(), DECK_SIZE);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::GameEnded { winner: Some(_) })));
    }

    #[test]
    fn test_eliminating_current_player_reseats_pointer() {
        let mut room = started(3, 29);
        let current = room.seats[0].id;
        let mut events = Vec::new();

        eliminate(&mut room, current, EliminationReason::CaughtBluffing, &mut events);

        assert_eq!(room.phase, GamePhase::Playing);
        assert!(room.seats[room.current_turn].alive());
        assert_eq!(room.turn_number, 2);
    }

    #[test]
    fn test_leave_lobby_reassigns_host() {
        let mut room = lobby(3);
        let events = leave_room(&mut room, pid(0)).unwrap();

        assert_eq!(room.seats.len(), 2);
        assert_eq!(room.host, pid(1));
        assert!(matches!(
            events[0],
            GameEvent::PlayerLeft { new_host: Some(h), .. } if h == pid(1)
        ));
    }

    #[test]
    fn test_leave_midgame_eliminates_then_removes() {
        let mut room = started(3, 31);
        let leaver = room.seats[1].id;

        let events = leave_room(&mut room, leaver).unwrap();

        assert_eq!(room.seats.len(), 2);
        assert!(room.seat(leaver).is_none());
        assert_eq!(room.total_cards(), DECK_SIZE);
        assert_eq!(room.phase, GamePhase::Playing);
        assert!(room.seats[room.current_turn].alive());
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::PlayerEliminated { reason: EliminationReason::Left, .. })));
    }

    #[test]
    fn test_leave_down_to_one_ends_game() {
        let mut room = started(2, 37);
        let leaver = room.seats[1].id;

        leave_room(&mut room, leaver).unwrap();

        assert_eq!(room.phase, GamePhase::Ended);
        assert_eq!(room.winner, Some(room.seats[0].username.clone()));
    }

    #[test]
    fn test_toggle_ready_after_start_rejected() {
        let mut room = started(2, 41);
        let id = room.seats[0].id;
        assert_eq!(toggle_ready(&mut room, id), Err(RulesError::GameInProgress));
    }

    proptest! {
        /// Conservation and pointer validity hold across random command
        /// sequences (draws, end-turns, eliminations, leaves).
        #[test]
        fn prop_invariants_hold(seed in 0u64..500, ops in proptest::collection::vec((0u8..4, 0u8..6), 1..40)) {
            let mut room = started(6, seed);
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));

            for (op, target) in ops {
                if room.phase != GamePhase::Playing {
                    break;
                }
                let current = room.seats[room.current_turn].id;
                let victim = room.seats[target as usize % room.seats.len()].id;
                match op {
                    0 => { let _ = draw_card(&mut room, current, &mut rng); }
                    1 => { let _ = end_turn(&mut room, current); }
                    2 => {
                        let mut events = Vec::new();
                        eliminate(&mut room, victim, EliminationReason::OutOfLifeTokens, &mut events);
                    }
                    _ => { let _ = leave_room(&mut room, victim); }
                }

                if room.phase == GamePhase::Playing {
                    prop_assert_eq!(room.total_cards(), DECK_SIZE);
                    prop_assert!(room.seats[room.current_turn].alive());
                }
            }
        }
    }
}
