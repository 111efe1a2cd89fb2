//! Bluff Challenge Adjudication
//!
//! After a challengeable play, any other live player may dispute it. The
//! adjudication is synchronous: by the time a challenge command is
//! processed, the disputed play either stands (challenger eliminated) or
//! falls (actor eliminated). Either way the window closes and every
//! challenge flag clears.

use crate::game::card::Card;
use crate::game::events::{EliminationReason, GameEvent};
use crate::game::state::{GamePhase, PendingPlay, PlayerId, RoomState};
use crate::game::turn::eliminate;
use crate::game::RulesError;

/// Rules predicate: was the pending play legitimate?
///
/// Key possession for Botnet and System Override is enforced when the
/// play commits (the key is spent into the discard pile alongside the
/// card), so any play that reached the pending slot passes. Challenging
/// is a gamble that almost never pays.
pub fn validate_card_play(room: &RoomState, pending: &PendingPlay) -> bool {
    match pending.card {
        Card::Botnet | Card::SystemOverride | Card::ExploitScript | Card::Debugger => room
            .seat(pending.actor)
            .map(|s| s.last_played == Some(pending.card))
            .unwrap_or(false),
        // Unchallengeable cards never reach the pending slot.
        _ => false,
    }
}

/// Dispute the pending play.
///
/// Requires challenge permission (set by the play, cleared on any
/// resolution) and a live challenger. The loser of the adjudication is
/// eliminated; the win check runs as part of that.
pub fn challenge_card(
    room: &mut RoomState,
    challenger: PlayerId,
) -> Result<Vec<GameEvent>, RulesError> {
    if room.phase != GamePhase::Playing {
        return Err(RulesError::GameNotRunning);
    }
    match room.seat(challenger) {
        Some(seat) if seat.alive() && seat.can_challenge => {}
        Some(_) => return Err(RulesError::ChallengeNotAllowed),
        None => return Err(RulesError::NotInRoom),
    }
    let pending = match room.pending_play {
        Some(pending) => pending,
        None => return Err(RulesError::NothingToChallenge),
    };

    let legitimate = validate_card_play(room, &pending);
    room.close_challenge_window();

    let mut events = vec![GameEvent::ChallengeResolved {
        challenger,
        actor: pending.actor,
        card: pending.card,
        legitimate,
    }];

    if legitimate {
        eliminate(room, challenger, EliminationReason::FailedChallenge, &mut events);
    } else {
        eliminate(room, pending.actor, EliminationReason::CaughtBluffing, &mut events);
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::DECK_SIZE;
    use crate::game::effect::play_card;
    use crate::game::turn::{join_room, start_game, toggle_ready};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pid(n: u8) -> PlayerId {
        PlayerId::new([n; 16])
    }

    fn rigged(players: u8) -> RoomState {
        let mut room = RoomState::new("TEST", "t", pid(0), "p0", 8);
        for i in 1..players {
            join_room(&mut room, pid(i), &format!("p{i}")).unwrap();
            toggle_ready(&mut room, pid(i)).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(5);
        start_game(&mut room, pid(0), &mut rng).unwrap();
        for seat in &mut room.seats {
            let hand: Vec<_> = seat.hand.drain(..).collect();
            room.deck.extend(hand);
            seat.life_tokens = 2;
        }
        room
    }

    fn arm_exploit(room: &mut RoomState) -> (PlayerId, PlayerId, PlayerId) {
        let (a, b, c) = (room.seats[0].id, room.seats[1].id, room.seats[2].id);
        let pos = room
            .deck
            .iter()
            .position(|card| *card == Card::ExploitScript)
            .unwrap();
        let exploit = room.deck.remove(pos);
        room.seat_mut(a).unwrap().hand.push(exploit);

        let mut rng = StdRng::seed_from_u64(1);
        play_card(room, a, Card::ExploitScript, Some(b), &mut rng).unwrap();
        (a, b, c)
    }

    #[test]
    fn test_scenario_e_failed_challenge_eliminates_challenger() {
        let mut room = rigged(3);
        let (a, _, c) = arm_exploit(&mut room);

        let events = challenge_card(&mut room, c).unwrap();

        assert!(matches!(
            events[0],
            GameEvent::ChallengeResolved { legitimate: true, .. }
        ));
        assert!(events[0].log_line().contains("Challenge failed"));
        assert!(room.seat(c).unwrap().eliminated);
        assert!(room.seat(a).unwrap().alive());
        assert!(!room.challenge_open());
        assert!(room.seats.iter().all(|s| !s.can_challenge));
        assert_eq!(room.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_challenge_without_permission_rejected() {
        let mut room = rigged(3);
        let c = room.seats[2].id;
        assert_eq!(
            challenge_card(&mut room, c).unwrap_err(),
            RulesError::ChallengeNotAllowed
        );
    }

    #[test]
    fn test_actor_cannot_challenge_own_play() {
        let mut room = rigged(3);
        let (a, _, _) = arm_exploit(&mut room);
        assert_eq!(
            challenge_card(&mut room, a).unwrap_err(),
            RulesError::ChallengeNotAllowed
        );
    }

    #[test]
    fn test_challenge_closes_window_for_everyone() {
        let mut room = rigged(4);
        let (_, b, c) = arm_exploit(&mut room);

        challenge_card(&mut room, c).unwrap();

        // The other permitted player can no longer pile on.
        assert_eq!(
            challenge_card(&mut room, b).unwrap_err(),
            RulesError::ChallengeNotAllowed
        );
    }

    #[test]
    fn test_challenge_elimination_triggers_win_check() {
        let mut room = rigged(2);
        let (a, b) = (room.seats[0].id, room.seats[1].id);
        let pos = room
            .deck
            .iter()
            .position(|card| *card == Card::Debugger)
            .unwrap();
        let debugger = room.deck.remove(pos);
        room.seat_mut(a).unwrap().hand.push(debugger);

        let mut rng = StdRng::seed_from_u64(2);
        play_card(&mut room, a, Card::Debugger, Some(b), &mut rng).unwrap();
        challenge_card(&mut room, b).unwrap();

        assert_eq!(room.phase, GamePhase::Ended);
        assert_eq!(room.winner, Some(room.seat(a).unwrap().username.clone()));
    }

    #[test]
    fn test_validate_card_play_reference_behavior() {
        let mut room = rigged(3);
        let (a, _, _) = arm_exploit(&mut room);

        let pending = room.pending_play.unwrap();
        assert_eq!(pending.actor, a);
        assert!(validate_card_play(&room, &pending));
    }
}
