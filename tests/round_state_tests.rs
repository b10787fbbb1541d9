//! Машина состояний раздачи.
//!
//! Проверяем:
//! - стартовое состояние, легальные действия и границы рейза;
//! - доплату малого блайнда и переход улиц;
//! - фолд с возвратом неуравненной части;
//! - сумму дельт и конечность любой раздачи;
//! - JSON-форму состояния.

use poker_arena::config::GameRules;
use poker_arena::domain::card::Card;
use poker_arena::domain::chips::Chips;
use poker_arena::domain::deck::Deck;
use poker_arena::domain::hand::Street;
use poker_arena::engine::codec::{self, StoredState};
use poker_arena::engine::{
    settle_commitments, Action, ActionKind, EngineError, HandState, LegalActions, Outcome, PotLedger,
    RoundState,
};
use poker_arena::eval::{HandEvaluator, HandRank};
use poker_arena::infra::DeterministicRng;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const STACK: u64 = 200;

fn fresh_hand(seed: u64) -> RoundState {
    let rules = GameRules::standard();
    let mut rng = DeterministicRng::from_seed(seed);
    RoundState::new_hand(&rules, [Chips(STACK); 2], Deck::shuffled(&mut rng)).expect("new hand")
}

fn ongoing(state: HandState) -> RoundState {
    match state {
        HandState::Ongoing(round) => round,
        HandState::Terminal(t) => panic!("раздача неожиданно завершилась: {t:?}"),
    }
}

/// Все руки равны: любой шоудаун - сплит.
struct TieEvaluator;

impl HandEvaluator for TieEvaluator {
    fn evaluate(&self, _cards: &[Card]) -> HandRank {
        HandRank(1)
    }
}

#[test]
fn new_hand_posts_blinds_and_offers_baseline_actions() {
    let round = fresh_hand(1);

    assert_eq!(round.button, 0);
    assert_eq!(round.street, 0);
    assert_eq!(round.pips, [Chips(1), Chips(2)]);
    assert_eq!(round.stacks, [Chips(199), Chips(198)]);
    assert_eq!(round.deck.len(), 48);
    assert_eq!(round.active(), 0);
    assert!(round.board().is_empty());

    assert_eq!(
        round.legal_actions(),
        LegalActions::new([ActionKind::Fold, ActionKind::Call, ActionKind::Raise])
    );
    assert_eq!(round.raise_bounds(), (Chips(4), Chips(200)));
}

#[test]
fn small_blind_call_then_check_opens_the_flop() {
    let round = fresh_hand(2);

    let completed = round.advance(Action::Call).expect("sb call");
    assert_eq!(completed.locked, [Chips::ZERO; 2]);
    let round = ongoing(completed.state);
    assert_eq!(round.button, 1);
    assert_eq!(round.street, 0);
    assert_eq!(round.pips, [Chips(2), Chips(2)]);
    assert_eq!(
        round.legal_actions(),
        LegalActions::new([ActionKind::Check, ActionKind::Raise])
    );

    let closed = round.advance(Action::Check).expect("bb check");
    assert_eq!(closed.locked, [Chips(2), Chips(2)]);
    let flop = ongoing(closed.state);
    assert_eq!(flop.street, 3);
    assert_eq!(flop.street_kind(), Street::Flop);
    assert_eq!(flop.button, 1);
    assert_eq!(flop.pips, [Chips::ZERO; 2]);
    assert_eq!(flop.stacks, [Chips(198), Chips(198)]);
    assert_eq!(flop.board().len(), 3);
    // после префлопа первым говорит большой блайнд
    assert_eq!(flop.active(), 1);
    assert!(flop.previous.is_some());
}

#[test]
fn checks_walk_the_hand_to_showdown() {
    let mut round = ongoing(fresh_hand(3).proceed(Action::Call).expect("call"));
    let mut streets = vec![round.street];
    let terminal = loop {
        match round.proceed(Action::Check).expect("check") {
            HandState::Ongoing(next) => {
                if next.street != round.street {
                    streets.push(next.street);
                }
                round = next;
            }
            HandState::Terminal(t) => break t,
        }
    };

    assert_eq!(streets, vec![0, 3, 4, 5]);
    assert_eq!(terminal.deltas[0] + terminal.deltas[1], 0);
    assert!(terminal.outcome.is_showdown());
    assert_eq!(terminal.deltas[0].abs(), if terminal.outcome == Outcome::Split { 0 } else { 2 });
}

#[test]
fn fold_returns_unmatched_raise() {
    let round = fresh_hand(4);
    let round = ongoing(round.proceed(Action::raise(10)).expect("sb raise"));
    let round = ongoing(round.proceed(Action::raise(30)).expect("bb reraise"));
    assert_eq!(round.pips, [Chips(10), Chips(30)]);

    let transition = round.advance(Action::Fold).expect("fold");
    assert_eq!(transition.locked, [Chips(10), Chips(30)]);
    let terminal = transition.state.as_terminal().expect("terminal").clone();

    assert_eq!(terminal.outcome, Outcome::FoldWinner { seat: 1 });
    assert_eq!(terminal.deltas, [-10, 10]);
    assert_eq!(terminal.final_stacks(), [Chips(190), Chips(210)]);

    let mut ledger = PotLedger::new();
    ledger.commit_locked(transition.locked);
    assert_eq!(ledger.total(), Chips(40));
    assert_eq!(ledger.settle(terminal.outcome), [Chips::ZERO, Chips(40)]);
}

#[test]
fn illegal_actions_are_rejected_without_transition() {
    let round = fresh_hand(5);

    assert_eq!(
        round.proceed(Action::Check),
        Err(EngineError::IllegalAction(ActionKind::Check))
    );
    assert_eq!(
        round.proceed(Action::raise(3)),
        Err(EngineError::RaiseOutOfBounds {
            amount: Chips(3),
            min: Chips(4),
            max: Chips(200),
        })
    );
    assert_eq!(
        round.proceed(Action::raise(201)).unwrap_err(),
        EngineError::RaiseOutOfBounds {
            amount: Chips(201),
            min: Chips(4),
            max: Chips(200),
        }
    );
}

#[test]
fn all_in_call_leaves_only_checks() {
    let round = fresh_hand(6);
    let round = ongoing(round.proceed(Action::raise(200)).expect("shove"));
    assert_eq!(
        round.legal_actions(),
        LegalActions::new([ActionKind::Fold, ActionKind::Call])
    );

    let flop = ongoing(round.proceed(Action::Call).expect("call"));
    assert_eq!(flop.stacks, [Chips::ZERO; 2]);
    assert_eq!(flop.legal_actions(), LegalActions::new([ActionKind::Check]));
}

#[test]
fn tied_showdown_splits_pot() {
    let round = fresh_hand(7);
    let mut state = round.proceed_with(Action::Call, &TieEvaluator).expect("call");
    while let HandState::Ongoing(round) = &state {
        state = round.proceed_with(Action::Check, &TieEvaluator).expect("check");
    }
    let terminal = state.as_terminal().expect("terminal");
    assert_eq!(terminal.outcome, Outcome::Split);
    assert_eq!(terminal.deltas, [0, 0]);
}

#[test]
fn split_settlement_conserves_chips() {
    let payouts = settle_commitments([Chips(51), Chips(50)], Outcome::Split);
    assert_eq!(payouts, [Chips(51), Chips(50)]);

    let payouts = settle_commitments([Chips(7), Chips(120)], Outcome::ShowdownWinner { seat: 0 });
    assert_eq!(payouts, [Chips(14), Chips(113)]);
}

#[test]
fn random_play_is_zero_sum_and_terminates() {
    let mut chooser = StdRng::seed_from_u64(42);
    for seed in 0..200 {
        let mut state = HandState::Ongoing(fresh_hand(seed));
        let mut steps = 0;
        while let HandState::Ongoing(round) = &state {
            steps += 1;
            assert!(steps < 200, "раздача {seed} не завершилась");

            let legal = round.legal_actions();
            assert!(!legal.is_empty());
            let kind = legal.as_slice()[chooser.gen_range(0..legal.as_slice().len())];
            let action = match kind {
                ActionKind::Fold => Action::Fold,
                ActionKind::Call => Action::Call,
                ActionKind::Check => Action::Check,
                ActionKind::Raise => {
                    let (min, max) = round.raise_bounds();
                    Action::raise(chooser.gen_range(min.0..=max.0))
                }
            };
            state = round.proceed(action).expect("legal action");
        }

        let terminal = state.as_terminal().expect("terminal");
        assert_eq!(terminal.deltas[0] + terminal.deltas[1], 0, "seed {seed}");
        let stacks = terminal.final_stacks();
        assert_eq!(stacks[0] + stacks[1], Chips(2 * STACK), "seed {seed}");
        assert_eq!(stacks[0].signed_diff(Chips(STACK)), terminal.deltas[0]);
    }
}

#[test]
fn stored_state_round_trips_through_json() {
    let round = ongoing(fresh_hand(8).proceed(Action::raise(6)).expect("raise"));
    let raw = codec::serialize_round(&round).expect("serialize");
    assert!(raw.contains("\"finalStreet\":5"));

    match codec::deserialize(&raw).expect("deserialize") {
        StoredState::Ongoing(restored) => {
            assert_eq!(restored, round);
            assert!(restored.previous.is_none());
        }
        other => panic!("ожидалась идущая раздача: {other:?}"),
    }

    let terminal = round.proceed(Action::Fold).expect("fold");
    let raw = codec::serialize(&terminal).expect("serialize terminal");
    assert_eq!(
        codec::deserialize(&raw).expect("deserialize terminal"),
        StoredState::Terminal {
            deltas: [2, -2],
            button: 1,
        }
    );
}

#[test]
fn legacy_state_without_starting_stacks_is_accepted() {
    let round = fresh_hand(9);
    let mut value: serde_json::Value =
        serde_json::from_str(&codec::serialize_round(&round).expect("serialize")).expect("json");
    let doc = value.as_object_mut().expect("object");
    doc.remove("startingStacks");
    doc.remove("bigBlind");

    match codec::deserialize(&value.to_string()).expect("deserialize") {
        StoredState::Ongoing(restored) => {
            assert_eq!(restored.starting_stacks, [Chips(STACK); 2]);
            assert_eq!(restored.legal_actions(), round.legal_actions());
        }
        other => panic!("ожидалась идущая раздача: {other:?}"),
    }
}

#[test]
fn postflop_state_without_starting_stacks_is_rejected() {
    let preflop = fresh_hand(11);
    let limped = ongoing(preflop.proceed(Action::Call).expect("call"));
    let flop = ongoing(limped.proceed(Action::Check).expect("check"));
    assert_eq!(flop.street, 3);

    let mut value: serde_json::Value =
        serde_json::from_str(&codec::serialize_round(&flop).expect("serialize")).expect("json");
    assert!(codec::deserialize(&value.to_string()).is_ok());

    value.as_object_mut().expect("object").remove("startingStacks");
    assert!(matches!(
        codec::deserialize(&value.to_string()),
        Err(EngineError::CorruptState(_))
    ));
}

#[test]
fn corrupt_state_is_reported() {
    assert!(matches!(
        codec::deserialize("{not json"),
        Err(EngineError::CorruptState(_))
    ));
    assert!(matches!(
        codec::deserialize(r#"{"terminal":true,"deltas":[5,3],"button":2}"#),
        Err(EngineError::CorruptState(_))
    ));

    let round = fresh_hand(10);
    let mut value: serde_json::Value =
        serde_json::from_str(&codec::serialize_round(&round).expect("serialize")).expect("json");
    value["deck"] = serde_json::json!(["As", "As", "Kd"]);
    assert!(codec::deserialize(&value.to_string()).is_err());
}
