//! Оценка рук на шоудауне.
//!
//! - порядок категорий;
//! - кикеры и сплит;
//! - укороченные раздачи (меньше пяти карт).

use poker_arena::domain::card::Card;
use poker_arena::eval::{evaluate_best_hand, HandCategory, HandEvaluator, StandardEvaluator};

fn cards(list: &str) -> Vec<Card> {
    list.split_whitespace()
        .map(|c| c.parse().expect("card"))
        .collect()
}

fn with_board(hole: &str, board: &str) -> Vec<Card> {
    let mut all = cards(hole);
    all.extend(cards(board));
    all
}

#[test]
fn straight_flush_beats_four_of_a_kind() {
    let board = "9c Tc Jc Qc 2d";
    let r1 = evaluate_best_hand(&with_board("8c Kc", board));
    let r2 = evaluate_best_hand(&with_board("Kd Kh", board));
    assert_eq!(r1.category(), HandCategory::StraightFlush);
    assert!(r1 > r2);
}

#[test]
fn four_of_a_kind_beats_full_house() {
    let board = "Kc Kd 3c 3d 7s";
    let quads = evaluate_best_hand(&with_board("Kh Ks", board));
    let boat = evaluate_best_hand(&with_board("3h 7c", board));
    assert_eq!(quads.category(), HandCategory::FourOfAKind);
    assert_eq!(boat.category(), HandCategory::FullHouse);
    assert!(quads > boat);
}

#[test]
fn wheel_is_the_lowest_straight() {
    let wheel = evaluate_best_hand(&cards("Ah 2c 3d 4s 5h 9c Kd"));
    let six_high = evaluate_best_hand(&cards("6h 2c 3d 4s 5h 9c Kd"));
    assert_eq!(wheel.category(), HandCategory::Straight);
    assert!(six_high > wheel);
}

#[test]
fn kicker_decides_equal_pairs() {
    let board = "Ah Ad 7c 4s 2h";
    let king = evaluate_best_hand(&with_board("Kc 3d", board));
    let queen = evaluate_best_hand(&with_board("Qc 3h", board));
    assert!(king > queen);
}

#[test]
fn board_plays_for_both_players() {
    let board = "Ts Js Qs Ks As";
    let a = StandardEvaluator.evaluate(&with_board("2c 3d", board));
    let b = StandardEvaluator.evaluate(&with_board("4h 5c", board));
    assert_eq!(a, b);
}

#[test]
fn short_board_is_still_ranked() {
    let pair = evaluate_best_hand(&cards("9c 9d"));
    let high = evaluate_best_hand(&cards("Ac Kd"));
    assert_eq!(pair.category(), HandCategory::OnePair);
    assert!(pair > high);
}
