use crate::domain::card::{Card, Rank};

use super::hand_rank::{HandCategory, HandRank};
use super::lookup_tables::{detect_straight, rank_to_bit, RankMask};

/// Оценщик силы руки. Движку нужен только полный порядок на результатах,
/// поэтому реализацию можно подменить (например, в тестах на сплит).
pub trait HandEvaluator: Send + Sync {
    /// Оценить лучшую комбинацию из переданных карт (карманные + борд).
    fn evaluate(&self, cards: &[Card]) -> HandRank;
}

/// Стандартный оценщик холдема: перебор всех 5-карточных подмножеств.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardEvaluator;

impl HandEvaluator for StandardEvaluator {
    fn evaluate(&self, cards: &[Card]) -> HandRank {
        evaluate_best_hand(cards)
    }
}

/// Вычислить лучшую руку из 1–7 карт.
///
/// Для 5+ карт перебираем все комбинации по 5; если карт меньше
/// (укороченная раздача с `final_street < 5`), оцениваем то, что есть.
pub fn evaluate_best_hand(cards: &[Card]) -> HandRank {
    if cards.len() <= 5 {
        return evaluate_group(cards);
    }

    let n = cards.len();
    let mut best = HandRank(0);
    for a in 0..n {
        for b in (a + 1)..n {
            for c in (b + 1)..n {
                for d in (c + 1)..n {
                    for e in (d + 1)..n {
                        let five = [cards[a], cards[b], cards[c], cards[d], cards[e]];
                        best = best.max(evaluate_group(&five));
                    }
                }
            }
        }
    }
    best
}

/// Оценка группы не более чем из 5 карт.
fn evaluate_group(cards: &[Card]) -> HandRank {
    let mut rank_counts = [0u8; 15]; // индексы 2..14
    let mut rank_mask: RankMask = 0;
    for card in cards {
        rank_counts[card.rank as usize] += 1;
        rank_mask |= rank_to_bit(card.rank);
    }

    let full = cards.len() == 5;
    let is_flush = full && cards.iter().all(|c| c.suit == cards[0].suit);
    let straight_high = if full && rank_mask.count_ones() == 5 {
        detect_straight(rank_mask)
    } else {
        None
    };

    // (count, rank), сначала по количеству, затем по рангу - по убыванию.
    let mut groups: Vec<(u8, Rank)> = Rank::ALL
        .iter()
        .filter(|r| rank_counts[**r as usize] > 0)
        .map(|r| (rank_counts[*r as usize], *r))
        .collect();
    groups.sort_by(|a, b| b.cmp(a));

    let ordered: Vec<Rank> = groups.iter().map(|(_, r)| *r).collect();
    let pattern: Vec<u8> = groups.iter().map(|(c, _)| *c).collect();

    if let Some(high) = straight_high {
        let category = if is_flush {
            HandCategory::StraightFlush
        } else {
            HandCategory::Straight
        };
        return HandRank::from_parts(category, &[high]);
    }

    let category = match pattern.as_slice() {
        [4, ..] => HandCategory::FourOfAKind,
        [3, 2] => HandCategory::FullHouse,
        _ if is_flush => HandCategory::Flush,
        [3, ..] => HandCategory::ThreeOfAKind,
        [2, 2, ..] => HandCategory::TwoPair,
        [2, ..] => HandCategory::OnePair,
        _ => HandCategory::HighCard,
    };
    HandRank::from_parts(category, &ordered)
}
