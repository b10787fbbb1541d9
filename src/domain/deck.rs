use crate::domain::card::{Card, Rank, Suit};
use crate::infra::RandomSource;

/// Колода карт. В домене - просто упорядоченный список карт.
/// Перемешивание делает вызывающий код через `RandomSource`, НЕ здесь.
///
/// Раздача идёт с начала списка: первые карты - карманные, оставшиеся
/// попадают в `RoundState::deck`, где первые `street` штук - открытый борд.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deck {
    pub cards: Vec<Card>,
}

impl Deck {
    /// Стандартная 52-карточная колода в порядке:
    /// Clubs 2..A, Diamonds 2..A, Hearts 2..A, Spades 2..A.
    pub fn standard_52() -> Self {
        let cards = Suit::ALL
            .iter()
            .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(rank, suit)))
            .collect();
        Deck { cards }
    }

    /// Свежая перемешанная колода.
    pub fn shuffled<R: RandomSource>(rng: &mut R) -> Self {
        let mut deck = Self::standard_52();
        rng.shuffle(&mut deck.cards);
        deck
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Взять n карт сверху (с начала списка).
    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        let n = n.min(self.cards.len());
        self.cards.drain(..n).collect()
    }

    /// Отдать остаток колоды.
    pub fn into_remaining(self) -> Vec<Card> {
        self.cards
    }
}
