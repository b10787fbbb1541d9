use serde::{Deserialize, Serialize};

use crate::domain::chips::Chips;
use crate::domain::SeatIndex;

/// Чем закончилась раздача.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Соперник сбросил карты.
    FoldWinner { seat: SeatIndex },
    /// Лучшая рука на шоудауне.
    ShowdownWinner { seat: SeatIndex },
    /// Равные руки - банк делится.
    Split,
}

impl Outcome {
    pub fn winner(&self) -> Option<SeatIndex> {
        match *self {
            Outcome::FoldWinner { seat } | Outcome::ShowdownWinner { seat } => Some(seat),
            Outcome::Split => None,
        }
    }

    pub fn is_showdown(&self) -> bool {
        !matches!(self, Outcome::FoldWinner { .. })
    }
}

/// Выплаты по вкладам игроков.
///
/// Разыгрывается только уравненная часть (`min` вкладов), неуравненный
/// излишек возвращается владельцу. При сплите нечётная фишка уходит
/// игроку 0. Сумма выплат всегда равна сумме вкладов.
pub fn settle_commitments(committed: [Chips; 2], outcome: Outcome) -> [Chips; 2] {
    let matched = committed[0].min(committed[1]);
    let refunds = [
        committed[0].saturating_sub(matched),
        committed[1].saturating_sub(matched),
    ];
    let contested = matched + matched;

    let mut payouts = refunds;
    match outcome.winner() {
        Some(seat) => payouts[seat] += contested,
        None => {
            let half = Chips(contested.0 / 2);
            payouts[0] += contested.saturating_sub(half);
            payouts[1] += half;
        }
    }
    payouts
}

/// Банк раздачи: сколько фишек каждый игрок «запер» в банке.
///
/// Пополняется через `commit` из побочного канала `Transition::locked`
/// (закрытая улица, заколл, фолд/шоудаун); живые pips текущей улицы сюда
/// не входят.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PotLedger {
    pub committed: [Chips; 2],
}

impl PotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, seat: SeatIndex, amount: Chips) {
        self.committed[seat] += amount;
    }

    /// Закоммитить вклады обоих мест разом.
    pub fn commit_locked(&mut self, locked: [Chips; 2]) {
        for (seat, amount) in locked.into_iter().enumerate() {
            if !amount.is_zero() {
                self.commit(seat, amount);
            }
        }
    }

    pub fn total(&self) -> Chips {
        self.committed.iter().copied().sum()
    }

    pub fn reset(&mut self) {
        self.committed = [Chips::ZERO; 2];
    }

    /// Рассчитать выплаты. Банк после этого считается разыгранным.
    pub fn settle(&self, outcome: Outcome) -> [Chips; 2] {
        settle_commitments(self.committed, outcome)
    }
}
