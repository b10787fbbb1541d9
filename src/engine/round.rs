//! Машина состояний одной heads-up раздачи.
//!
//! `RoundState` - неизменяемый узел дерева ставок. Переходы (`proceed`,
//! `advance`) строят новый узел со ссылкой на предыдущий; терминальное
//! состояние - отдельный тип, у которого `proceed` нет вовсе.

use std::sync::Arc;

use crate::config::GameRules;
use crate::domain::card::Card;
use crate::domain::chips::Chips;
use crate::domain::deck::Deck;
use crate::domain::hand::Street;
use crate::domain::SeatIndex;
use crate::engine::actions::{Action, ActionKind, LegalActions};
use crate::engine::errors::EngineError;
use crate::engine::pot::{settle_commitments, Outcome};
use crate::eval::{HandEvaluator, StandardEvaluator};

/// Точка принятия решения внутри раздачи.
///
/// `button` - счётчик ходов, его чётность выбирает активного игрока.
/// `street` - число открытых карт борда (0/3/4/5); борд - первые `street`
/// карт `deck`.
#[derive(Clone, Debug)]
pub struct RoundState {
    pub button: u32,
    pub street: u8,
    pub final_street: u8,
    pub pips: [Chips; 2],
    pub stacks: [Chips; 2],
    pub hands: [[Card; 2]; 2],
    pub deck: Vec<Card>,
    /// Стеки до блайндов этой раздачи - база для `deltas`.
    pub starting_stacks: [Chips; 2],
    pub big_blind: Chips,
    /// Предыдущий узел цепочки. Не сериализуется.
    pub previous: Option<Arc<RoundState>>,
}

impl PartialEq for RoundState {
    fn eq(&self, other: &Self) -> bool {
        self.button == other.button
            && self.street == other.street
            && self.final_street == other.final_street
            && self.pips == other.pips
            && self.stacks == other.stacks
            && self.hands == other.hands
            && self.deck == other.deck
            && self.starting_stacks == other.starting_stacks
            && self.big_blind == other.big_blind
    }
}

impl Eq for RoundState {}

/// Завершённая раздача.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalState {
    /// Изменение стека каждого игрока за раздачу; сумма всегда 0.
    pub deltas: [i64; 2],
    pub outcome: Outcome,
    /// Последний `RoundState`, из которого получен результат.
    pub previous: Arc<RoundState>,
}

impl TerminalState {
    fn settle(previous: Arc<RoundState>, outcome: Outcome) -> Self {
        let committed = previous.committed();
        let payouts = settle_commitments(committed, outcome);
        let deltas = [
            payouts[0].signed_diff(committed[0]),
            payouts[1].signed_diff(committed[1]),
        ];
        Self {
            deltas,
            outcome,
            previous,
        }
    }

    /// Принудительный итог (например, выход игрока посреди раздачи).
    pub fn forced(round: RoundState, outcome: Outcome) -> Self {
        Self::settle(Arc::new(round), outcome)
    }

    pub fn button(&self) -> u32 {
        self.previous.button
    }

    /// Стеки после выплаты банка.
    pub fn final_stacks(&self) -> [Chips; 2] {
        let payouts = settle_commitments(self.previous.committed(), self.outcome);
        [
            self.previous.stacks[0] + payouts[0],
            self.previous.stacks[1] + payouts[1],
        ]
    }
}

/// Текущее состояние раздачи: либо идёт, либо завершена.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandState {
    Ongoing(RoundState),
    Terminal(TerminalState),
}

impl HandState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandState::Terminal(_))
    }

    pub fn as_round(&self) -> Option<&RoundState> {
        match self {
            HandState::Ongoing(r) => Some(r),
            HandState::Terminal(_) => None,
        }
    }

    pub fn as_terminal(&self) -> Option<&TerminalState> {
        match self {
            HandState::Terminal(t) => Some(t),
            HandState::Ongoing(_) => None,
        }
    }
}

/// Результат перехода + фишки, которые этот переход запер в банке.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub state: HandState,
    pub locked: [Chips; 2],
}

impl RoundState {
    /// Начальное состояние раздачи: раздаёт 2+2 карты с верха колоды и
    /// ставит блайнды (не больше стека). Место 0 - малый блайнд.
    pub fn new_hand(
        rules: &GameRules,
        stacks: [Chips; 2],
        mut deck: Deck,
    ) -> Result<RoundState, EngineError> {
        let needed = 4 + rules.final_street as usize;
        if deck.len() < needed {
            return Err(EngineError::Internal("в колоде не хватает карт"));
        }
        let h0 = hole_cards(deck.deal(2))?;
        let h1 = hole_cards(deck.deal(2))?;

        let pips = [
            rules.small_blind.min(stacks[0]),
            rules.big_blind.min(stacks[1]),
        ];
        Ok(RoundState {
            button: 0,
            street: 0,
            final_street: rules.final_street,
            pips,
            stacks: [
                stacks[0].saturating_sub(pips[0]),
                stacks[1].saturating_sub(pips[1]),
            ],
            hands: [h0, h1],
            deck: deck.into_remaining(),
            starting_stacks: stacks,
            big_blind: rules.big_blind,
            previous: None,
        })
    }

    pub fn active(&self) -> SeatIndex {
        (self.button % 2) as SeatIndex
    }

    pub fn continue_cost(&self) -> Chips {
        let active = self.active();
        self.pips[1 - active].saturating_sub(self.pips[active])
    }

    /// Открытые карты борда.
    pub fn board(&self) -> &[Card] {
        let n = (self.street as usize).min(self.deck.len());
        &self.deck[..n]
    }

    pub fn street_kind(&self) -> Street {
        Street::from_board_count(self.street).unwrap_or(Street::River)
    }

    /// Сколько каждый игрок вложил в раздачу (включая текущие pips).
    pub fn committed(&self) -> [Chips; 2] {
        [
            self.starting_stacks[0].saturating_sub(self.stacks[0]),
            self.starting_stacks[1].saturating_sub(self.stacks[1]),
        ]
    }

    pub fn legal_actions(&self) -> LegalActions {
        let active = self.active();
        let cc = self.continue_cost();
        if cc.is_zero() {
            let bets_forbidden = self.stacks[0].is_zero() || self.stacks[1].is_zero();
            if bets_forbidden {
                LegalActions::new([ActionKind::Check])
            } else {
                LegalActions::new([ActionKind::Check, ActionKind::Raise])
            }
        } else {
            // колл олл-ин для одной из сторон - дальше рейзить некуда
            let raise_forbidden = cc >= self.stacks[active] || self.stacks[1 - active].is_zero();
            if raise_forbidden {
                LegalActions::new([ActionKind::Fold, ActionKind::Call])
            } else {
                LegalActions::new([ActionKind::Fold, ActionKind::Call, ActionKind::Raise])
            }
        }
    }

    /// Границы рейза как целевого pip активного игрока: `(min, max)`.
    pub fn raise_bounds(&self) -> (Chips, Chips) {
        let active = self.active();
        let cc = self.continue_cost();
        let max_contribution = self.stacks[active].min(self.stacks[1 - active] + cc);
        let min_contribution = max_contribution.min(cc + cc.max(self.big_blind));
        (
            self.pips[active] + min_contribution,
            self.pips[active] + max_contribution,
        )
    }

    /// Проверить действие против `legal_actions` и `raise_bounds`.
    pub fn validate(&self, action: &Action) -> Result<(), EngineError> {
        let kind = action.kind();
        if !self.legal_actions().contains(kind) {
            return Err(EngineError::IllegalAction(kind));
        }
        if let Action::Raise { amount } = *action {
            let (min, max) = self.raise_bounds();
            if amount < min || amount > max {
                return Err(EngineError::RaiseOutOfBounds { amount, min, max });
            }
        }
        Ok(())
    }

    /// Применить действие (стандартный оценщик рук на шоудауне).
    pub fn proceed(&self, action: Action) -> Result<HandState, EngineError> {
        self.proceed_with(action, &StandardEvaluator)
    }

    pub fn proceed_with(
        &self,
        action: Action,
        evaluator: &dyn HandEvaluator,
    ) -> Result<HandState, EngineError> {
        self.advance_with(action, evaluator).map(|t| t.state)
    }

    pub fn advance(&self, action: Action) -> Result<Transition, EngineError> {
        self.advance_with(action, &StandardEvaluator)
    }

    /// Переход + побочный канал `locked` для банка.
    pub fn advance_with(
        &self,
        action: Action,
        evaluator: &dyn HandEvaluator,
    ) -> Result<Transition, EngineError> {
        self.validate(&action)?;
        let active = self.active();
        let current = Arc::new(self.clone());

        match action {
            Action::Fold => {
                let outcome = Outcome::FoldWinner { seat: 1 - active };
                Ok(Transition {
                    state: HandState::Terminal(TerminalState::settle(current, outcome)),
                    locked: self.pips,
                })
            }

            Action::Call => {
                let contribution = self.continue_cost().min(self.stacks[active]);
                let mut next = self.child(current);
                next.pips[active] += contribution;
                next.stacks[active] = self.stacks[active].saturating_sub(contribution);

                if self.button == 0 {
                    // малый блайнд доплачивает до большого: улица продолжается
                    next.button = 1;
                    return Ok(Transition {
                        state: HandState::Ongoing(next),
                        locked: [Chips::ZERO; 2],
                    });
                }
                let locked = next.pips;
                Ok(Transition {
                    state: close_street(Arc::new(next), evaluator),
                    locked,
                })
            }

            Action::Check => {
                if (self.street == 0 && self.button > 0) || self.button > 1 {
                    Ok(Transition {
                        state: close_street(current, evaluator),
                        locked: self.pips,
                    })
                } else {
                    let mut next = self.child(current);
                    next.button += 1;
                    Ok(Transition {
                        state: HandState::Ongoing(next),
                        locked: [Chips::ZERO; 2],
                    })
                }
            }

            Action::Raise { amount } => {
                let contribution = amount
                    .checked_sub(self.pips[active])
                    .ok_or(EngineError::Internal("рейз меньше текущего pip"))?;
                let stack = self.stacks[active]
                    .checked_sub(contribution)
                    .ok_or(EngineError::Internal("рейз больше стека"))?;
                let mut next = self.child(current);
                next.pips[active] = amount;
                next.stacks[active] = stack;
                next.button += 1;
                Ok(Transition {
                    state: HandState::Ongoing(next),
                    locked: [Chips::ZERO; 2],
                })
            }
        }
    }

    /// Закрыть текущую улицу: следующая улица или шоудаун на последней.
    pub fn proceed_street(&self, evaluator: &dyn HandEvaluator) -> HandState {
        close_street(Arc::new(self.clone()), evaluator)
    }

    /// Сравнить руки и разыграть банк.
    pub fn showdown(&self, evaluator: &dyn HandEvaluator) -> TerminalState {
        showdown(Arc::new(self.clone()), evaluator)
    }

    fn child(&self, previous: Arc<RoundState>) -> RoundState {
        RoundState {
            previous: Some(previous),
            ..self.clone()
        }
    }
}

fn close_street(closing: Arc<RoundState>, evaluator: &dyn HandEvaluator) -> HandState {
    if closing.street >= closing.final_street {
        return HandState::Terminal(showdown(closing, evaluator));
    }
    let street = if closing.street == 0 {
        3
    } else {
        closing.street + 1
    };
    let next = RoundState {
        button: 1,
        street: street.min(closing.final_street),
        pips: [Chips::ZERO; 2],
        previous: Some(closing.clone()),
        ..(*closing).clone()
    };
    HandState::Ongoing(next)
}

fn showdown(closing: Arc<RoundState>, evaluator: &dyn HandEvaluator) -> TerminalState {
    let board = closing.board();
    let score = |seat: SeatIndex| {
        let mut cards = closing.hands[seat].to_vec();
        cards.extend_from_slice(board);
        evaluator.evaluate(&cards)
    };
    let (s0, s1) = (score(0), score(1));

    let outcome = match s0.cmp(&s1) {
        core::cmp::Ordering::Greater => Outcome::ShowdownWinner { seat: 0 },
        core::cmp::Ordering::Less => Outcome::ShowdownWinner { seat: 1 },
        core::cmp::Ordering::Equal => Outcome::Split,
    };
    TerminalState::settle(closing, outcome)
}

fn hole_cards(cards: Vec<Card>) -> Result<[Card; 2], EngineError> {
    cards
        .try_into()
        .map_err(|_| EngineError::Internal("нужно ровно две карманные карты"))
}
