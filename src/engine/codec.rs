//! JSON-форма состояния раздачи, которую сессия хранит между запросами.
//!
//! Идущая раздача:
//! `{terminal:false, button, street, finalStreet, pips, stacks, hands, deck, startingStacks, bigBlind}`;
//! завершённая: `{terminal:true, deltas, button}`.

use serde::{Deserialize, Serialize};

use crate::domain::card::Card;
use crate::domain::chips::Chips;
use crate::engine::errors::EngineError;
use crate::engine::round::{HandState, RoundState, TerminalState};

/// Что лежит в сессии после разбора.
///
/// У завершённой раздачи хранятся только дельты: цепочка состояний
/// после сериализации не восстанавливается.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoredState {
    Ongoing(RoundState),
    Terminal { deltas: [i64; 2], button: u32 },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OngoingDoc {
    terminal: bool,
    button: u32,
    street: u8,
    final_street: u8,
    pips: [Chips; 2],
    stacks: [Chips; 2],
    hands: [[Card; 2]; 2],
    deck: Vec<Card>,
    #[serde(default)]
    starting_stacks: Option<[Chips; 2]>,
    #[serde(default)]
    big_blind: Option<Chips>,
}

#[derive(Serialize, Deserialize)]
struct TerminalDoc {
    terminal: bool,
    deltas: [i64; 2],
    button: u32,
}

#[derive(Deserialize)]
struct Probe {
    terminal: bool,
}

fn ongoing_doc(state: &RoundState) -> OngoingDoc {
    OngoingDoc {
        terminal: false,
        button: state.button,
        street: state.street,
        final_street: state.final_street,
        pips: state.pips,
        stacks: state.stacks,
        hands: state.hands,
        deck: state.deck.clone(),
        starting_stacks: Some(state.starting_stacks),
        big_blind: Some(state.big_blind),
    }
}

pub fn serialize_round(state: &RoundState) -> Result<String, EngineError> {
    serde_json::to_string(&ongoing_doc(state)).map_err(|e| EngineError::CorruptState(e.to_string()))
}

/// То же, что `serialize_round`, но в виде `Value` для вложения в сообщения ботам.
pub fn round_to_value(state: &RoundState) -> Result<serde_json::Value, EngineError> {
    serde_json::to_value(ongoing_doc(state)).map_err(|e| EngineError::CorruptState(e.to_string()))
}

pub fn serialize_terminal(state: &TerminalState) -> Result<String, EngineError> {
    let doc = TerminalDoc {
        terminal: true,
        deltas: state.deltas,
        button: state.button(),
    };
    serde_json::to_string(&doc).map_err(|e| EngineError::CorruptState(e.to_string()))
}

pub fn serialize(state: &HandState) -> Result<String, EngineError> {
    match state {
        HandState::Ongoing(r) => serialize_round(r),
        HandState::Terminal(t) => serialize_terminal(t),
    }
}

/// Разобрать и проверить сохранённое состояние.
pub fn deserialize(raw: &str) -> Result<StoredState, EngineError> {
    let corrupt = |e: serde_json::Error| EngineError::CorruptState(e.to_string());
    let value: serde_json::Value = serde_json::from_str(raw).map_err(corrupt)?;
    let probe: Probe = serde_json::from_value(value.clone()).map_err(corrupt)?;

    if probe.terminal {
        let doc: TerminalDoc = serde_json::from_value(value).map_err(corrupt)?;
        if doc.deltas[0].checked_add(doc.deltas[1]) != Some(0) {
            return Err(EngineError::CorruptState("сумма дельт не равна нулю".into()));
        }
        return Ok(StoredState::Terminal {
            deltas: doc.deltas,
            button: doc.button,
        });
    }

    let doc: OngoingDoc = serde_json::from_value(value).map_err(corrupt)?;
    // до флопа весь вклад лежит в pips; дальше без startingStacks дельты не восстановить
    let starting_stacks = match doc.starting_stacks {
        Some(stacks) => stacks,
        None if doc.street == 0 => [doc.stacks[0] + doc.pips[0], doc.stacks[1] + doc.pips[1]],
        None => {
            return Err(EngineError::CorruptState(
                "нет startingStacks у раздачи после префлопа".into(),
            ))
        }
    };
    let state = RoundState {
        button: doc.button,
        street: doc.street,
        final_street: doc.final_street,
        pips: doc.pips,
        stacks: doc.stacks,
        hands: doc.hands,
        deck: doc.deck,
        starting_stacks,
        big_blind: doc.big_blind.unwrap_or(Chips(2)),
        previous: None,
    };
    check_consistency(&state)?;
    Ok(StoredState::Ongoing(state))
}

fn check_consistency(state: &RoundState) -> Result<(), EngineError> {
    let bad = |msg: &str| Err(EngineError::CorruptState(msg.to_string()));

    if !matches!(state.street, 0 | 3 | 4 | 5) || !matches!(state.final_street, 0 | 3 | 4 | 5) {
        return bad("недопустимый номер улицы");
    }
    if state.street > state.final_street {
        return bad("улица дальше последней");
    }
    if state.deck.len() < state.final_street as usize {
        return bad("в колоде не хватает карт на борд");
    }
    if state.big_blind.is_zero() {
        return bad("нулевой большой блайнд");
    }
    for seat in 0..2 {
        if state.stacks[seat] + state.pips[seat] > state.starting_stacks[seat] {
            return bad("вклад игрока больше стартового стека");
        }
    }

    let mut seen: Vec<Card> = state.hands.iter().flatten().copied().collect();
    seen.extend_from_slice(&state.deck);
    let total = seen.len();
    seen.sort_by_key(|c| (c.rank, c.suit as u8));
    seen.dedup();
    if seen.len() != total {
        return bad("в раздаче повторяются карты");
    }
    Ok(())
}
