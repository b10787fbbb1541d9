use serde::{Deserialize, Serialize};

/// Улица раздачи.
///
/// В `RoundState` улица хранится числом открытых карт борда (0/3/4/5),
/// этот enum нужен для логов и фронта.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

impl Street {
    /// Улица по количеству открытых карт борда.
    pub fn from_board_count(count: u8) -> Option<Street> {
        match count {
            0 => Some(Street::Preflop),
            3 => Some(Street::Flop),
            4 => Some(Street::Turn),
            5 => Some(Street::River),
            _ => None,
        }
    }

    /// Сколько карт борда открыто на этой улице.
    pub fn board_count(self) -> u8 {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
        }
    }

    /// Имя для транскрипта (`Flop`, `Turn`, `River`).
    pub fn title(self) -> &'static str {
        match self {
            Street::Preflop => "Preflop",
            Street::Flop => "Flop",
            Street::Turn => "Turn",
            Street::River => "River",
        }
    }
}
