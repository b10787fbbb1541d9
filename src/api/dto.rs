use serde::{Deserialize, Serialize};

use crate::domain::card::Card;
use crate::domain::chips::Chips;
use crate::domain::hand::Street;
use crate::domain::SessionId;
use crate::engine::LegalActions;
use crate::session::model::PlayMode;

/// Публичное представление сессии для клиента.
///
/// Все массивы - по участникам: `[игрок, соперник]`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GameView {
    pub session_id: SessionId,
    pub play_mode: PlayMode,
    pub pot: Chips,
    pub stacks: [Chips; 2],
    pub player_cards: Vec<Card>,
    /// Карты соперника: в режиме ботов или после вскрытия.
    pub opponent_cards: Option<Vec<Card>>,
    pub board: Vec<Card>,
    pub street: Option<Street>,
    /// Легальные действия человека (пусто, если сейчас не его ход).
    pub legal_actions: LegalActions,
    pub raise_bounds: Option<[Chips; 2]>,
    pub is_player_turn: bool,
    pub hand_complete: bool,
    pub game_complete: bool,
    pub hands_played: u32,
    pub hands_to_play: u32,
    /// Итог последней раздачи, если она завершена.
    pub last_deltas: Option<[i64; 2]>,
    pub simulation_running: bool,
    pub message: String,
}

/// Прогресс фоновой симуляции.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationStatusDto {
    pub running: bool,
    pub hands_played: u32,
    pub hands_to_play: u32,
    pub last_error: Option<String>,
}
