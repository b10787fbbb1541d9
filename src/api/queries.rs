use serde::{Deserialize, Serialize};

use crate::api::dto::{GameView, SimulationStatusDto};
use crate::domain::SessionId;

/// Запросы только на чтение.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum Query {
    GetView { session_id: SessionId },

    SimulationStatus { session_id: SessionId },

    /// Полный текстовый лог сессии.
    Transcript { session_id: SessionId },

    /// Компактный лог участника (0 - игрок, 1 - соперник).
    PlayerLog { session_id: SessionId, participant: usize },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum QueryResponse {
    View(GameView),
    Simulation(SimulationStatusDto),
    Text { text: String },
}
