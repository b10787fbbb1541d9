use serde::{Deserialize, Serialize};

use crate::api::dto::{GameView, SimulationStatusDto};
use crate::domain::chips::Chips;
use crate::domain::SessionId;
use crate::engine::Action;
use crate::session::SessionSetup;

/// Команда верхнего уровня: всё, что меняет состояние сессии.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Создать сессию (человек-бот или бот-бот).
    CreateSession(SessionSetup),

    /// Начать раздачу. `continue_session` передаёт баттон сопернику.
    StartHand {
        session_id: SessionId,
        #[serde(default)]
        continue_session: bool,
    },

    /// Купить фишки за монеты.
    BuyIn { session_id: SessionId },

    /// Ход человека.
    SubmitAction { session_id: SessionId, action: Action },

    StartSimulation { session_id: SessionId },

    StopSimulation { session_id: SessionId },

    /// Выйти и вернуть стек в кошелёк.
    Exit { session_id: SessionId },
}

/// Ответ на команду.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandResponse {
    Session(GameView),
    BuyInRequired { session_id: SessionId },
    /// Сколько фишек ушло на стол (бай-ин) или вернулось в кошелёк (выход).
    ChipsMoved { session_id: SessionId, amount: Chips },
    Simulation(SimulationStatusDto),
}
