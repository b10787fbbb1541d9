use thiserror::Error;

use crate::domain::chips::Chips;
use crate::engine::actions::ActionKind;

/// Ошибки движка раздачи.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Недопустимое действие `{0}` в текущем состоянии раздачи")]
    IllegalAction(ActionKind),

    #[error("Рейз до {amount} вне границ [{min}, {max}]")]
    RaiseOutOfBounds { amount: Chips, min: Chips, max: Chips },

    #[error("Повреждённое состояние раздачи: {0}")]
    CorruptState(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(&'static str),
}
