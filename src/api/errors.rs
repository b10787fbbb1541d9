use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bots::BotError;
use crate::config::ConfigError;
use crate::domain::SessionId;
use crate::engine::EngineError;
use crate::session::SessionError;

/// Ошибки внешнего API (то, что отдаём клиенту).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Неправильные входные данные (например, битый JSON).
    #[error("Неверный запрос: {0}")]
    BadRequest(String),

    #[error("Сессия {0} не найдена")]
    SessionNotFound(SessionId),

    /// Команда не может быть выполнена в текущем состоянии сессии.
    #[error("Команда недопустима: {0}")]
    InvalidCommand(String),

    /// Недопустимое действие игрока; состояние не изменилось.
    #[error("Недопустимое действие: {0}")]
    IllegalAction(String),

    #[error("Нужен бай-ин")]
    BuyInRequired,

    #[error("Недостаточно монет: {0}")]
    InsufficientCoins(String),

    /// Ошибка загрузки или работы бота.
    #[error("Ошибка бота: {0}")]
    Bot(String),

    /// Внутренняя ошибка сервера.
    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::IllegalAction(_) | EngineError::RaiseOutOfBounds { .. } => {
                ApiError::IllegalAction(err.to_string())
            }
            EngineError::CorruptState(_) | EngineError::Internal(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => ApiError::SessionNotFound(id),
            SessionError::BuyInRequired => ApiError::BuyInRequired,
            SessionError::IllegalAction(engine) => ApiError::IllegalAction(engine.to_string()),
            SessionError::Engine(engine) => engine.into(),
            SessionError::Coins(coins) => ApiError::InsufficientCoins(coins.to_string()),
            SessionError::Logs(io) => ApiError::Internal(io.to_string()),
            other @ (SessionError::AlreadyBoughtIn
            | SessionError::Busted { .. }
            | SessionError::NotPlayersTurn
            | SessionError::ActionRequired
            | SessionError::UnexpectedAction
            | SessionError::NotHumanMode
            | SessionError::NoActiveHand
            | SessionError::GameComplete
            | SessionError::NoProvider(_)) => ApiError::InvalidCommand(other.to_string()),
        }
    }
}

impl From<BotError> for ApiError {
    fn from(err: BotError) -> Self {
        ApiError::Bot(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
