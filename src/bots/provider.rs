use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SeatIndex;
use crate::engine::{Action, ActionKind, RoundState};

/// Что бот знает о сессии помимо самого состояния раздачи.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GameContext {
    pub hand_number: u32,
    /// Банкролл активного участника относительно начала сессии.
    pub bankroll: i64,
    /// Суммарное время на решения этого участника, секунды.
    pub game_clock: f64,
    /// Компактная лента участника за текущую раздачу.
    pub messages: Vec<String>,
}

/// Ошибки загрузки и вызова бота.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("не найден entry-файл бота: {0}")]
    MissingEntry(PathBuf),

    #[error("не удалось загрузить бота: {0}")]
    Load(String),

    #[error("бот не ответил за {0:?}")]
    Timeout(Duration),

    #[error("ошибка бота: {0}")]
    Runtime(String),

    #[error("некорректный ответ бота: {0}")]
    Protocol(String),

    #[error("бот вернул недопустимое действие `{0}`")]
    IllegalAction(ActionKind),

    #[error("ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("ошибка архива: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("ошибка сериализации: {0}")]
    Json(#[from] serde_json::Error),
}

/// Источник решений для одного участника.
pub trait DecisionProvider: Send {
    fn name(&self) -> &str;

    fn get_action(
        &mut self,
        ctx: &GameContext,
        state: &RoundState,
        active: SeatIndex,
    ) -> Result<Action, BotError>;

    /// Уведомление о начале раздачи. Ошибки игнорируются вызывающим.
    fn hand_started(
        &mut self,
        _ctx: &GameContext,
        _state: &RoundState,
        _seat: SeatIndex,
    ) -> Result<(), BotError> {
        Ok(())
    }

    /// Уведомление о конце раздачи. Ошибки игнорируются вызывающим.
    fn hand_ended(
        &mut self,
        _ctx: &GameContext,
        _deltas: [i64; 2],
        _seat: SeatIndex,
    ) -> Result<(), BotError> {
        Ok(())
    }
}

/// Встроенный бот-заглушка: Check, если можно, иначе Fold.
#[derive(Clone, Debug)]
pub struct FallbackBot {
    name: String,
}

impl FallbackBot {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DecisionProvider for FallbackBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_action(
        &mut self,
        _ctx: &GameContext,
        state: &RoundState,
        _active: SeatIndex,
    ) -> Result<Action, BotError> {
        Ok(state.legal_actions().default_action())
    }
}

/// Встроенный «простой» бот: Check, иначе Call, иначе Fold.
#[derive(Clone, Debug)]
pub struct SimpleBot {
    name: String,
}

impl SimpleBot {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl DecisionProvider for SimpleBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_action(
        &mut self,
        _ctx: &GameContext,
        state: &RoundState,
        _active: SeatIndex,
    ) -> Result<Action, BotError> {
        let legal = state.legal_actions();
        Ok(if legal.contains(ActionKind::Check) {
            Action::Check
        } else if legal.contains(ActionKind::Call) {
            Action::Call
        } else {
            Action::Fold
        })
    }
}

/// Решение после проверки: действие всегда легально.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub action: Action,
    /// Строка для транскрипта, если бот упал и действие подставлено.
    pub warning: Option<String>,
}

/// Обёртка, которая не пускает ошибки бота в машину состояний.
///
/// Ошибка, паника или недопустимое действие → Check/Fold по умолчанию и
/// предупреждение. Рейз вне границ прижимается к ближайшей границе.
pub struct GuardedProvider {
    inner: Box<dyn DecisionProvider>,
}

impl GuardedProvider {
    pub fn new(inner: Box<dyn DecisionProvider>) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn decide(&mut self, ctx: &GameContext, state: &RoundState, active: SeatIndex) -> Decision {
        let inner = &mut self.inner;
        let result = catch_unwind(AssertUnwindSafe(|| inner.get_action(ctx, state, active)));

        let failure = match result {
            Ok(Ok(action)) => match sanitize(state, action) {
                Ok(action) => {
                    return Decision {
                        action,
                        warning: None,
                    }
                }
                Err(e) => e.to_string(),
            },
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
        };

        let warning = format!("{} strategy error: {}", self.inner.name(), failure);
        log::warn!("{warning}");
        Decision {
            action: state.legal_actions().default_action(),
            warning: Some(warning),
        }
    }

    pub fn notify_hand_started(&mut self, ctx: &GameContext, state: &RoundState, seat: SeatIndex) {
        let inner = &mut self.inner;
        match catch_unwind(AssertUnwindSafe(|| inner.hand_started(ctx, state, seat))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::debug!("{}: hand_started проигнорирован: {e}", self.inner.name()),
            Err(_) => log::debug!("{}: паника в hand_started", self.inner.name()),
        }
    }

    pub fn notify_hand_ended(&mut self, ctx: &GameContext, deltas: [i64; 2], seat: SeatIndex) {
        let inner = &mut self.inner;
        match catch_unwind(AssertUnwindSafe(|| inner.hand_ended(ctx, deltas, seat))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::debug!("{}: hand_ended проигнорирован: {e}", self.inner.name()),
            Err(_) => log::debug!("{}: паника в hand_ended", self.inner.name()),
        }
    }
}

fn sanitize(state: &RoundState, action: Action) -> Result<Action, BotError> {
    let kind = action.kind();
    if !state.legal_actions().contains(kind) {
        return Err(BotError::IllegalAction(kind));
    }
    match action {
        Action::Raise { amount } => {
            let (min, max) = state.raise_bounds();
            Ok(Action::Raise {
                amount: amount.clamp(min, max),
            })
        }
        other => Ok(other),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
