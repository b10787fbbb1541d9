//! Протокол общения с ботом в отдельном процессе: один JSON-объект на
//! строку в stdin/stdout.
//!
//! ```text
//! -> {"type":"hello","name":"bot","seat":0}
//! <- {"ready":true,"methods":["get_action"]}
//! -> {"type":"get_action","context":{..},"state":{..},"active":0,"legal":["check","raise"],"raise_bounds":[2,200]}
//! <- {"action":"raise","amount":6}
//! -> {"type":"hand_started",..}   (без ответа)
//! -> {"type":"hand_ended",..}     (без ответа)
//! ```

use serde::{Deserialize, Serialize};

use crate::bots::provider::{BotError, GameContext};
use crate::domain::chips::Chips;
use crate::domain::SeatIndex;
use crate::engine::{Action, ActionKind, LegalActions};

/// Метод, без которого бот не считается загруженным.
pub const GET_ACTION: &str = "get_action";

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request<'a> {
    Hello {
        name: &'a str,
        seat: SeatIndex,
    },
    GetAction {
        context: &'a GameContext,
        state: serde_json::Value,
        active: SeatIndex,
        legal: &'a LegalActions,
        raise_bounds: [Chips; 2],
    },
    HandStarted {
        context: &'a GameContext,
        state: serde_json::Value,
        seat: SeatIndex,
    },
    HandEnded {
        context: &'a GameContext,
        deltas: [i64; 2],
        seat: SeatIndex,
    },
}

impl Request<'_> {
    /// Ждём ли ответную строку.
    pub fn expects_reply(&self) -> bool {
        matches!(self, Request::Hello { .. } | Request::GetAction { .. })
    }
}

#[derive(Debug, Deserialize)]
pub struct HelloReply {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub methods: Vec<String>,
}

impl HelloReply {
    pub fn supports_get_action(&self) -> bool {
        self.ready && self.methods.iter().any(|m| m == GET_ACTION)
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionReply {
    pub action: String,
    #[serde(default)]
    pub amount: Option<u64>,
}

impl ActionReply {
    pub fn parse(line: &str) -> Result<Action, BotError> {
        let reply: ActionReply = serde_json::from_str(line.trim())
            .map_err(|e| BotError::Protocol(format!("{e}: {line:?}")))?;
        reply.into_action()
    }

    pub fn into_action(self) -> Result<Action, BotError> {
        let kind = ActionKind::from_name(&self.action)
            .ok_or_else(|| BotError::Protocol(format!("неизвестное действие {:?}", self.action)))?;
        Ok(match kind {
            ActionKind::Fold => Action::Fold,
            ActionKind::Call => Action::Call,
            ActionKind::Check => Action::Check,
            ActionKind::Raise => {
                let amount = self
                    .amount
                    .ok_or_else(|| BotError::Protocol("raise без amount".to_string()))?;
                Action::raise(amount)
            }
        })
    }
}
