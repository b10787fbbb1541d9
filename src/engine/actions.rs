use core::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::chips::Chips;

/// Тип действия без параметров - то, из чего состоит набор легальных действий.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fold,
    Call,
    Check,
    Raise,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Fold,
        ActionKind::Call,
        ActionKind::Check,
        ActionKind::Raise,
    ];

    /// Имя в протоколе ботов и DTO (`fold`, `call`, ...).
    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Fold => "fold",
            ActionKind::Call => "call",
            ActionKind::Check => "check",
            ActionKind::Raise => "raise",
        }
    }

    pub fn from_name(name: &str) -> Option<ActionKind> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Действие игрока в раздаче.
///
/// `Raise.amount` - целевой общий вклад игрока на этой улице (pip после
/// рейза), а не прирост.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    Fold,
    Call,
    Check,
    Raise { amount: Chips },
}

impl Action {
    pub fn raise(amount: u64) -> Self {
        Action::Raise {
            amount: Chips(amount),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Fold => ActionKind::Fold,
            Action::Call => ActionKind::Call,
            Action::Check => ActionKind::Check,
            Action::Raise { .. } => ActionKind::Raise,
        }
    }

    /// Компактный код для ленты игрока: `F`, `C`, `K`, `R<amt>`.
    pub fn compact_code(&self) -> String {
        match self {
            Action::Fold => "F".to_string(),
            Action::Call => "C".to_string(),
            Action::Check => "K".to_string(),
            Action::Raise { amount } => format!("R{amount}"),
        }
    }
}

/// Набор легальных действий в точке принятия решения.
///
/// Порядок фиксирован (Fold, Call, Check, Raise), поэтому сравнение и
/// сериализация стабильны.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegalActions {
    kinds: Vec<ActionKind>,
}

impl LegalActions {
    pub fn new(kinds: impl IntoIterator<Item = ActionKind>) -> Self {
        let mut kinds: Vec<ActionKind> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        Self { kinds }
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ActionKind> + '_ {
        self.kinds.iter().copied()
    }

    pub fn as_slice(&self) -> &[ActionKind] {
        &self.kinds
    }

    /// Действие по умолчанию для упавшего/зависшего бота: Check, иначе Fold.
    pub fn default_action(&self) -> Action {
        if self.contains(ActionKind::Check) {
            Action::Check
        } else {
            Action::Fold
        }
    }
}

impl Serialize for LegalActions {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.kinds.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LegalActions {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kinds = Vec::<ActionKind>::deserialize(deserializer)?;
        Ok(LegalActions::new(kinds))
    }
}
