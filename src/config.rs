//! Конфигурация движка: правила раздачи, песочница ботов, симуляция, логи.
//!
//! Все структуры - обычные serde-структуры с разумными значениями по
//! умолчанию; целиком конфиг можно прочитать из JSON-файла.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::chips::Chips;

/// Правила heads-up раздачи.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameRules {
    pub small_blind: Chips,
    pub big_blind: Chips,
    /// Стек при входе за стол (и при ребае).
    pub starting_stack: Chips,
    /// Последняя улица (число карт борда), обычно 5.
    pub final_street: u8,
}

impl GameRules {
    /// 1/2, стек 200, до ривера.
    pub fn standard() -> Self {
        Self {
            small_blind: Chips(1),
            big_blind: Chips(2),
            starting_stack: Chips(200),
            final_street: 5,
        }
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// Настройки запуска ботов в отдельном процессе.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Интерпретатор для entry-файла (`python3`). `None` - файл запускается
    /// напрямую как исполняемый.
    pub interpreter: Option<PathBuf>,
    /// Имя entry-файла, который ищется в каталоге / архиве.
    pub entry_file: String,
    #[serde(with = "millis")]
    pub call_timeout: Duration,
    #[serde(with = "millis")]
    pub handshake_timeout: Duration,
    /// Где создавать временные каталоги для inline-кода и архивов.
    pub workspace_root: Option<PathBuf>,
    pub limits: BotLimits,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: Some(PathBuf::from("python3")),
            entry_file: "player.py".to_string(),
            call_timeout: Duration::from_secs(2),
            handshake_timeout: Duration::from_secs(5),
            workspace_root: None,
            limits: BotLimits::default(),
        }
    }
}

/// Ограничения процесса бота.
///
/// rlimit-поля применяются только на unix; `None` оставляет лимит
/// родительского процесса.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BotLimits {
    /// Процессорное время за всю жизнь процесса, секунды.
    pub cpu_seconds: Option<u64>,
    /// Адресное пространство, байты.
    pub memory_bytes: Option<u64>,
    /// Максимальный размер файла, который бот может записать.
    pub file_size_bytes: Option<u64>,
    pub open_files: Option<u64>,
    /// Самая длинная строка ответа; длиннее - ошибка протокола.
    pub max_line_bytes: usize,
    /// Сколько непрочитанных строк держим, прежде чем перестать читать stdout.
    pub reply_queue: usize,
}

impl Default for BotLimits {
    fn default() -> Self {
        Self {
            cpu_seconds: Some(600),
            memory_bytes: Some(1024 * 1024 * 1024),
            file_size_bytes: Some(16 * 1024 * 1024),
            open_files: Some(64),
            max_line_bytes: 64 * 1024,
            reply_queue: 16,
        }
    }
}

impl SandboxConfig {
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Пауза между шагами, чтобы не забивать хранилище.
    #[serde(with = "millis")]
    pub step_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(50),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Лимит компактной ленты одного игрока в байтах.
    pub player_log_limit: usize,
    /// Каталог для `gamelog.txt` и лент игроков; `None` - логи только в памяти.
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            player_log_limit: 1024 * 1024,
            log_dir: None,
        }
    }
}

/// Вся конфигурация целиком.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    pub rules: GameRules,
    pub sandbox: SandboxConfig,
    pub simulation: SimulationConfig,
    pub logs: LogConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать конфиг {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("некорректный конфиг: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("некорректные правила: {0}")]
    Invalid(&'static str),
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rules = &self.rules;
        if rules.big_blind.is_zero() || rules.small_blind > rules.big_blind {
            return Err(ConfigError::Invalid("нужно 0 < small_blind <= big_blind"));
        }
        if rules.starting_stack < rules.big_blind {
            return Err(ConfigError::Invalid("стартовый стек меньше big_blind"));
        }
        if !matches!(rules.final_street, 0 | 3 | 4 | 5) {
            return Err(ConfigError::Invalid("final_street должен быть 0, 3, 4 или 5"));
        }
        let limits = &self.sandbox.limits;
        if limits.max_line_bytes == 0 || limits.reply_queue == 0 {
            return Err(ConfigError::Invalid("лимиты строки и очереди бота должны быть больше нуля"));
        }
        Ok(())
    }
}

/// `Duration` в конфиге пишется целым числом миллисекунд.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
