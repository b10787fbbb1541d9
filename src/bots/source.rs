use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Откуда брать бота.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BotSource {
    /// Встроенный простой бот (check/call/fold).
    #[default]
    Simple,
    /// Код бота целиком, будет записан во временный каталог как entry-файл.
    Inline { code: String },
    /// Каталог, внутри которого лежит entry-файл.
    Directory { path: PathBuf },
    /// Конкретный entry-файл.
    EntryFile { path: PathBuf },
    /// Zip-архив; entry-файл ищется рекурсивно после распаковки.
    Archive { path: PathBuf },
}

impl BotSource {
    /// Угадать вид источника по пути: каталог, `.zip` или обычный файл.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        if path.is_dir() {
            BotSource::Directory { path }
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        {
            BotSource::Archive { path }
        } else {
            BotSource::EntryFile { path }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, BotSource::Simple)
    }

    /// Короткое описание для логов.
    pub fn describe(&self) -> String {
        match self {
            BotSource::Simple => "built-in simple bot".to_string(),
            BotSource::Inline { .. } => "inline code".to_string(),
            BotSource::Directory { path } => format!("directory {}", path.display()),
            BotSource::EntryFile { path } => format!("file {}", path.display()),
            BotSource::Archive { path } => format!("archive {}", path.display()),
        }
    }
}
