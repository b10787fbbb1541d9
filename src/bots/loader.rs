use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::bots::provider::{BotError, DecisionProvider, FallbackBot, SimpleBot};
use crate::bots::sandbox::{SandboxBot, Workspace};
use crate::bots::source::BotSource;
use crate::config::SandboxConfig;
use crate::domain::SeatIndex;

/// Найденный entry-файл + временный каталог, если его пришлось создать.
#[derive(Debug)]
pub struct ResolvedEntry {
    pub entry: PathBuf,
    pub workspace: Option<Workspace>,
}

/// Превращает `BotSource` в живой `DecisionProvider`.
#[derive(Clone, Debug, Default)]
pub struct BotLoader {
    config: SandboxConfig,
}

impl BotLoader {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Загрузить бота. Любая ошибка → `FallbackBot` и предупреждение в лог,
    /// сессия никогда не блокируется сломанным ботом.
    pub fn load(&self, source: &BotSource, name: &str, seat: SeatIndex) -> Box<dyn DecisionProvider> {
        match self.try_load(source, name, seat) {
            Ok(provider) => provider,
            Err(e) => {
                log::warn!(
                    "бот {name} ({}) не загружен, используется запасной: {e}",
                    source.describe()
                );
                Box::new(FallbackBot::new(name))
            }
        }
    }

    pub fn try_load(
        &self,
        source: &BotSource,
        name: &str,
        seat: SeatIndex,
    ) -> Result<Box<dyn DecisionProvider>, BotError> {
        if source.is_builtin() {
            return Ok(Box::new(SimpleBot::new(name)));
        }
        let resolved = self.resolve(source)?;
        let bot = SandboxBot::launch(&resolved.entry, resolved.workspace, name, seat, &self.config)?;
        Ok(Box::new(bot))
    }

    /// Найти entry-файл бота.
    pub fn resolve(&self, source: &BotSource) -> Result<ResolvedEntry, BotError> {
        let entry_name = &self.config.entry_file;
        match source {
            BotSource::Simple => Err(BotError::Load("встроенный бот не имеет файла".to_string())),

            BotSource::EntryFile { path } => {
                if path.is_file() {
                    Ok(ResolvedEntry {
                        entry: path.clone(),
                        workspace: None,
                    })
                } else {
                    Err(BotError::MissingEntry(path.clone()))
                }
            }

            BotSource::Directory { path } => {
                let entry = path.join(entry_name);
                if entry.is_file() {
                    Ok(ResolvedEntry {
                        entry,
                        workspace: None,
                    })
                } else {
                    Err(BotError::MissingEntry(entry))
                }
            }

            BotSource::Archive { path } => {
                let workspace = Workspace::create(&self.config.workspace_root())?;
                let mut archive = zip::ZipArchive::new(File::open(path)?)?;
                archive.extract(workspace.path())?;
                let entry = find_entry(workspace.path(), entry_name)?
                    .ok_or_else(|| BotError::MissingEntry(path.join(entry_name)))?;
                Ok(ResolvedEntry {
                    entry,
                    workspace: Some(workspace),
                })
            }

            BotSource::Inline { code } => {
                let workspace = Workspace::create(&self.config.workspace_root())?;
                let entry = workspace.path().join(entry_name);
                fs::write(&entry, code)?;
                make_executable(&entry)?;
                Ok(ResolvedEntry {
                    entry,
                    workspace: Some(workspace),
                })
            }
        }
    }
}

/// Первый `entry_name` в дереве каталогов (обход в отсортированном порядке).
pub fn find_entry(dir: &Path, entry_name: &str) -> io::Result<Option<PathBuf>> {
    let direct = dir.join(entry_name);
    if direct.is_file() {
        return Ok(Some(direct));
    }
    let mut subdirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();
    for sub in subdirs {
        if let Some(found) = find_entry(&sub, entry_name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
