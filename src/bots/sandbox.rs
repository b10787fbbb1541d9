//! Бот в отдельном процессе.
//!
//! Процесс получает только сериализованное состояние раздачи, индекс
//! активного места, легальные действия, границы рейза и контекст. На каждый
//! вызов - таймаут; при таймауте, EOF или падении процесс убивается, и все
//! следующие вызовы возвращают `BotError::Runtime`.
//!
//! Окружение процесса очищается (остаются `PATH` и `HOME` = каталог бота),
//! на unix ставятся rlimit'ы из `BotLimits`. Строки ответа длиннее
//! `max_line_bytes` обрывают процесс, очередь непрочитанных строк ограничена.

use std::env;
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::bots::protocol::{ActionReply, HelloReply, Request};
use crate::bots::provider::{BotError, DecisionProvider, GameContext};
use crate::config::{BotLimits, SandboxConfig};
use crate::domain::SeatIndex;
use crate::engine::codec;
use crate::engine::{Action, RoundState};
use crate::infra::workspace_name;

/// Временный каталог бота; удаляется вместе с содержимым на drop.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub fn create(root: &Path) -> io::Result<Self> {
        let path = root.join(workspace_name("poker-bot-"));
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            log::debug!("не удалось удалить {}: {e}", self.path.display());
        }
    }
}

/// Запущенный процесс бота.
struct BotProcess {
    child: Child,
    stdin: ChildStdin,
    replies: Receiver<io::Result<String>>,
}

impl BotProcess {
    fn spawn(entry: &Path, args: &[String], config: &SandboxConfig) -> Result<Self, BotError> {
        let mut cmd = match &config.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(entry);
                cmd
            }
            None => Command::new(entry),
        };
        cmd.env_clear();
        if let Some(path) = env::var_os("PATH") {
            cmd.env("PATH", path);
        }
        if let Some(dir) = entry.parent() {
            cmd.current_dir(dir).env("HOME", dir);
        }
        apply_limits(&mut cmd, &config.limits);
        let mut child = cmd
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BotError::Load("нет stdin/stdout у процесса бота".to_string()));
            }
        };

        let max_line = config.limits.max_line_bytes;
        let (tx, replies) = mpsc::sync_channel(config.limits.reply_queue);
        thread::Builder::new()
            .name("bot-reader".to_string())
            .spawn(move || {
                let mut reader = BufReader::new(stdout);
                loop {
                    let line = match read_capped_line(&mut reader, max_line) {
                        Ok(Some(line)) => Ok(line),
                        Ok(None) => break,
                        Err(e) => Err(e),
                    };
                    let failed = line.is_err();
                    if tx.send(line).is_err() || failed {
                        break;
                    }
                }
            })?;

        Ok(Self {
            child,
            stdin,
            replies,
        })
    }

    fn send(&mut self, request: &Request<'_>) -> Result<(), BotError> {
        let line = serde_json::to_string(request)?;
        writeln!(self.stdin, "{line}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> Result<String, BotError> {
        match self.replies.recv_timeout(timeout) {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(e)) => Err(BotError::Io(e)),
            Err(RecvTimeoutError::Timeout) => Err(BotError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(BotError::Runtime("процесс бота завершился".to_string()))
            }
        }
    }

    /// Выкинуть строки, которые бот прислал без запроса.
    fn drain_stale(&mut self) {
        while let Ok(line) = self.replies.try_recv() {
            log::trace!("лишняя строка от бота: {line:?}");
        }
    }

    fn handshake(&mut self, name: &str, seat: SeatIndex, timeout: Duration) -> Result<(), BotError> {
        self.send(&Request::Hello { name, seat })?;
        let line = self.recv(timeout)?;
        let reply: HelloReply = serde_json::from_str(line.trim())
            .map_err(|e| BotError::Protocol(format!("handshake: {e}")))?;
        if reply.supports_get_action() {
            Ok(())
        } else {
            Err(BotError::Load("бот не объявил метод get_action".to_string()))
        }
    }
}

/// Прочитать одну строку не длиннее `limit` байт (без перевода строки).
///
/// `Ok(None)` - EOF. Более длинная строка - `InvalidData`, остаток не читается.
pub fn read_capped_line<R: BufRead>(reader: &mut R, limit: usize) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    let read = reader
        .by_ref()
        .take(limit as u64 + 1)
        .read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("строка от бота длиннее {limit} байт"),
        ));
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(unix)]
fn apply_limits(cmd: &mut Command, limits: &BotLimits) {
    use std::os::unix::process::CommandExt;

    use rlimit::Resource;

    let plan: Vec<(Resource, u64)> = [
        (Resource::CPU, limits.cpu_seconds),
        (Resource::AS, limits.memory_bytes),
        (Resource::FSIZE, limits.file_size_bytes),
        (Resource::NOFILE, limits.open_files),
    ]
    .into_iter()
    .filter_map(|(resource, value)| {
        let value = value?;
        // поднять hard-лимит без прав нельзя: берём меньшее из двух
        let hard = rlimit::getrlimit(resource).map_or(rlimit::INFINITY, |(_, hard)| hard);
        Some((resource, value.min(hard)))
    })
    .collect();
    if plan.is_empty() {
        return;
    }

    // SAFETY: между fork и exec вызывается только setrlimit, без аллокаций
    unsafe {
        cmd.pre_exec(move || {
            for (resource, value) in &plan {
                rlimit::setrlimit(*resource, *value, *value)?;
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn apply_limits(_cmd: &mut Command, limits: &BotLimits) {
    log::debug!("rlimit недоступен на этой платформе, лимиты процесса не применяются: {limits:?}");
}

impl Drop for BotProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// `DecisionProvider` поверх процесса бота.
pub struct SandboxBot {
    name: String,
    call_timeout: Duration,
    process: Option<BotProcess>,
    // после процесса: каталог удаляется, когда процесс уже убит
    _workspace: Option<Workspace>,
}

impl SandboxBot {
    /// Запустить entry-файл и дождаться ответа на handshake.
    ///
    /// Пробуем по очереди: без аргументов, `--name <bot>`, `--index <seat>`.
    pub fn launch(
        entry: &Path,
        workspace: Option<Workspace>,
        name: &str,
        seat: SeatIndex,
        config: &SandboxConfig,
    ) -> Result<Self, BotError> {
        let entry = entry.canonicalize()?;
        let attempts = [
            Vec::new(),
            vec!["--name".to_string(), name.to_string()],
            vec!["--index".to_string(), seat.to_string()],
        ];

        let mut failures = Vec::new();
        for args in attempts.iter() {
            let attempt = BotProcess::spawn(&entry, args, config).and_then(|mut process| {
                process.handshake(name, seat, config.handshake_timeout)?;
                Ok(process)
            });
            match attempt {
                Ok(process) => {
                    log::info!("бот {name} запущен из {} {:?}", entry.display(), args);
                    return Ok(Self {
                        name: name.to_string(),
                        call_timeout: config.call_timeout,
                        process: Some(process),
                        _workspace: workspace,
                    });
                }
                Err(e) => {
                    log::debug!("бот {name}: попытка {:?} не удалась: {e}", args);
                    failures.push(e.to_string());
                }
            }
        }
        Err(BotError::Load(format!(
            "{}: {}",
            entry.display(),
            failures.join("; ")
        )))
    }

    pub fn is_alive(&self) -> bool {
        self.process.is_some()
    }

    fn call(&mut self, request: &Request<'_>) -> Result<Option<String>, BotError> {
        let timeout = self.call_timeout;
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| BotError::Runtime("процесс бота остановлен".to_string()))?;

        process.drain_stale();
        let result = process.send(request).and_then(|()| {
            if request.expects_reply() {
                process.recv(timeout).map(Some)
            } else {
                Ok(None)
            }
        });

        if let Err(e) = &result {
            log::warn!("бот {}: {e}, процесс остановлен", self.name);
            self.process = None;
        }
        result
    }
}

impl DecisionProvider for SandboxBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_action(
        &mut self,
        ctx: &GameContext,
        state: &RoundState,
        active: SeatIndex,
    ) -> Result<Action, BotError> {
        let legal = state.legal_actions();
        let (min, max) = state.raise_bounds();
        let request = Request::GetAction {
            context: ctx,
            state: state_value(state)?,
            active,
            legal: &legal,
            raise_bounds: [min, max],
        };
        match self.call(&request)? {
            Some(line) => ActionReply::parse(&line),
            None => Err(BotError::Protocol("нет ответа на get_action".to_string())),
        }
    }

    fn hand_started(
        &mut self,
        ctx: &GameContext,
        state: &RoundState,
        seat: SeatIndex,
    ) -> Result<(), BotError> {
        let request = Request::HandStarted {
            context: ctx,
            state: state_value(state)?,
            seat,
        };
        self.call(&request).map(|_| ())
    }

    fn hand_ended(&mut self, ctx: &GameContext, deltas: [i64; 2], seat: SeatIndex) -> Result<(), BotError> {
        let request = Request::HandEnded {
            context: ctx,
            deltas,
            seat,
        };
        self.call(&request).map(|_| ())
    }
}

fn state_value(state: &RoundState) -> Result<serde_json::Value, BotError> {
    codec::round_to_value(state).map_err(|e| BotError::Protocol(e.to_string()))
}
