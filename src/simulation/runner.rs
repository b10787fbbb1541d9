use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::SimulationConfig;
use crate::domain::SessionId;
use crate::session::{GameSession, HandStart, SessionError, SessionManager, SessionStore};

/// Как заново поднять менеджер по записи из хранилища, если шаг упал вместе
/// с менеджером.
pub type ManagerFactory = Box<dyn Fn(GameSession) -> SessionManager + Send + Sync>;

/// Прогресс фоновой симуляции.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationProgress {
    pub running: bool,
    pub hands_played: u32,
    pub last_error: Option<String>,
}

/// Ручка запущенного раннера.
pub struct SimulationHandle {
    stop: watch::Sender<bool>,
    progress: watch::Receiver<SimulationProgress>,
    task: JoinHandle<()>,
}

impl SimulationHandle {
    pub fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }

    /// Попросить раннер остановиться между шагами.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn progress(&self) -> SimulationProgress {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SimulationProgress> {
        self.progress.clone()
    }

    /// Дождаться завершения задачи.
    pub async fn join(self) -> SimulationProgress {
        if let Err(e) = self.task.await {
            log::error!("задача симуляции упала: {e}");
        }
        let progress = self.progress.borrow().clone();
        progress
    }
}

/// Что получилось на шаге.
enum StepOutcome {
    Continue { error: Option<String> },
    Fatal(String),
}

/// Фоновый прогон бот-против-бота для одной сессии.
pub struct SimulationRunner {
    manager: SessionManager,
    store: Arc<dyn SessionStore>,
    config: SimulationConfig,
    rebuild: Option<ManagerFactory>,
}

impl SimulationRunner {
    pub fn new(manager: SessionManager, store: Arc<dyn SessionStore>, config: SimulationConfig) -> Self {
        Self {
            manager,
            store,
            config,
            rebuild: None,
        }
    }

    /// Без фабрики паника внутри шага останавливает прогон.
    pub fn with_rebuild(mut self, rebuild: ManagerFactory) -> Self {
        self.rebuild = Some(rebuild);
        self
    }

    /// Запустить раннер как tokio-задачу.
    pub fn spawn(self) -> SimulationHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let initial = SimulationProgress {
            running: true,
            hands_played: self.manager.session().hands_played,
            last_error: None,
        };
        let (progress_tx, progress_rx) = watch::channel(initial);
        let task = tokio::spawn(self.run(stop_rx, progress_tx));
        SimulationHandle {
            stop: stop_tx,
            progress: progress_rx,
            task,
        }
    }

    async fn run(self, mut stop: watch::Receiver<bool>, progress: watch::Sender<SimulationProgress>) {
        let Self {
            mut manager,
            store,
            config,
            rebuild,
        } = self;
        let id = manager.session().id;
        manager.session_mut().simulation_running = true;
        store.save(manager.session());
        log::info!("сессия {id}: симуляция запущена");

        let mut last_error = None;
        loop {
            if *stop.borrow() {
                log::info!("сессия {id}: симуляция остановлена по запросу");
                break;
            }
            if manager.session().is_game_complete() {
                break;
            }

            let joined = tokio::task::spawn_blocking(move || {
                let outcome = step(&mut manager);
                (manager, outcome)
            })
            .await;
            let (returned, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    // менеджер потерян вместе с задачей: в хранилище остаётся последний шаг
                    let message = format!("шаг симуляции упал: {e}");
                    log::error!("сессия {id}: {message}");
                    let reloaded = rebuild
                        .as_ref()
                        .zip(store.load(id))
                        .map(|(rebuild, session)| rebuild(session));
                    let Some(mut fresh) = reloaded else {
                        abandon(store.as_ref(), &progress, id, message);
                        return;
                    };
                    let joined = tokio::task::spawn_blocking(move || {
                        let outcome = restart_after_failure(&mut fresh, message);
                        (fresh, outcome)
                    })
                    .await;
                    match joined {
                        Ok(pair) => pair,
                        Err(e) => {
                            abandon(store.as_ref(), &progress, id, format!("перезапуск упал: {e}"));
                            return;
                        }
                    }
                }
            };
            manager = returned;

            let fatal = match outcome {
                StepOutcome::Continue { error } => {
                    if error.is_some() {
                        last_error = error;
                    }
                    false
                }
                StepOutcome::Fatal(message) => {
                    log::error!("сессия {id}: симуляция прервана: {message}");
                    last_error = Some(message);
                    true
                }
            };

            store.save(manager.session());
            progress.send_replace(SimulationProgress {
                running: !fatal,
                hands_played: manager.session().hands_played,
                last_error: last_error.clone(),
            });
            if fatal {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(config.step_delay) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        manager.session_mut().simulation_running = false;
        if let Err(e) = manager.save_logs() {
            log::warn!("сессия {id}: {e}");
        }
        store.save(manager.session());
        let hands_played = manager.session().hands_played;
        progress.send_replace(SimulationProgress {
            running: false,
            hands_played,
            last_error,
        });
        log::info!("сессия {id}: симуляция завершена, сыграно {hands_played}");
    }
}

/// Закончить прогон без менеджера: снять флаг и отдать ошибку в прогресс.
fn abandon(
    store: &dyn SessionStore,
    progress: &watch::Sender<SimulationProgress>,
    id: SessionId,
    message: String,
) {
    log::error!("сессия {id}: симуляция прервана: {message}");
    store.set_simulation_running(id, false);
    let hands_played = progress.borrow().hands_played;
    progress.send_replace(SimulationProgress {
        running: false,
        hands_played,
        last_error: Some(message),
    });
}

/// Один шаг: новая раздача после завершённой или ход ботов.
///
/// Ошибка шага - раздача засчитывается сыгранной и начинается новая;
/// фатально только если новую раздачу начать не удалось.
fn step(manager: &mut SessionManager) -> StepOutcome {
    let result = if manager.hand_complete() {
        manager.start_new_hand(true).and_then(|start| match start {
            HandStart::Started(_) => Ok(()),
            HandStart::BuyInRequired => Err(SessionError::BuyInRequired),
        })
    } else {
        manager.process_step(None).map(|_| ())
    };

    match result {
        Ok(()) => StepOutcome::Continue { error: None },
        Err(SessionError::GameComplete) => StepOutcome::Continue { error: None },
        Err(e @ (SessionError::Busted { .. } | SessionError::BuyInRequired)) => {
            StepOutcome::Fatal(e.to_string())
        }
        Err(e) => {
            let message = e.to_string();
            log::warn!("сессия {}: шаг не удался: {message}", manager.session().id);
            restart_after_failure(manager, message)
        }
    }
}

/// Засчитать упавшую раздачу сыгранной и начать новую.
fn restart_after_failure(manager: &mut SessionManager, message: String) -> StepOutcome {
    manager.session_mut().hands_played += 1;
    if manager.session().is_game_complete() {
        return StepOutcome::Continue {
            error: Some(message),
        };
    }
    match manager.start_new_hand(true) {
        Ok(HandStart::Started(_)) => StepOutcome::Continue {
            error: Some(message),
        },
        Ok(HandStart::BuyInRequired) => {
            StepOutcome::Fatal(format!("{message}; новая раздача требует бай-ин"))
        }
        Err(restart) => StepOutcome::Fatal(format!("{message}; перезапуск: {restart}")),
    }
}
