use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::domain::SessionId;
use crate::session::SessionError;
use crate::simulation::runner::{SimulationHandle, SimulationProgress, SimulationRunner};

/// Реестр фоновых симуляций: не больше одного живого раннера на сессию.
#[derive(Default)]
pub struct SimulationRegistry {
    handles: Mutex<HashMap<SessionId, SimulationHandle>>,
}

impl SimulationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Запустить симуляцию, если для сессии ещё нет живого раннера.
    ///
    /// `make` вызывается только когда запуск действительно нужен.
    /// Возвращает `false`, если раннер уже работает.
    pub async fn start_with<F>(&self, id: SessionId, make: F) -> Result<bool, SessionError>
    where
        F: FnOnce() -> Result<SimulationRunner, SessionError>,
    {
        let mut handles = self.handles.lock().await;
        if handles.get(&id).is_some_and(SimulationHandle::is_alive) {
            log::debug!("сессия {id}: симуляция уже идёт");
            return Ok(false);
        }
        let runner = make()?;
        handles.insert(id, runner.spawn());
        Ok(true)
    }

    /// Попросить раннер остановиться. `false`, если живого раннера нет.
    pub async fn stop(&self, id: SessionId) -> bool {
        let handles = self.handles.lock().await;
        match handles.get(&id) {
            Some(handle) if handle.is_alive() => {
                handle.stop();
                true
            }
            _ => false,
        }
    }

    pub async fn status(&self, id: SessionId) -> Option<SimulationProgress> {
        self.handles.lock().await.get(&id).map(SimulationHandle::progress)
    }

    pub async fn is_running(&self, id: SessionId) -> bool {
        self.handles
            .lock()
            .await
            .get(&id)
            .is_some_and(SimulationHandle::is_alive)
    }

    /// Дождаться окончания раннера и убрать его из реестра.
    pub async fn join(&self, id: SessionId) -> Option<SimulationProgress> {
        let handle = self.handles.lock().await.remove(&id)?;
        Some(handle.join().await)
    }
}
