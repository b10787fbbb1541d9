use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::SessionId;
use crate::session::model::GameSession;

/// Абстракция хранилища сессий.
///
/// Реальное хранилище принадлежит внешнему приложению; ядро только читает
/// и пишет запись целиком, по разу за шаг.
pub trait SessionStore: Send + Sync {
    /// Загрузить сессию.
    fn load(&self, id: SessionId) -> Option<GameSession>;

    /// Сохранить сессию (перезаписать целиком).
    fn save(&self, session: &GameSession);

    /// Обновить только флаг симуляции, не трогая остальное.
    fn set_simulation_running(&self, id: SessionId, running: bool) {
        if let Some(mut session) = self.load(id) {
            session.simulation_running = running;
            self.save(&session);
        }
    }
}

/// Простая in-memory реализация для тестов и локального запуска.
/// Записи по одной сессии сериализуются мьютексом.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, GameSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, id: SessionId) -> Option<GameSession> {
        match self.sessions.lock() {
            Ok(sessions) => sessions.get(&id).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&id).cloned(),
        }
    }

    fn save(&self, session: &GameSession) {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.insert(session.id, session.clone());
    }

    fn set_simulation_running(&self, id: SessionId, running: bool) {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(session) = sessions.get_mut(&id) {
            session.simulation_running = running;
        }
    }
}
