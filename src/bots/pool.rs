use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::bots::provider::GuardedProvider;
use crate::domain::SessionId;

/// Боты одной сессии по участникам: `[игрок, соперник]`.
pub type BotSet = [Option<GuardedProvider>; 2];

/// Живые боты по сессиям.
///
/// Сервис берёт набор на время операции и кладёт обратно, так что процесс
/// бота переживает запросы и получает все уведомления своей сессии.
#[derive(Default)]
pub struct LiveBots {
    sets: Mutex<HashMap<SessionId, BotSet>>,
}

impl LiveBots {
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(&self) -> MutexGuard<'_, HashMap<SessionId, BotSet>> {
        match self.sets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Забрать набор сессии, если он уже поднят.
    pub fn take(&self, id: SessionId) -> Option<BotSet> {
        self.sets().remove(&id)
    }

    pub fn put(&self, id: SessionId, bots: BotSet) {
        self.sets().insert(id, bots);
    }

    /// Закрыть ботов сессии. Процессы убиваются на drop.
    pub fn close(&self, id: SessionId) -> bool {
        let removed = self.sets().remove(&id);
        if removed.is_some() {
            log::debug!("сессия {id}: боты закрыты");
        }
        removed.is_some()
    }

    pub fn len(&self) -> usize {
        self.sets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
