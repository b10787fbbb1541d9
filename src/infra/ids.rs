use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::SessionId;

/// Простая генерация ID на основе монотонных счётчиков.
///
/// В проде ID сессии обычно выдаёт внешнее приложение (оно же хранит
/// записи), этот генератор - для CLI, тестов и in-memory режима.
#[derive(Debug)]
pub struct IdGenerator {
    session_counter: AtomicU64,
}

impl IdGenerator {
    /// Создать генератор с начальным значением 1.
    pub fn new() -> Self {
        Self {
            session_counter: AtomicU64::new(1),
        }
    }

    #[inline]
    pub fn next_session_id(&self) -> SessionId {
        self.session_counter.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Уникальное имя для временного каталога песочницы бота.
pub fn workspace_name(prefix: &str) -> String {
    format!("{prefix}{}", uuid::Uuid::new_v4().simple())
}
