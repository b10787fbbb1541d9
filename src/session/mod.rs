//! Игровая сессия: запись для хранилища, менеджер раздач, швы к внешнему
//! хранилищу и кошельку монет.

pub mod coins;
pub mod manager;
pub mod model;
pub mod store;

pub use coins::{CoinError, CoinLedger, InMemoryCoinLedger};
pub use manager::{HandStart, SessionError, SessionManager};
pub use model::{GameSession, HandSummary, PlayMode, SessionSetup};
pub use store::{InMemorySessionStore, SessionStore};
