//! Доменная модель: карты, фишки, колода, улицы.

pub mod card;
pub mod chips;
pub mod deck;
pub mod hand;

/// Идентификатор игровой сессии (пара игрок/бот или бот/бот).
pub type SessionId = u64;
/// Идентификатор пользователя во внешней системе (кошелёк монет).
pub type PlayerId = u64;
/// Индекс игрока внутри раздачи: 0 или 1.
pub type SeatIndex = usize;

pub use card::*;
pub use chips::*;
pub use deck::*;
pub use hand::*;
