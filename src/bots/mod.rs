//! Боты: интерфейс источника решений, встроенные боты, загрузка из файлов
//! и запуск в отдельном процессе.

pub mod loader;
pub mod pool;
pub mod protocol;
pub mod provider;
pub mod sandbox;
pub mod source;

pub use loader::{BotLoader, ResolvedEntry};
pub use pool::{BotSet, LiveBots};
pub use provider::{
    BotError, Decision, DecisionProvider, FallbackBot, GameContext, GuardedProvider, SimpleBot,
};
pub use sandbox::{SandboxBot, Workspace};
pub use source::BotSource;
