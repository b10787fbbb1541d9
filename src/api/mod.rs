//! Внешний API движка.
//!
//! Здесь описываются:
//! - команды (commands.rs) - всё, что меняет состояние сессии;
//! - запросы (queries.rs) - только чтение;
//! - DTO (dto.rs) - структуры для клиента;
//! - ошибки (errors.rs) - то, что видит клиент;
//! - сервис (service.rs) - исполнение команд поверх хранилища.

pub mod commands;
pub mod dto;
pub mod errors;
pub mod queries;
pub mod service;

pub use commands::*;
pub use dto::*;
pub use errors::*;
pub use queries::*;
pub use service::SessionService;
