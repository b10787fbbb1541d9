//! Движок хедз-ап покера (no-limit) и слой сессий с ботами.
//!
//! Слои снизу вверх:
//! - `domain` / `eval` - карты, фишки, оценка рук;
//! - `engine` - неизменяемая машина состояний раздачи, банк, логи;
//! - `bots` - поставщики решений и песочница для сторонних ботов;
//! - `session` - менеджер сессии, хранилище, монеты;
//! - `simulation` - фоновые прогоны бот-против-бота;
//! - `api` - команды, запросы и DTO для внешнего приложения.

pub mod api;
pub mod bots;
pub mod config;
pub mod domain;
pub mod engine;
pub mod eval;
pub mod infra;
pub mod session;
pub mod simulation;

pub use config::EngineConfig;
