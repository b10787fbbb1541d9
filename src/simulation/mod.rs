//! Фоновые симуляции бот-против-бота.

pub mod registry;
pub mod runner;

pub use registry::SimulationRegistry;
pub use runner::{ManagerFactory, SimulationHandle, SimulationProgress, SimulationRunner};
