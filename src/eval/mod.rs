//! Модуль оценки силы покерных рук (Texas Hold'em).
//!
//! Для движка это внешний коллаборатор: на шоудауне `RoundState` спрашивает
//! `HandEvaluator` и сравнивает результаты. По умолчанию - `StandardEvaluator`.

pub mod evaluator;
pub mod hand_rank;
pub mod lookup_tables;

pub use evaluator::{evaluate_best_hand, HandEvaluator, StandardEvaluator};
pub use hand_rank::{HandCategory, HandRank};
