//! Движок heads-up раздачи: легальные действия, переходы улиц, шоудаун,
//! банк и логи.
//!
//! Высокоуровневый объект: `RoundState`
//! Основные операции:
//!   - `legal_actions` / `raise_bounds` – что может сделать активный игрок
//!   - `proceed` – применить действие
//!   - `advance` – то же + фишки, запертые в банке этим переходом

pub mod actions;
pub mod codec;
pub mod errors;
pub mod hand_history;
pub mod pot;
pub mod round;

pub use actions::{Action, ActionKind, LegalActions};
pub use codec::StoredState;
pub use errors::EngineError;
pub use hand_history::{HandEvent, HandEventKind, HandHistory, Participant, PlayerFeed, SessionLogs};
pub use pot::{settle_commitments, Outcome, PotLedger};
pub use round::{HandState, RoundState, TerminalState, Transition};
