use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::domain::chips::Chips;
use crate::domain::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinError {
    #[error("у игрока {player_id} {available} монет, нужно {required}")]
    InsufficientCoins {
        player_id: PlayerId,
        available: Chips,
        required: Chips,
    },
}

/// Кошелёк монет пользователя во внешней системе.
pub trait CoinLedger: Send + Sync {
    fn balance(&self, player_id: PlayerId) -> Chips;

    /// Списать монеты под бай-ин.
    fn withdraw(&self, player_id: PlayerId, amount: Chips) -> Result<(), CoinError>;

    /// Вернуть фишки со стола на счёт.
    fn deposit(&self, player_id: PlayerId, amount: Chips);
}

#[derive(Debug, Default)]
pub struct InMemoryCoinLedger {
    balances: Mutex<HashMap<PlayerId, Chips>>,
}

impl InMemoryCoinLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(player_id: PlayerId, amount: Chips) -> Self {
        let ledger = Self::new();
        ledger.deposit(player_id, amount);
        ledger
    }

    fn with_balances<T>(&self, f: impl FnOnce(&mut HashMap<PlayerId, Chips>) -> T) -> T {
        match self.balances.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl CoinLedger for InMemoryCoinLedger {
    fn balance(&self, player_id: PlayerId) -> Chips {
        self.with_balances(|b| b.get(&player_id).copied().unwrap_or_default())
    }

    fn withdraw(&self, player_id: PlayerId, amount: Chips) -> Result<(), CoinError> {
        self.with_balances(|b| {
            let available = b.get(&player_id).copied().unwrap_or_default();
            let rest = available
                .checked_sub(amount)
                .ok_or(CoinError::InsufficientCoins {
                    player_id,
                    available,
                    required: amount,
                })?;
            b.insert(player_id, rest);
            Ok(())
        })
    }

    fn deposit(&self, player_id: PlayerId, amount: Chips) {
        self.with_balances(|b| {
            *b.entry(player_id).or_default() += amount;
        });
    }
}
