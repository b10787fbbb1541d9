use serde::{Deserialize, Serialize};

use crate::bots::BotSource;
use crate::domain::card::Card;
use crate::domain::chips::Chips;
use crate::domain::{PlayerId, SessionId};
use crate::engine::hand_history::{Participant, SessionLogs};
use crate::engine::pot::PotLedger;

/// Кто играет за участника 0.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Человек против бота.
    Human,
    /// Бот игрока против бота-соперника.
    Bot,
}

/// Настройки новой сессии.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionSetup {
    pub play_mode: PlayMode,
    pub player_id: PlayerId,
    pub player_name: String,
    /// Бот за участника 0 (только в режиме `Bot`).
    pub player_bot: Option<BotSource>,
    pub opponent_name: String,
    pub opponent_bot: BotSource,
    pub hands_to_play: u32,
    pub max_rebuys: u32,
}

impl SessionSetup {
    pub fn human_vs_bot(player_id: PlayerId, opponent_bot: BotSource) -> Self {
        Self {
            play_mode: PlayMode::Human,
            player_id,
            player_name: "Player".to_string(),
            player_bot: None,
            opponent_name: "Opponent".to_string(),
            opponent_bot,
            hands_to_play: 0,
            max_rebuys: 0,
        }
    }

    pub fn bot_vs_bot(player_id: PlayerId, player_bot: BotSource, opponent_bot: BotSource, hands: u32) -> Self {
        Self {
            play_mode: PlayMode::Bot,
            player_id,
            player_name: "PlayerBot".to_string(),
            player_bot: Some(player_bot),
            opponent_name: "OpponentBot".to_string(),
            opponent_bot,
            hands_to_play: hands,
            max_rebuys: 0,
        }
    }
}

/// Итог последней завершённой раздачи (по участникам).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandSummary {
    pub hand_number: u32,
    pub hands: [[Card; 2]; 2],
    pub board: Vec<Card>,
    pub deltas: [i64; 2],
    /// Дошло ли до вскрытия.
    pub showdown: bool,
}

/// Запись сессии - единица хранения.
///
/// Участник 0 - игрок (или его бот), участник 1 - бот-соперник. Место в
/// `RoundState` определяется `button_owner`: он сидит на месте 0 (малый
/// блайнд, первым ходит префлоп).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GameSession {
    pub id: SessionId,
    pub play_mode: PlayMode,
    pub player_id: PlayerId,
    pub names: [String; 2],
    pub player_bot: Option<BotSource>,
    pub opponent_bot: BotSource,

    /// Сериализованное состояние раздачи (`None` - раздача ещё не начиналась).
    pub game_state: Option<String>,
    /// Стеки участников вне банка.
    pub stacks: [Chips; 2],
    /// Живой банк: запертые фишки + pips текущей улицы.
    pub pot: Chips,
    pub ledger: PotLedger,
    pub button_owner: Participant,
    /// Стеки участников до блайндов текущей раздачи.
    pub hand_start_stacks: [Chips; 2],
    pub last_hand: Option<HandSummary>,

    pub hands_to_play: u32,
    pub hands_played: u32,
    /// Монеты игрока за столом (человеческий режим).
    pub current_coins: Chips,
    pub initial_stack: Chips,
    pub max_rebuys: u32,
    pub rebuys_used: [u32; 2],
    /// Накопленный результат участника по сыгранным раздачам.
    pub results: [i64; 2],
    pub simulation_running: bool,
    /// Суммарное время решений участников, секунды.
    pub game_clock: [f64; 2],
    pub logs: SessionLogs,
}

impl GameSession {
    pub fn new(id: SessionId, setup: SessionSetup, initial_stack: Chips, player_log_limit: usize) -> Self {
        let names = [setup.player_name, setup.opponent_name];
        let stacks = match setup.play_mode {
            // в человеческом режиме стек игрока появляется после бай-ина
            PlayMode::Human => [Chips::ZERO, initial_stack],
            PlayMode::Bot => [initial_stack, initial_stack],
        };
        Self {
            id,
            play_mode: setup.play_mode,
            player_id: setup.player_id,
            logs: SessionLogs::new(names.clone(), player_log_limit),
            names,
            player_bot: setup.player_bot,
            opponent_bot: setup.opponent_bot,
            game_state: None,
            stacks,
            pot: Chips::ZERO,
            ledger: PotLedger::new(),
            button_owner: 0,
            hand_start_stacks: stacks,
            last_hand: None,
            hands_to_play: setup.hands_to_play,
            hands_played: 0,
            current_coins: Chips::ZERO,
            initial_stack,
            max_rebuys: setup.max_rebuys,
            rebuys_used: [0, 0],
            results: [0, 0],
            simulation_running: false,
            game_clock: [0.0, 0.0],
        }
    }

    /// Место участника в текущей раздаче.
    pub fn seat_of(&self, participant: Participant) -> usize {
        if participant == self.button_owner {
            0
        } else {
            1
        }
    }

    /// Участник на месте раздачи.
    pub fn participant_at(&self, seat: usize) -> Participant {
        if seat == 0 {
            self.button_owner
        } else {
            1 - self.button_owner
        }
    }

    pub fn is_human(&self, participant: Participant) -> bool {
        self.play_mode == PlayMode::Human && participant == 0
    }

    /// Сыграно нужное количество раздач (0 - без ограничения).
    pub fn is_game_complete(&self) -> bool {
        self.hands_to_play > 0 && self.hands_played >= self.hands_to_play
    }

    pub fn bankroll(&self, participant: Participant) -> i64 {
        self.results[participant]
    }

    /// Идёт ли раздача (в банке есть фишки).
    pub fn hand_in_progress(&self) -> bool {
        !self.pot.is_zero()
    }

    /// Все фишки за столом: стеки + банк.
    pub fn chips_in_play(&self) -> Chips {
        self.stacks[0] + self.stacks[1] + self.pot
    }
}
