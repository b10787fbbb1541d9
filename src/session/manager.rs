//! Менеджер одной игровой сессии: раздача за раздачей поверх `RoundState`.
//!
//! Между вызовами состояние раздачи живёт только в `GameSession` в
//! сериализованном виде; менеджер восстанавливает его на каждом шаге.

use std::time::Instant;

use thiserror::Error;

use crate::api::dto::GameView;
use crate::bots::{BotLoader, BotSet, BotSource, DecisionProvider, GameContext, GuardedProvider};
use crate::config::{EngineConfig, GameRules, LogConfig};
use crate::domain::chips::Chips;
use crate::domain::deck::Deck;
use crate::domain::SessionId;
use crate::engine::codec::{self, StoredState};
use crate::engine::hand_history::{HandEventKind, Participant};
use crate::engine::{
    Action, ActionKind, EngineError, HandState, LegalActions, Outcome, RoundState, TerminalState,
};
use crate::eval::{HandEvaluator, StandardEvaluator};
use crate::infra::SessionRng;
use crate::session::coins::{CoinError, CoinLedger};
use crate::session::model::{GameSession, HandSummary, PlayMode};

/// Ошибки уровня сессии.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Сессия {0} не найдена")]
    NotFound(SessionId),

    #[error("Нужен бай-ин")]
    BuyInRequired,

    #[error("Бай-ин не нужен: у игрока уже есть фишки")]
    AlreadyBoughtIn,

    #[error("Участник {participant} без фишек и без ребаев")]
    Busted { participant: Participant },

    #[error("Сейчас не ход игрока")]
    NotPlayersTurn,

    #[error("Нужно действие игрока")]
    ActionRequired,

    #[error("Действие игрока недопустимо в режиме ботов")]
    UnexpectedAction,

    #[error("Операция доступна только в режиме человек-бот")]
    NotHumanMode,

    #[error("Недопустимое действие: {0}")]
    IllegalAction(EngineError),

    #[error("Раздача не начата")]
    NoActiveHand,

    #[error("Все раздачи сессии сыграны")]
    GameComplete,

    #[error("Нет бота для участника {0}")]
    NoProvider(Participant),

    #[error(transparent)]
    Coins(#[from] CoinError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Не удалось сохранить логи: {0}")]
    Logs(#[from] std::io::Error),
}

/// Результат `start_new_hand`.
#[derive(Clone, Debug, PartialEq)]
pub enum HandStart {
    Started(GameView),
    /// Человеку нужно сначала купить фишки.
    BuyInRequired,
}

/// Менеджер сессии: владеет записью, ботами, RNG и оценщиком рук.
pub struct SessionManager {
    session: GameSession,
    providers: BotSet,
    rules: GameRules,
    logs: LogConfig,
    evaluator: Box<dyn HandEvaluator>,
    rng: SessionRng,
}

impl SessionManager {
    /// Поднять менеджер и загрузить ботов сессии.
    pub fn new(session: GameSession, loader: &BotLoader, config: &EngineConfig) -> Self {
        let bots = Self::load_bots(&session, loader);
        Self::with_bots(session, bots, config)
    }

    /// Разрешить источники ботов сессии в живых ботов.
    pub fn load_bots(session: &GameSession, loader: &BotLoader) -> BotSet {
        let player = match session.play_mode {
            PlayMode::Human => None,
            PlayMode::Bot => {
                let source = session.player_bot.clone().unwrap_or(BotSource::Simple);
                Some(GuardedProvider::new(loader.load(&source, &session.names[0], 0)))
            }
        };
        let opponent = loader.load(&session.opponent_bot, &session.names[1], 1);
        [player, Some(GuardedProvider::new(opponent))]
    }

    /// Менеджер с готовыми ботами (тесты, встроенные стратегии).
    pub fn with_providers(
        session: GameSession,
        providers: [Option<Box<dyn DecisionProvider>>; 2],
        config: &EngineConfig,
    ) -> Self {
        let [p0, p1] = providers;
        Self::with_bots(session, [p0.map(GuardedProvider::new), p1.map(GuardedProvider::new)], config)
    }

    /// Менеджер поверх уже поднятых ботов (например, из `LiveBots`).
    pub fn with_bots(session: GameSession, bots: BotSet, config: &EngineConfig) -> Self {
        Self {
            session,
            providers: bots,
            rules: config.rules.clone(),
            logs: config.logs.clone(),
            evaluator: Box::new(StandardEvaluator),
            rng: SessionRng::system(),
        }
    }

    pub fn with_rng(mut self, rng: SessionRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn HandEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GameSession {
        &mut self.session
    }

    pub fn into_session(self) -> GameSession {
        self.session
    }

    /// Разобрать менеджер: запись сессии и боты, которые можно переиспользовать.
    pub fn into_parts(self) -> (GameSession, BotSet) {
        (self.session, self.providers)
    }

    // ---------------------------------------------------------------------
    // Раздача
    // ---------------------------------------------------------------------

    /// Начать новую раздачу.
    ///
    /// Недоигранная раздача человека засчитывается его фолдом. В режиме
    /// ботов (перезапуск после сбоя) раздача аннулируется, как и раздача с
    /// повреждённым состоянием: фишки из банка возвращаются участникам.
    pub fn start_new_hand(&mut self, continue_session: bool) -> Result<HandStart, SessionError> {
        if self.session.is_game_complete() {
            return Err(SessionError::GameComplete);
        }
        if self.session.hand_in_progress() {
            match self.session.play_mode {
                PlayMode::Human => self.forfeit_current_hand(0)?,
                PlayMode::Bot => self.void_current_hand(),
            }
            if self.session.is_game_complete() {
                return Err(SessionError::GameComplete);
            }
        }
        if self.session.play_mode == PlayMode::Human
            && (self.session.current_coins.is_zero() || self.session.stacks[0] < self.rules.big_blind)
        {
            return Ok(HandStart::BuyInRequired);
        }
        self.rebuy_if_needed()?;

        if continue_session && self.session.game_state.is_some() {
            self.session.button_owner = 1 - self.session.button_owner;
        }

        let owner = self.session.button_owner;
        let stacks = self.session.stacks;
        let seat_stacks = [stacks[owner], stacks[1 - owner]];
        let deck = Deck::shuffled(&mut self.rng);
        let state = RoundState::new_hand(&self.rules, seat_stacks, deck)?;

        let session = &mut self.session;
        session.hand_start_stacks = stacks;
        session.ledger.reset();
        session.last_hand = None;

        let hand_number = session.hands_played + 1;
        session.logs.record(HandEventKind::HandStarted {
            hand_number,
            bankrolls: stacks,
        });
        for seat in 0..2 {
            session.logs.record(HandEventKind::BlindPosted {
                participant: session.participant_at(seat),
                amount: state.pips[seat],
            });
        }
        for seat in 0..2 {
            session.logs.record(HandEventKind::HoleCardsDealt {
                participant: session.participant_at(seat),
                seat,
                cards: state.hands[seat],
            });
        }

        self.sync_round(&state);
        self.session.game_state = Some(codec::serialize_round(&state)?);
        log::debug!(
            "сессия {}: раздача #{hand_number}, кнопка у участника {owner}",
            self.session.id
        );

        for participant in 0..2 {
            let ctx = self.context(participant);
            let seat = self.session.seat_of(participant);
            if let Some(provider) = self.providers[participant].as_mut() {
                provider.notify_hand_started(&ctx, &state, seat);
            }
        }

        let current = if self.session.play_mode == PlayMode::Human {
            self.run_bots_until_human(HandState::Ongoing(state))?
        } else {
            HandState::Ongoing(state)
        };
        Ok(HandStart::Started(self.view_of(&current)))
    }

    /// Один шаг игры.
    ///
    /// Режим ботов: ходит активный участник, затем (если раздача не
    /// кончилась) отвечает второй. Человеческий режим: применяется действие
    /// человека, затем бот ходит, пока снова не очередь человека.
    pub fn process_step(&mut self, human_action: Option<Action>) -> Result<GameView, SessionError> {
        let raw = self
            .session
            .game_state
            .clone()
            .ok_or(SessionError::NoActiveHand)?;

        let round = match codec::deserialize(&raw) {
            Ok(StoredState::Ongoing(round)) => round,
            Ok(StoredState::Terminal { .. }) => {
                if human_action.is_some() {
                    return Err(SessionError::NoActiveHand);
                }
                return Ok(self.view());
            }
            Err(e) => {
                log::warn!(
                    "сессия {}: состояние повреждено ({e}), начинаем новую раздачу",
                    self.session.id
                );
                self.session.game_state = None;
                return match self.start_new_hand(true)? {
                    HandStart::Started(view) => Ok(view),
                    HandStart::BuyInRequired => Err(SessionError::BuyInRequired),
                };
            }
        };

        let current = match self.session.play_mode {
            PlayMode::Bot => {
                if human_action.is_some() {
                    return Err(SessionError::UnexpectedAction);
                }
                match self.bot_act(&round)? {
                    HandState::Ongoing(next) => self.bot_act(&next)?,
                    terminal => terminal,
                }
            }
            PlayMode::Human => {
                let human_seat = self.session.seat_of(0);
                if round.active() != human_seat {
                    if human_action.is_some() {
                        return Err(SessionError::NotPlayersTurn);
                    }
                    self.run_bots_until_human(HandState::Ongoing(round))?
                } else {
                    let action = human_action.ok_or(SessionError::ActionRequired)?;
                    round.validate(&action).map_err(SessionError::IllegalAction)?;
                    let next = self.apply(&round, action)?;
                    self.run_bots_until_human(next)?
                }
            }
        };
        Ok(self.view_of(&current))
    }

    /// Текущая раздача завершена (или ещё не начиналась).
    pub fn hand_complete(&self) -> bool {
        !matches!(
            self.session.game_state.as_deref().map(codec::deserialize),
            Some(Ok(StoredState::Ongoing(_)))
        )
    }

    // ---------------------------------------------------------------------
    // Монеты
    // ---------------------------------------------------------------------

    /// Купить фишки за монеты (человеческий режим).
    pub fn buy_in(&mut self, coins: &dyn CoinLedger) -> Result<Chips, SessionError> {
        if self.session.play_mode != PlayMode::Human {
            return Err(SessionError::NotHumanMode);
        }
        if self.session.stacks[0] >= self.rules.big_blind {
            return Err(SessionError::AlreadyBoughtIn);
        }
        let amount = self.session.initial_stack;
        coins.withdraw(self.session.player_id, amount)?;
        self.session.stacks[0] += amount;
        self.session.current_coins += amount;
        log::info!(
            "сессия {}: игрок {} купил {amount} фишек",
            self.session.id,
            self.session.player_id
        );
        Ok(amount)
    }

    /// Выйти из сессии: недоигранная раздача считается фолдом игрока,
    /// его стек возвращается в кошелёк, логи закрываются.
    pub fn exit_session(&mut self, coins: &dyn CoinLedger) -> Result<Chips, SessionError> {
        if self.session.hand_in_progress() {
            self.forfeit_current_hand(0)?;
        }

        let returned = match self.session.play_mode {
            PlayMode::Human => {
                let amount = self.session.stacks[0];
                if !amount.is_zero() {
                    coins.deposit(self.session.player_id, amount);
                }
                self.session.stacks[0] = Chips::ZERO;
                self.session.current_coins = Chips::ZERO;
                amount
            }
            PlayMode::Bot => Chips::ZERO,
        };

        let stacks = self.session.stacks;
        self.session.logs.finish(stacks);
        self.save_logs()?;
        log::info!("сессия {}: выход, возвращено {returned}", self.session.id);
        Ok(returned)
    }

    /// Записать логи в `log_dir/<session_id>/`, если каталог задан.
    pub fn save_logs(&self) -> Result<(), SessionError> {
        if let Some(dir) = &self.logs.log_dir {
            let dir = dir.join(self.session.id.to_string());
            self.session.logs.save_to_dir(&dir)?;
            log::info!("логи сессии сохранены в {}", dir.display());
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Внутреннее
    // ---------------------------------------------------------------------

    fn participant_at(&self, seat: usize) -> Participant {
        self.session.participant_at(seat)
    }

    /// Переложить массив по местам раздачи в массив по участникам.
    fn by_participant<T: Copy>(&self, by_seat: [T; 2]) -> [T; 2] {
        [by_seat[self.session.seat_of(0)], by_seat[self.session.seat_of(1)]]
    }

    fn context(&self, participant: Participant) -> GameContext {
        GameContext {
            hand_number: self.session.logs.hand_number,
            bankroll: self.session.bankroll(participant),
            game_clock: self.session.game_clock[participant],
            messages: self.session.logs.hand_messages(participant).to_vec(),
        }
    }

    /// Ход бота активного участника.
    fn bot_act(&mut self, round: &RoundState) -> Result<HandState, SessionError> {
        let seat = round.active();
        let participant = self.participant_at(seat);
        let ctx = self.context(participant);
        let provider = self.providers[participant]
            .as_mut()
            .ok_or(SessionError::NoProvider(participant))?;

        let started = Instant::now();
        let decision = provider.decide(&ctx, round, seat);
        self.session.game_clock[participant] += started.elapsed().as_secs_f64();

        if let Some(message) = decision.warning {
            self.session.logs.record(HandEventKind::BotWarning {
                participant,
                message,
            });
        }
        self.apply(round, decision.action)
    }

    fn run_bots_until_human(&mut self, mut current: HandState) -> Result<HandState, SessionError> {
        loop {
            let round = match &current {
                HandState::Ongoing(round) => round.clone(),
                HandState::Terminal(_) => return Ok(current),
            };
            if self.session.is_human(self.participant_at(round.active())) {
                return Ok(current);
            }
            current = self.bot_act(&round)?;
        }
    }

    /// Применить легальное действие: банк, логи, стеки, сериализация.
    fn apply(&mut self, round: &RoundState, action: Action) -> Result<HandState, SessionError> {
        let participant = self.participant_at(round.active());
        let opening_bet = matches!(action, Action::Raise { .. }) && round.pips.iter().all(|p| p.is_zero());
        let transition = round.advance_with(action, self.evaluator.as_ref())?;

        self.session.ledger.commit_locked(transition.locked);
        self.session.logs.record(HandEventKind::PlayerActed {
            participant,
            action,
            opening_bet,
        });

        match &transition.state {
            HandState::Ongoing(next) => {
                if next.street != round.street {
                    let committed = self.by_participant(next.committed());
                    self.session.logs.record(HandEventKind::StreetDealt {
                        street: next.street_kind(),
                        board: next.board().to_vec(),
                        committed,
                    });
                }
                self.sync_round(next);
            }
            HandState::Terminal(terminal) => self.settle(terminal),
        }

        self.session.game_state = Some(codec::serialize(&transition.state)?);
        Ok(transition.state)
    }

    /// Стеки участников и живой банк по текущему узлу раздачи.
    fn sync_round(&mut self, round: &RoundState) {
        for seat in 0..2 {
            let participant = self.participant_at(seat);
            self.session.stacks[participant] = round.stacks[seat];
        }
        self.session.pot = self.session.ledger.total() + round.pips[0] + round.pips[1];
    }

    /// Разыграть банк по итогу раздачи.
    fn settle(&mut self, terminal: &TerminalState) {
        let previous = &terminal.previous;
        let payouts = self.session.ledger.settle(terminal.outcome);
        let showdown = terminal.outcome.is_showdown();

        let mut deltas = [0i64; 2];
        for seat in 0..2 {
            let participant = self.participant_at(seat);
            let final_stack = previous.stacks[seat] + payouts[seat];
            deltas[participant] = final_stack.signed_diff(self.session.hand_start_stacks[participant]);
            if deltas[participant] != terminal.deltas[seat] {
                log::warn!(
                    "сессия {}: дельта участника {participant} по банку {} расходится с раздачей {}",
                    self.session.id,
                    deltas[participant],
                    terminal.deltas[seat]
                );
            }
            self.session.stacks[participant] = final_stack;
        }
        let hands = self.by_participant(previous.hands);

        if showdown {
            for participant in 0..2 {
                self.session.logs.record(HandEventKind::ShowdownReveal {
                    participant,
                    cards: hands[participant],
                });
            }
        }
        for (participant, delta) in deltas.iter().enumerate() {
            self.session.logs.record(HandEventKind::PotAwarded {
                participant,
                delta: *delta,
            });
            self.session.results[participant] += delta;
        }

        self.session.pot = Chips::ZERO;
        self.session.ledger.reset();
        self.session.hands_played += 1;
        self.session.last_hand = Some(HandSummary {
            hand_number: self.session.logs.hand_number,
            hands,
            board: previous.board().to_vec(),
            deltas,
            showdown,
        });

        for participant in 0..2 {
            let ctx = self.context(participant);
            let seat = self.session.seat_of(participant);
            if let Some(provider) = self.providers[participant].as_mut() {
                provider.notify_hand_ended(&ctx, terminal.deltas, seat);
            }
        }
    }

    /// Доиграть раздачу принудительным фолдом участника.
    fn forfeit_current_hand(&mut self, participant: Participant) -> Result<(), SessionError> {
        let raw = match self.session.game_state.clone() {
            Some(raw) => raw,
            None => {
                self.void_current_hand();
                return Ok(());
            }
        };
        match codec::deserialize(&raw) {
            Ok(StoredState::Ongoing(round)) => {
                let winner = 1 - self.session.seat_of(participant);
                let outcome = Outcome::FoldWinner { seat: winner };
                self.session.ledger.commit_locked(round.pips);
                let terminal = TerminalState::forced(round, outcome);
                self.session.logs.record(HandEventKind::PlayerActed {
                    participant,
                    action: Action::Fold,
                    opening_bet: false,
                });
                self.settle(&terminal);
                self.session.game_state = Some(codec::serialize_terminal(&terminal)?);
            }
            _ => self.void_current_hand(),
        }
        Ok(())
    }

    /// Аннулировать раздачу: вернуть стеки к началу раздачи.
    fn void_current_hand(&mut self) {
        log::warn!(
            "сессия {}: раздача аннулирована, банк {} возвращён",
            self.session.id,
            self.session.pot
        );
        self.session.stacks = self.session.hand_start_stacks;
        self.session.pot = Chips::ZERO;
        self.session.ledger.reset();
    }

    /// Ребай участникам-ботам со стеком меньше большого блайнда.
    fn rebuy_if_needed(&mut self) -> Result<(), SessionError> {
        for participant in 0..2 {
            if self.session.is_human(participant) || self.session.stacks[participant] >= self.rules.big_blind {
                continue;
            }
            if self.session.rebuys_used[participant] >= self.session.max_rebuys {
                return Err(SessionError::Busted { participant });
            }
            self.session.rebuys_used[participant] += 1;
            self.session.stacks[participant] += self.session.initial_stack;
            log::info!(
                "сессия {}: ребай участника {participant} ({}/{})",
                self.session.id,
                self.session.rebuys_used[participant],
                self.session.max_rebuys
            );
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Представление
    // ---------------------------------------------------------------------

    /// Представление по сохранённому состоянию.
    pub fn view(&self) -> GameView {
        match self.session.game_state.as_deref().map(codec::deserialize) {
            Some(Ok(StoredState::Ongoing(round))) => self.round_view(&round),
            _ => self.completed_view(),
        }
    }

    fn view_of(&self, state: &HandState) -> GameView {
        match state {
            HandState::Ongoing(round) => self.round_view(round),
            HandState::Terminal(_) => self.completed_view(),
        }
    }

    fn round_view(&self, round: &RoundState) -> GameView {
        let session = &self.session;
        let player_seat = session.seat_of(0);
        let is_player_turn = session.play_mode == PlayMode::Human && round.active() == player_seat;
        let (legal_actions, raise_bounds) = if is_player_turn {
            let legal = round.legal_actions();
            let bounds = legal
                .contains(ActionKind::Raise)
                .then(|| {
                    let (min, max) = round.raise_bounds();
                    [min, max]
                });
            (legal, bounds)
        } else {
            (LegalActions::default(), None)
        };
        let opponent_cards =
            (session.play_mode == PlayMode::Bot).then(|| round.hands[1 - player_seat].to_vec());
        let message = if is_player_turn {
            "Your turn".to_string()
        } else {
            format!("Hand #{} in progress", session.logs.hand_number)
        };

        GameView {
            session_id: session.id,
            play_mode: session.play_mode,
            pot: session.pot,
            stacks: session.stacks,
            player_cards: round.hands[player_seat].to_vec(),
            opponent_cards,
            board: round.board().to_vec(),
            street: Some(round.street_kind()),
            legal_actions,
            raise_bounds,
            is_player_turn,
            hand_complete: false,
            game_complete: session.is_game_complete(),
            hands_played: session.hands_played,
            hands_to_play: session.hands_to_play,
            last_deltas: None,
            simulation_running: session.simulation_running,
            message,
        }
    }

    fn completed_view(&self) -> GameView {
        let session = &self.session;
        let last = session.last_hand.as_ref();
        let message = match last {
            _ if session.is_game_complete() => "Game complete".to_string(),
            Some(hand) if hand.deltas[0] > 0 => format!("{} won {}", session.names[0], hand.deltas[0]),
            Some(hand) if hand.deltas[0] < 0 => format!("{} won {}", session.names[1], hand.deltas[1]),
            Some(_) => "Split pot".to_string(),
            None => "Waiting for a new hand".to_string(),
        };
        let show_opponent = session.play_mode == PlayMode::Bot || last.is_some_and(|h| h.showdown);

        GameView {
            session_id: session.id,
            play_mode: session.play_mode,
            pot: session.pot,
            stacks: session.stacks,
            player_cards: last.map(|h| h.hands[0].to_vec()).unwrap_or_default(),
            opponent_cards: last.filter(|_| show_opponent).map(|h| h.hands[1].to_vec()),
            board: last.map(|h| h.board.clone()).unwrap_or_default(),
            street: None,
            legal_actions: LegalActions::default(),
            raise_bounds: None,
            is_player_turn: false,
            hand_complete: true,
            game_complete: session.is_game_complete(),
            hands_played: session.hands_played,
            hands_to_play: session.hands_to_play,
            last_deltas: last.map(|h| h.deltas),
            simulation_running: session.simulation_running,
            message,
        }
    }
}
