//! Точка входа для внешнего приложения: команды и запросы по id сессии.
//!
//! Сервис не держит сессии в памяти. Каждая операция читает запись из
//! хранилища, поднимает `SessionManager`, делает шаг и пишет запись обратно.
//! В памяти живут только боты сессий (`LiveBots`): бот поднимается один раз
//! на сессию и закрывается на выходе.

use std::sync::Arc;

use crate::api::commands::{Command, CommandResponse};
use crate::api::dto::{GameView, SimulationStatusDto};
use crate::api::errors::ApiError;
use crate::api::queries::{Query, QueryResponse};
use crate::bots::{BotLoader, LiveBots};
use crate::config::EngineConfig;
use crate::domain::chips::Chips;
use crate::domain::SessionId;
use crate::engine::Action;
use crate::infra::IdGenerator;
use crate::session::{
    CoinLedger, GameSession, HandStart, InMemoryCoinLedger, InMemorySessionStore, PlayMode, SessionError,
    SessionManager, SessionSetup, SessionStore,
};
use crate::simulation::{SimulationRegistry, SimulationRunner};

pub struct SessionService {
    store: Arc<dyn SessionStore>,
    coins: Arc<dyn CoinLedger>,
    loader: BotLoader,
    config: EngineConfig,
    ids: IdGenerator,
    bots: LiveBots,
    simulations: SimulationRegistry,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>, coins: Arc<dyn CoinLedger>, config: EngineConfig) -> Self {
        Self {
            store,
            coins,
            loader: BotLoader::new(config.sandbox.clone()),
            config,
            ids: IdGenerator::new(),
            bots: LiveBots::new(),
            simulations: SimulationRegistry::new(),
        }
    }

    /// Сервис поверх in-memory хранилища и кошелька.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryCoinLedger::new()),
            config,
        )
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn coins(&self) -> &Arc<dyn CoinLedger> {
        &self.coins
    }

    pub fn live_bots(&self) -> &LiveBots {
        &self.bots
    }

    // ---------------------------------------------------------------------
    // Команды
    // ---------------------------------------------------------------------

    pub fn create_session(&self, setup: SessionSetup) -> Result<GameView, ApiError> {
        if setup.play_mode == PlayMode::Bot && setup.hands_to_play == 0 {
            return Err(ApiError::BadRequest(
                "для бот-бот сессии нужно число раздач".to_string(),
            ));
        }
        let id = self.ids.next_session_id();
        let session = GameSession::new(
            id,
            setup,
            self.config.rules.starting_stack,
            self.config.logs.player_log_limit,
        );
        self.store.save(&session);
        log::info!("создана сессия {id} ({:?})", session.play_mode);
        Ok(self.viewer(session).view())
    }

    pub fn start_hand(&self, id: SessionId, continue_session: bool) -> Result<HandStart, ApiError> {
        self.with_manager(id, |manager| manager.start_new_hand(continue_session))
    }

    pub fn buy_in(&self, id: SessionId) -> Result<Chips, ApiError> {
        let coins = Arc::clone(&self.coins);
        self.with_manager(id, |manager| manager.buy_in(coins.as_ref()))
    }

    pub fn submit_action(&self, id: SessionId, action: Action) -> Result<GameView, ApiError> {
        self.with_manager(id, |manager| manager.process_step(Some(action)))
    }

    /// Выйти из сессии: остановить симуляцию, если она идёт, и вернуть стек.
    pub async fn exit(&self, id: SessionId) -> Result<Chips, ApiError> {
        if self.simulations.stop(id).await {
            self.simulations.join(id).await;
        } else {
            self.store.set_simulation_running(id, false);
        }
        let coins = Arc::clone(&self.coins);
        let returned = self.with_manager(id, |manager| manager.exit_session(coins.as_ref()));
        self.bots.close(id);
        returned
    }

    pub async fn start_simulation(&self, id: SessionId) -> Result<SimulationStatusDto, ApiError> {
        let session = self.load(id)?;
        if session.play_mode != PlayMode::Bot {
            return Err(ApiError::InvalidCommand(
                "симуляция доступна только в режиме бот-бот".to_string(),
            ));
        }
        if session.is_game_complete() {
            return Err(SessionError::GameComplete.into());
        }

        let started = self
            .simulations
            .start_with(id, || {
                let mut manager = self.manager_for(session);
                manager.session_mut().simulation_running = true;
                self.store.save(manager.session());
                let loader = self.loader.clone();
                let config = self.config.clone();
                Ok(SimulationRunner::new(
                    manager,
                    Arc::clone(&self.store),
                    self.config.simulation.clone(),
                )
                .with_rebuild(Box::new(move |session| {
                    SessionManager::new(session, &loader, &config)
                })))
            })
            .await?;
        if !started {
            log::debug!("сессия {id}: повторный запуск симуляции проигнорирован");
        }
        self.simulation_status(id).await
    }

    pub async fn stop_simulation(&self, id: SessionId) -> Result<SimulationStatusDto, ApiError> {
        if !self.simulations.stop(id).await {
            // раннера нет, но флаг мог остаться после падения процесса
            self.store.set_simulation_running(id, false);
        }
        self.simulation_status(id).await
    }

    /// Прогресс симуляции: из канала раннера, иначе по флагу в записи.
    pub async fn simulation_status(&self, id: SessionId) -> Result<SimulationStatusDto, ApiError> {
        let session = self.load(id)?;
        let status = match self.simulations.status(id).await {
            Some(progress) => SimulationStatusDto {
                running: progress.running,
                hands_played: progress.hands_played,
                hands_to_play: session.hands_to_play,
                last_error: progress.last_error,
            },
            None => SimulationStatusDto {
                running: session.simulation_running,
                hands_played: session.hands_played,
                hands_to_play: session.hands_to_play,
                last_error: None,
            },
        };
        Ok(status)
    }

    /// Дождаться окончания симуляции (CLI и тесты).
    pub async fn wait_simulation(&self, id: SessionId) -> Result<SimulationStatusDto, ApiError> {
        self.simulations.join(id).await;
        self.simulation_status(id).await
    }

    // ---------------------------------------------------------------------
    // Запросы
    // ---------------------------------------------------------------------

    pub fn view(&self, id: SessionId) -> Result<GameView, ApiError> {
        Ok(self.viewer(self.load(id)?).view())
    }

    pub fn transcript(&self, id: SessionId) -> Result<String, ApiError> {
        Ok(self.load(id)?.logs.transcript_text())
    }

    pub fn player_log(&self, id: SessionId, participant: usize) -> Result<String, ApiError> {
        let session = self.load(id)?;
        let feed = session
            .logs
            .feeds
            .get(participant)
            .ok_or_else(|| ApiError::BadRequest(format!("нет участника {participant}")))?;
        Ok(feed.log.clone())
    }

    // ---------------------------------------------------------------------
    // Диспетчеризация
    // ---------------------------------------------------------------------

    pub async fn execute(&self, command: Command) -> Result<CommandResponse, ApiError> {
        match command {
            Command::CreateSession(setup) => self.create_session(setup).map(CommandResponse::Session),
            Command::StartHand {
                session_id,
                continue_session,
            } => match self.start_hand(session_id, continue_session)? {
                HandStart::Started(view) => Ok(CommandResponse::Session(view)),
                HandStart::BuyInRequired => Ok(CommandResponse::BuyInRequired { session_id }),
            },
            Command::BuyIn { session_id } => {
                let amount = self.buy_in(session_id)?;
                Ok(CommandResponse::ChipsMoved { session_id, amount })
            }
            Command::SubmitAction { session_id, action } => {
                self.submit_action(session_id, action).map(CommandResponse::Session)
            }
            Command::StartSimulation { session_id } => {
                self.start_simulation(session_id).await.map(CommandResponse::Simulation)
            }
            Command::StopSimulation { session_id } => {
                self.stop_simulation(session_id).await.map(CommandResponse::Simulation)
            }
            Command::Exit { session_id } => {
                let amount = self.exit(session_id).await?;
                Ok(CommandResponse::ChipsMoved { session_id, amount })
            }
        }
    }

    pub async fn query(&self, query: Query) -> Result<QueryResponse, ApiError> {
        match query {
            Query::GetView { session_id } => self.view(session_id).map(QueryResponse::View),
            Query::SimulationStatus { session_id } => {
                self.simulation_status(session_id).await.map(QueryResponse::Simulation)
            }
            Query::Transcript { session_id } => {
                self.transcript(session_id).map(|text| QueryResponse::Text { text })
            }
            Query::PlayerLog {
                session_id,
                participant,
            } => self
                .player_log(session_id, participant)
                .map(|text| QueryResponse::Text { text }),
        }
    }

    // ---------------------------------------------------------------------
    // Внутреннее
    // ---------------------------------------------------------------------

    fn load(&self, id: SessionId) -> Result<GameSession, ApiError> {
        self.store
            .load(id)
            .ok_or(ApiError::SessionNotFound(id))
    }

    /// Менеджер без ботов: только для построения представления.
    fn viewer(&self, session: GameSession) -> SessionManager {
        SessionManager::with_providers(session, [None, None], &self.config)
    }

    /// Менеджер на живых ботах сессии; при первом обращении боты поднимаются.
    fn manager_for(&self, session: GameSession) -> SessionManager {
        let bots = match self.bots.take(session.id) {
            Some(bots) => bots,
            None => SessionManager::load_bots(&session, &self.loader),
        };
        SessionManager::with_bots(session, bots, &self.config)
    }

    /// Прочитать-изменить-записать одну сессию.
    fn with_manager<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut SessionManager) -> Result<T, SessionError>,
    ) -> Result<T, ApiError> {
        let session = self.load(id)?;
        if session.simulation_running {
            return Err(ApiError::InvalidCommand(format!(
                "сессия {id}: идёт симуляция"
            )));
        }
        let mut manager = self.manager_for(session);
        let result = f(&mut manager);
        let (session, bots) = manager.into_parts();
        self.store.save(&session);
        self.bots.put(id, bots);
        Ok(result?)
    }
}
