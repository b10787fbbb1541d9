//! Фоновые симуляции и сервис сессий.

use std::sync::Arc;
use std::time::Duration;

use poker_arena::api::{ApiError, Command, CommandResponse, Query, QueryResponse, SessionService};
use poker_arena::bots::{BotSource, DecisionProvider, SimpleBot};
use poker_arena::config::{EngineConfig, SimulationConfig};
use poker_arena::domain::card::Card;
use poker_arena::domain::chips::Chips;
use poker_arena::engine::Action;
use poker_arena::eval::{HandEvaluator, HandRank};
use poker_arena::infra::SessionRng;
use poker_arena::session::{
    CoinLedger, GameSession, InMemorySessionStore, SessionManager, SessionSetup, SessionStore,
};
use poker_arena::simulation::SimulationRunner;

const PLAYER: u64 = 42;

fn service(step_delay: Duration) -> SessionService {
    let mut config = EngineConfig::default();
    config.simulation.step_delay = step_delay;
    SessionService::in_memory(config)
}

fn bot_setup(hands: u32) -> SessionSetup {
    SessionSetup::bot_vs_bot(PLAYER, BotSource::Simple, BotSource::Simple, hands)
}

fn simple_bots() -> [Option<Box<dyn DecisionProvider>>; 2] {
    [
        Some(Box::new(SimpleBot::new("PlayerBot"))),
        Some(Box::new(SimpleBot::new("OpponentBot"))),
    ]
}

fn runner_session(id: u64, hands: u32) -> GameSession {
    let config = EngineConfig::default();
    GameSession::new(id, bot_setup(hands), config.rules.starting_stack, config.logs.player_log_limit)
}

fn no_delay() -> SimulationConfig {
    SimulationConfig {
        step_delay: Duration::ZERO,
    }
}

/// Падает на любом шоудауне.
struct BrokenEvaluator;

impl HandEvaluator for BrokenEvaluator {
    fn evaluate(&self, _cards: &[Card]) -> HandRank {
        panic!("оценщик сломан")
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_step_counts_the_hand_and_keeps_running() {
    let config = EngineConfig::default();
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let [player, _] = simple_bots();
    // у соперника нет бота: его первый ход в каждой раздаче - ошибка шага
    let manager = SessionManager::with_providers(runner_session(5, 3), [player, None], &config)
        .with_rng(SessionRng::seeded(4));

    let progress = SimulationRunner::new(manager, Arc::clone(&store), no_delay())
        .spawn()
        .join()
        .await;
    assert!(!progress.running);
    assert_eq!(progress.hands_played, 3);
    let error = progress.last_error.expect("last error");
    assert!(error.contains("Нет бота"), "{error}");

    let stored = store.load(5).expect("stored");
    assert_eq!(stored.hands_played, 3);
    assert!(!stored.simulation_running);
    assert_eq!(stored.results, [0, 0]);
    assert_eq!(stored.stacks[0] + stored.stacks[1] + stored.pot, Chips(400));
}

#[tokio::test(flavor = "multi_thread")]
async fn panicked_step_is_rebuilt_from_store() {
    let config = EngineConfig::default();
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let manager = SessionManager::with_providers(runner_session(6, 4), simple_bots(), &config)
        .with_evaluator(Box::new(BrokenEvaluator))
        .with_rng(SessionRng::seeded(8));

    let rebuild_config = config.clone();
    let progress = SimulationRunner::new(manager, Arc::clone(&store), no_delay())
        .with_rebuild(Box::new(move |session| {
            SessionManager::with_providers(session, simple_bots(), &rebuild_config)
        }))
        .spawn()
        .join()
        .await;
    assert!(!progress.running);
    assert_eq!(progress.hands_played, 4);
    assert!(progress.last_error.is_some_and(|e| e.contains("упал")));

    let stored = store.load(6).expect("stored");
    assert_eq!(stored.hands_played, 4);
    assert!(!stored.simulation_running);
    assert_eq!(stored.results[0] + stored.results[1], 0);
    assert_eq!(stored.stacks[0] + stored.stacks[1], Chips(400));
}

#[tokio::test(flavor = "multi_thread")]
async fn runner_completes_requested_hands() {
    let service = service(Duration::from_millis(1));
    let id = service.create_session(bot_setup(15)).expect("create").session_id;

    let status = service.start_simulation(id).await.expect("start");
    assert_eq!(status.hands_to_play, 15);

    let status = service.wait_simulation(id).await.expect("wait");
    assert!(!status.running);
    assert_eq!(status.hands_played, 15);
    assert_eq!(status.last_error, None);

    let view = service.view(id).expect("view");
    assert!(view.game_complete);
    assert!(!view.simulation_running);
    assert_eq!(view.stacks[0] + view.stacks[1], Chips(400));

    let stored = service.store().load(id).expect("stored");
    assert!(!stored.simulation_running);
    assert_eq!(stored.hands_played, 15);
    assert_eq!(stored.results[0] + stored.results[1], 0);

    assert!(matches!(
        service.start_simulation(id).await,
        Err(ApiError::InvalidCommand(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn one_runner_per_session_and_stop_is_cooperative() {
    let service = service(Duration::from_millis(20));
    let id = service.create_session(bot_setup(10_000)).expect("create").session_id;

    assert!(service.start_simulation(id).await.expect("start").running);
    assert!(service.start_simulation(id).await.expect("restart").running);

    // пока идёт симуляция, сессию нельзя трогать вручную
    assert!(matches!(
        service.start_hand(id, true),
        Err(ApiError::InvalidCommand(_))
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let stopped = service.stop_simulation(id).await.expect("stop");
    assert_eq!(stopped.hands_to_play, 10_000);

    let status = service.wait_simulation(id).await.expect("wait");
    assert!(!status.running);
    assert!(status.hands_played < 10_000);

    let stored = service.store().load(id).expect("stored");
    assert!(!stored.simulation_running);
    assert_eq!(stored.hands_played, status.hands_played);
}

#[tokio::test(flavor = "multi_thread")]
async fn exit_stops_simulation() {
    let service = service(Duration::from_millis(10));
    let id = service.create_session(bot_setup(10_000)).expect("create").session_id;
    service.start_simulation(id).await.expect("start");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let returned = service.exit(id).await.expect("exit");
    assert_eq!(returned, Chips::ZERO);
    let status = service.simulation_status(id).await.expect("status");
    assert!(!status.running);
    let transcript = service.transcript(id).expect("transcript");
    assert!(transcript.lines().last().is_some_and(|line| line.starts_with("Final")));
}

#[tokio::test]
async fn human_session_through_commands() {
    let service = service(Duration::ZERO);
    service.coins().deposit(PLAYER, Chips(1_000));

    let setup = SessionSetup::human_vs_bot(PLAYER, BotSource::Simple);
    let id = match service.execute(Command::CreateSession(setup)).await.expect("create") {
        CommandResponse::Session(view) => view.session_id,
        other => panic!("unexpected response: {other:?}"),
    };

    assert!(matches!(
        service.start_simulation(id).await,
        Err(ApiError::InvalidCommand(_))
    ));

    let response = service
        .execute(Command::StartHand {
            session_id: id,
            continue_session: false,
        })
        .await
        .expect("start");
    assert_eq!(response, CommandResponse::BuyInRequired { session_id: id });

    let response = service.execute(Command::BuyIn { session_id: id }).await.expect("buy in");
    assert_eq!(
        response,
        CommandResponse::ChipsMoved {
            session_id: id,
            amount: Chips(200),
        }
    );
    assert_eq!(service.coins().balance(PLAYER), Chips(800));

    let view = match service
        .execute(Command::StartHand {
            session_id: id,
            continue_session: false,
        })
        .await
        .expect("start")
    {
        CommandResponse::Session(view) => view,
        other => panic!("unexpected response: {other:?}"),
    };
    assert!(view.is_player_turn);

    let err = service
        .execute(Command::SubmitAction {
            session_id: id,
            action: Action::Check,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::IllegalAction(_)));

    let response = service
        .execute(Command::SubmitAction {
            session_id: id,
            action: Action::Fold,
        })
        .await
        .expect("fold");
    match response {
        CommandResponse::Session(view) => {
            assert!(view.hand_complete);
            assert_eq!(view.last_deltas, Some([-1, 1]));
        }
        other => panic!("unexpected response: {other:?}"),
    }

    match service.query(Query::PlayerLog { session_id: id, participant: 0 }).await.expect("log") {
        QueryResponse::Text { text } => assert!(text.starts_with("T1. P0 H")),
        other => panic!("unexpected response: {other:?}"),
    }

    let response = service.execute(Command::Exit { session_id: id }).await.expect("exit");
    assert_eq!(
        response,
        CommandResponse::ChipsMoved {
            session_id: id,
            amount: Chips(199),
        }
    );
    assert_eq!(service.coins().balance(PLAYER), Chips(999));
}

#[tokio::test]
async fn unknown_session_is_reported() {
    let service = service(Duration::ZERO);
    assert_eq!(service.view(999).unwrap_err(), ApiError::SessionNotFound(999));
    assert_eq!(
        service.simulation_status(999).await.unwrap_err(),
        ApiError::SessionNotFound(999)
    );
}

#[test]
fn commands_parse_from_json() {
    let command: Command =
        serde_json::from_str(r#"{"command":"submit_action","session_id":3,"action":{"action":"raise","amount":12}}"#)
            .expect("parse");
    match command {
        Command::SubmitAction { session_id, action } => {
            assert_eq!(session_id, 3);
            assert_eq!(action, Action::raise(12));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}
