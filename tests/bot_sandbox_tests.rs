//! Загрузка ботов и песочница процесса.
//!
//! Скриптовые боты пишутся на sh, поэтому тесты только для unix.
#![cfg(unix)]

use std::fs;
use std::io::{Cursor, ErrorKind, Write};
use std::path::PathBuf;
use std::time::Duration;

use poker_arena::api::SessionService;
use poker_arena::bots::sandbox::read_capped_line;
use poker_arena::bots::{
    BotError, BotLoader, BotSource, DecisionProvider, GameContext, GuardedProvider, SimpleBot,
};
use poker_arena::config::{BotLimits, EngineConfig, GameRules, SandboxConfig};
use poker_arena::domain::chips::Chips;
use poker_arena::domain::deck::Deck;
use poker_arena::engine::{Action, RoundState};
use poker_arena::infra::{DeterministicRng, SessionRng};
use poker_arena::session::{CoinLedger, GameSession, SessionManager, SessionSetup};

/// Отвечает на handshake; чекает, когда можно, иначе коллирует.
const CALLING_BOT: &str = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    *'"type":"hello"'*) echo '{"ready":true,"methods":["get_action"]}' ;;
    *'"type":"get_action"'*)
      case "$line" in
        *'"check"'*) echo '{"action":"check"}' ;;
        *) echo '{"action":"call"}' ;;
      esac ;;
  esac
done
"#;

/// Проходит handshake и молчит на get_action.
const SILENT_BOT: &str = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    *'"type":"hello"'*) echo '{"ready":true,"methods":["get_action"]}' ;;
  esac
done
"#;

/// Не объявляет get_action.
const LAZY_BOT: &str = r#"#!/bin/sh
read -r line
echo '{"ready":true,"methods":[]}'
"#;

/// Отвечает только при запуске с `--index`.
const INDEX_ONLY_BOT: &str = r#"#!/bin/sh
[ "$1" = "--index" ] || exit 3
while IFS= read -r line; do
  case "$line" in
    *'"type":"hello"'*) echo '{"ready":true,"methods":["get_action"]}' ;;
    *'"type":"get_action"'*) echo '{"action":"fold"}' ;;
  esac
done
"#;

/// На get_action присылает строку в 100 КБ.
const CHATTY_BOT: &str = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    *'"type":"hello"'*) echo '{"ready":true,"methods":["get_action"]}' ;;
    *'"type":"get_action"'*) head -c 100000 /dev/zero | tr '\0' 'x'; echo ;;
  esac
done
"#;

/// Отказывается работать, если видит переменную родителя; рейзит на
/// значение `ulimit -n`.
const INSPECTING_BOT: &str = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    *'"type":"hello"'*)
      if [ -n "$ARENA_PARENT_SECRET" ]; then
        echo '{"ready":true,"methods":[]}'
      else
        echo '{"ready":true,"methods":["get_action"]}'
      fi ;;
    *'"type":"get_action"'*) echo "{\"action\":\"raise\",\"amount\":$(ulimit -n)}" ;;
  esac
done
"#;

fn sandbox_config() -> SandboxConfig {
    SandboxConfig {
        interpreter: Some(PathBuf::from("sh")),
        entry_file: "player.sh".to_string(),
        call_timeout: Duration::from_millis(500),
        handshake_timeout: Duration::from_secs(2),
        workspace_root: None,
        limits: BotLimits::default(),
    }
}

fn inline(code: &str) -> BotSource {
    BotSource::Inline {
        code: code.to_string(),
    }
}

fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("arena-test-{label}-{}", uuid::Uuid::new_v4().simple()));
    fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

fn first_decision_point() -> RoundState {
    let mut rng = DeterministicRng::from_seed(3);
    RoundState::new_hand(&GameRules::standard(), [Chips(200); 2], Deck::shuffled(&mut rng)).expect("new hand")
}

#[test]
fn directory_bot_plays_a_session() {
    let dir = scratch_dir("dir");
    fs::write(dir.join("player.sh"), CALLING_BOT).expect("write bot");

    let loader = BotLoader::new(sandbox_config());
    let bot = loader
        .try_load(&BotSource::Directory { path: dir.clone() }, "ShellBot", 1)
        .expect("load bot");
    assert_eq!(bot.name(), "ShellBot");

    let mut config = EngineConfig::default();
    config.sandbox = sandbox_config();
    let setup = SessionSetup::bot_vs_bot(1, BotSource::Simple, BotSource::Directory { path: dir.clone() }, 2);
    let session = GameSession::new(1, setup, config.rules.starting_stack, config.logs.player_log_limit);
    let player: Box<dyn DecisionProvider> = Box::new(SimpleBot::new("PlayerBot"));
    let mut manager =
        SessionManager::with_providers(session, [Some(player), Some(bot)], &config).with_rng(SessionRng::seeded(9));

    while !manager.session().is_game_complete() {
        if manager.hand_complete() {
            manager.start_new_hand(true).expect("start hand");
        } else {
            manager.process_step(None).expect("step");
        }
    }
    assert_eq!(manager.session().hands_played, 2);
    assert!(manager.session().logs.history.warnings().next().is_none());

    drop(manager);
    fs::remove_dir_all(dir).ok();
}

#[test]
fn zip_archive_bot_is_extracted_and_answers() {
    let dir = scratch_dir("zip");
    let archive = dir.join("bot.zip");
    {
        let file = fs::File::create(&archive).expect("create zip");
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.add_directory("bot/", options).expect("dir entry");
        zip.start_file("bot/player.sh", options).expect("file entry");
        zip.write_all(CALLING_BOT.as_bytes()).expect("write entry");
        zip.finish().expect("finish zip");
    }

    let loader = BotLoader::new(sandbox_config());
    let source = BotSource::from_path(&archive);
    assert!(matches!(source, BotSource::Archive { .. }));

    let resolved = loader.resolve(&source).expect("resolve");
    assert!(resolved.entry.ends_with("bot/player.sh"));
    let workspace = resolved.workspace.as_ref().expect("workspace").path().to_path_buf();
    assert!(workspace.exists());
    drop(resolved);
    assert!(!workspace.exists(), "временный каталог должен удаляться");

    let mut bot = loader.try_load(&source, "ZipBot", 0).expect("load zip bot");
    let state = first_decision_point();
    let action = bot.get_action(&GameContext::default(), &state, 0).expect("action");
    assert_eq!(action, Action::Call);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn inline_bot_is_written_to_workspace() {
    let loader = BotLoader::new(sandbox_config());
    let source = BotSource::Inline {
        code: CALLING_BOT.to_string(),
    };
    let mut bot = loader.try_load(&source, "InlineBot", 0).expect("load inline bot");
    let state = first_decision_point();
    let after_call = state.proceed(Action::Call).expect("call");
    let round = after_call.as_round().expect("ongoing");
    assert_eq!(
        bot.get_action(&GameContext::default(), round, 1).expect("action"),
        Action::Check
    );
}

#[test]
fn broken_sources_fall_back() {
    let loader = BotLoader::new(sandbox_config());

    let empty = scratch_dir("empty");
    let missing = BotSource::Directory { path: empty.clone() };
    assert!(matches!(loader.try_load(&missing, "Missing", 0), Err(BotError::MissingEntry(_))));
    let fallback = loader.load(&missing, "Missing", 0);
    assert_eq!(fallback.name(), "Missing");

    let lazy = BotSource::Inline {
        code: LAZY_BOT.to_string(),
    };
    assert!(matches!(loader.try_load(&lazy, "Lazy", 0), Err(BotError::Load(_))));

    let bad_zip = empty.join("broken.zip");
    fs::write(&bad_zip, b"definitely not a zip").expect("write junk");
    assert!(loader.try_load(&BotSource::Archive { path: bad_zip.clone() }, "Junk", 0).is_err());

    let mut fallback = GuardedProvider::new(loader.load(&BotSource::Archive { path: bad_zip }, "Junk", 0));
    let state = first_decision_point();
    let decision = fallback.decide(&GameContext::default(), &state, 0);
    assert_eq!(decision.action, Action::Fold);
    assert!(decision.warning.is_none());

    fs::remove_dir_all(empty).ok();
}

#[test]
fn silent_bot_times_out_and_gets_default_action() {
    let loader = BotLoader::new(sandbox_config());
    let source = BotSource::Inline {
        code: SILENT_BOT.to_string(),
    };
    let bot = loader.try_load(&source, "Silent", 0).expect("load silent bot");
    let mut guarded = GuardedProvider::new(bot);

    let state = first_decision_point();
    let decision = guarded.decide(&GameContext::default(), &state, 0);
    assert_eq!(decision.action, Action::Fold);
    let warning = decision.warning.expect("warning");
    assert!(warning.starts_with("Silent strategy error:"), "{warning}");

    // процесс уже убит: следующий вызов падает сразу
    let decision = guarded.decide(&GameContext::default(), &state, 0);
    assert!(decision.warning.is_some());
}

#[test]
fn launch_falls_through_to_index_argument() {
    let loader = BotLoader::new(sandbox_config());
    let mut bot = loader
        .try_load(&inline(INDEX_ONLY_BOT), "IndexBot", 1)
        .expect("третья попытка запуска должна пройти");
    let state = first_decision_point();
    assert_eq!(
        bot.get_action(&GameContext::default(), &state, 0).expect("action"),
        Action::Fold
    );
}

#[test]
fn overlong_reply_line_stops_the_bot() {
    let mut config = sandbox_config();
    config.limits.max_line_bytes = 1024;
    config.call_timeout = Duration::from_secs(2);
    let loader = BotLoader::new(config);
    let mut bot = loader.try_load(&inline(CHATTY_BOT), "Chatty", 0).expect("load");

    let state = first_decision_point();
    match bot.get_action(&GameContext::default(), &state, 0) {
        Err(BotError::Io(e)) => assert_eq!(e.kind(), ErrorKind::InvalidData),
        other => panic!("ожидалась ошибка длины строки: {other:?}"),
    }
    assert!(bot.get_action(&GameContext::default(), &state, 0).is_err());
}

#[test]
fn capped_reader_splits_lines_and_rejects_long_ones() {
    let mut reader = Cursor::new(b"short\r\nexactly8\n0123456789\n".to_vec());
    assert_eq!(read_capped_line(&mut reader, 8).expect("line"), Some("short".to_string()));
    assert_eq!(read_capped_line(&mut reader, 8).expect("line"), Some("exactly8".to_string()));
    let err = read_capped_line(&mut reader, 8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);

    let mut tail = Cursor::new(b"last".to_vec());
    assert_eq!(read_capped_line(&mut tail, 8).expect("line"), Some("last".to_string()));
    assert_eq!(read_capped_line(&mut tail, 8).expect("eof"), None);
}

#[test]
fn bot_process_gets_clean_env_and_limits() {
    std::env::set_var("ARENA_PARENT_SECRET", "leak");
    let mut config = sandbox_config();
    config.limits.open_files = Some(32);
    let loader = BotLoader::new(config);
    let mut bot = loader
        .try_load(&inline(INSPECTING_BOT), "Inspector", 0)
        .expect("окружение родителя не должно доходить до бота");

    let state = first_decision_point();
    let action = bot.get_action(&GameContext::default(), &state, 0).expect("action");
    assert_eq!(action, Action::raise(32));
}

#[test]
fn service_reuses_one_bot_process_per_session() {
    let dir = scratch_dir("launches");
    let launches = dir.join("launches.txt");
    let code = CALLING_BOT.replace(
        "*'\"type\":\"hello\"'*) echo",
        &format!("*'\"type\":\"hello\"'*) echo launch >> '{}'; echo", launches.display()),
    );
    assert_ne!(code, CALLING_BOT);

    let mut config = EngineConfig::default();
    config.sandbox = sandbox_config();
    let service = SessionService::in_memory(config);
    service.coins().deposit(1, Chips(1_000));
    let setup = SessionSetup::human_vs_bot(1, BotSource::Inline { code });
    let id = service.create_session(setup).expect("create").session_id;

    service.buy_in(id).expect("buy in");
    service.start_hand(id, false).expect("start");
    let view = service.submit_action(id, Action::Call).expect("call");
    assert!(view.is_player_turn);
    service.submit_action(id, Action::Check).expect("check");

    let launched = fs::read_to_string(&launches).expect("launch log");
    assert_eq!(launched.lines().count(), 1);
    assert_eq!(service.live_bots().len(), 1);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    runtime.block_on(service.exit(id)).expect("exit");
    assert!(service.live_bots().is_empty());

    fs::remove_dir_all(dir).ok();
}
