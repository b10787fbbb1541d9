// src/bin/arena_cli.rs

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use poker_arena::api::{ApiError, SessionService};
use poker_arena::bots::BotSource;
use poker_arena::config::EngineConfig;
use poker_arena::session::SessionSetup;

/// Прогон бот-против-бота с выводом лога сессии.
#[derive(Debug, Parser)]
#[command(name = "arena_cli", version)]
struct Args {
    /// Бот игрока: каталог, .zip или файл. Без аргумента - встроенный бот.
    #[arg(long)]
    player_bot: Option<PathBuf>,

    /// Бот соперника.
    #[arg(long)]
    opponent_bot: Option<PathBuf>,

    #[arg(long, default_value_t = 10)]
    hands: u32,

    #[arg(long, default_value_t = 0)]
    rebuys: u32,

    /// JSON-конфиг движка.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Куда сохранить логи сессии.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Пауза между шагами, мс.
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Не печатать полный лог.
    #[arg(long)]
    quiet: bool,
}

fn source(path: Option<PathBuf>) -> BotSource {
    path.map(BotSource::from_path).unwrap_or_default()
}

async fn run(args: Args) -> Result<(), ApiError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = args.log_dir {
        config.logs.log_dir = Some(dir);
    }
    if let Some(ms) = args.delay_ms {
        config.simulation.step_delay = Duration::from_millis(ms);
    }
    config.validate()?;

    let service = SessionService::in_memory(config);
    let mut setup = SessionSetup::bot_vs_bot(1, source(args.player_bot), source(args.opponent_bot), args.hands);
    setup.max_rebuys = args.rebuys;

    println!(
        "arena_cli: {} vs {}, раздач: {}",
        setup.player_bot.as_ref().map(BotSource::describe).unwrap_or_default(),
        setup.opponent_bot.describe(),
        args.hands
    );

    let view = service.create_session(setup)?;
    let id = view.session_id;
    service.start_simulation(id).await?;
    let status = service.wait_simulation(id).await?;

    if !args.quiet {
        println!("{}", service.transcript(id)?);
    }
    let view = service.view(id)?;
    println!();
    println!("================ ИТОГ ================");
    println!("Сыграно раздач: {}/{}", status.hands_played, status.hands_to_play);
    println!("Стеки: {} / {}", view.stacks[0], view.stacks[1]);
    if let Some(err) = status.last_error {
        println!("Последняя ошибка: {err}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("arena_cli: {e}");
            ExitCode::FAILURE
        }
    }
}
