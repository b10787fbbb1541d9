//! Загрузка конфигурации.

use std::time::Duration;

use poker_arena::config::{ConfigError, EngineConfig, GameRules};
use poker_arena::domain::chips::Chips;

#[test]
fn partial_json_keeps_defaults() {
    let config = EngineConfig::from_json_str(
        r#"{"rules":{"big_blind":4,"small_blind":2},"sandbox":{"call_timeout":750}}"#,
    )
    .expect("config");

    assert_eq!(config.rules.big_blind, Chips(4));
    assert_eq!(config.rules.starting_stack, GameRules::standard().starting_stack);
    assert_eq!(config.sandbox.call_timeout, Duration::from_millis(750));
    assert_eq!(config.sandbox.entry_file, "player.py");
    assert_eq!(config.logs.player_log_limit, 1024 * 1024);
}

#[test]
fn inconsistent_rules_are_rejected() {
    let err = EngineConfig::from_json_str(r#"{"rules":{"small_blind":5,"big_blind":2}}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = EngineConfig::from_json_str(r#"{"rules":{"final_street":2}}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = EngineConfig::from_json_str("{").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn bot_limits_have_defaults_and_are_validated() {
    let config = EngineConfig::from_json_str(r#"{"sandbox":{"limits":{"open_files":16}}}"#).expect("config");
    assert_eq!(config.sandbox.limits.open_files, Some(16));
    assert_eq!(config.sandbox.limits.max_line_bytes, 64 * 1024);
    assert!(config.sandbox.limits.cpu_seconds.is_some());

    let err = EngineConfig::from_json_str(r#"{"sandbox":{"limits":{"reply_queue":0}}}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn missing_file_reports_path() {
    let err = EngineConfig::from_json_file(std::path::Path::new("/nonexistent/arena.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/arena.json"));
}
