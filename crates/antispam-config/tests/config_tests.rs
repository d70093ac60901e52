// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the antispam configuration system.

use std::io::Write;

use antispam_config::diagnostic::{ConfigError, closest_key};
use antispam_config::model::{AntispamConfig, Section};
use antispam_config::{
    load_and_validate_path, load_and_validate_str, load_config_from_path, load_config_from_str,
};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_antispam_config() {
    let toml = r#"
[bot]
log_level = "debug"
dev_mode = true
help_message = "hi"

[telegram]
bot_token = "123:ABC"
workers = 8

[openai]
api_key = "sk-123"
model = "gpt-5"
base_url = "http://localhost:9000/v1"
reasoning_effort = "low"
timeout_secs = 15
system_prompt_file = "/etc/antispam/prompt.txt"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[scoring]
default_score = 1
trusted_score = 6
ban_score = -2
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.bot.log_level, "debug");
    assert!(config.bot.dev_mode);
    assert_eq!(config.bot.help_message, "hi");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.workers, 8);
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-123"));
    assert_eq!(config.openai.model, "gpt-5");
    assert_eq!(config.openai.base_url, "http://localhost:9000/v1");
    assert_eq!(config.openai.reasoning_effort, "low");
    assert_eq!(config.openai.timeout_secs, 15);
    assert_eq!(
        config.openai.system_prompt_file.as_deref(),
        Some("/etc/antispam/prompt.txt")
    );
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.scoring.default_score, 1);
    assert_eq!(config.scoring.trusted_score, 6);
    assert_eq!(config.scoring.ban_score, -2);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.bot.log_level, "info");
    assert!(!config.bot.dev_mode);
    assert!(config.bot.help_message.contains("spam moderation"));
    assert!(config.telegram.bot_token.is_none());
    assert_eq!(config.telegram.workers, 5);
    assert!(config.openai.api_key.is_none());
    assert_eq!(config.openai.model, "gpt-5-mini");
    assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    assert_eq!(config.openai.reasoning_effort, "medium");
    assert!(config.storage.database_path.ends_with("antispam.db"));
    assert!(config.storage.wal_mode);
    assert_eq!(config.scoring.default_score, 0);
    assert_eq!(config.scoring.trusted_score, 10);
    assert_eq!(config.scoring.ban_score, -4);
}

/// Unknown field in [telegram] section produces an UnknownField error.
#[test]
fn unknown_field_in_telegram_produces_error() {
    let toml = r#"
[telegram]
bot_tken = "abc"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("bot_tken"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err = load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// `ANTISPAM_TELEGRAM_BOT_TOKEN` maps to telegram.bot_token, not telegram.bot.token.
#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[telegram]
bot_token = "from-file"
workers = 2
"#,
        )?;
        jail.set_env("ANTISPAM_TELEGRAM_BOT_TOKEN", "from-env");
        jail.set_env("ANTISPAM_SCORING_BAN_SCORE", "-7");
        jail.set_env("ANTISPAM_BOT_DEV_MODE", "true");

        let config = load_config_from_path(std::path::Path::new("custom.toml"))?;
        assert_eq!(config.telegram.bot_token.as_deref(), Some("from-env"));
        assert_eq!(config.telegram.workers, 2);
        assert_eq!(config.scoring.ban_score, -7);
        assert!(config.bot.dev_mode);
        Ok(())
    });
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: AntispamConfig = Figment::new()
        .merge(Serialized::defaults(AntispamConfig::default()))
        .merge(Toml::file("/nonexistent/path/antispam.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.telegram.workers, 5);
}

/// An explicit --config path that does not exist is an error, not silent defaults.
#[test]
fn explicit_missing_path_is_rejected() {
    let errors = load_and_validate_path(std::path::Path::new("/nonexistent/antispam.toml"))
        .expect_err("missing explicit file should fail");
    assert!(matches!(&errors[0], ConfigError::Other(msg) if msg.contains("does not exist")));
}

/// Unknown key in an explicit file carries a source span into that file.
#[test]
fn explicit_path_unknown_key_has_span() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[telegram]\nworkres = 3").unwrap();

    let errors = load_and_validate_path(file.path()).expect_err("should reject unknown key");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, .. }
            if key == "workres" && suggestion.as_deref() == Some("workers"))
    });
    assert!(found, "expected UnknownKey for workres, got: {errors:?}");
}

/// "workres" is closest to `workers` among the [telegram] keys.
#[test]
fn diagnostic_workres_suggests_workers() {
    assert_eq!(
        closest_key("workres", Section::Telegram.keys()),
        Some("workers")
    );
}

/// The help for an unknown [scoring] key lists what the section accepts.
#[test]
fn diagnostic_help_lists_section_keys() {
    use miette::Diagnostic;

    let toml = r#"
[scoring]
trusted_scroe = 12
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let error = errors
        .iter()
        .find(|e| {
            matches!(e, ConfigError::UnknownKey { section, key, suggestion, .. }
                if section == "scoring"
                    && key == "trusted_scroe"
                    && suggestion.as_deref() == Some("trusted_score"))
        })
        .unwrap_or_else(|| panic!("expected UnknownKey for trusted_scroe, got: {errors:?}"));
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("ban_score"), "got: {help}");
    assert!(help.contains("default_score"), "got: {help}");
}

/// Invalid type (string where number expected) produces clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[telegram]
workers = "many"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("workers"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        section: "telegram".to_string(),
        key: "workres".to_string(),
        suggestion: Some("workers".to_string()),
        help: "did you mean `workers`?".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some(), "should have diagnostic code");
    let help = error.help().expect("should have help text").to_string();
    assert!(help.contains("did you mean `workers`"), "got: {help}");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("workres"), "rendered report should mention the key");
}

/// Validation errors surface through the high-level entry point.
#[test]
fn validation_rejects_inverted_thresholds() {
    let toml = r#"
[scoring]
default_score = 0
trusted_score = 10
ban_score = 3
"#;

    let errors = load_and_validate_str(toml).expect_err("inverted thresholds should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("ban_score"))
    ));
}

/// Validation rejects a zero-sized worker pool.
#[test]
fn validation_rejects_zero_workers() {
    let toml = r#"
[telegram]
workers = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero workers should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("workers"))
    ));
}
