// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the antispam bot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AntispamConfig {
    /// Process-wide behavior settings.
    #[serde(default)]
    pub bot: BotConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// OpenAI classifier settings.
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Reputation score thresholds.
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// A top-level `[section]` of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Bot,
    Telegram,
    OpenAi,
    Storage,
    Scoring,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Bot,
        Section::Telegram,
        Section::OpenAi,
        Section::Storage,
        Section::Scoring,
    ];

    /// The table name used in TOML and as the env var infix.
    pub fn name(self) -> &'static str {
        match self {
            Section::Bot => "bot",
            Section::Telegram => "telegram",
            Section::OpenAi => "openai",
            Section::Storage => "storage",
            Section::Scoring => "scoring",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Keys accepted inside this section.
    pub fn keys(self) -> &'static [&'static str] {
        match self {
            Section::Bot => BotConfig::KEYS,
            Section::Telegram => TelegramConfig::KEYS,
            Section::OpenAi => OpenAiConfig::KEYS,
            Section::Storage => StorageConfig::KEYS,
            Section::Scoring => ScoringConfig::KEYS,
        }
    }

    /// The section that accepts `key`, if any.
    pub fn owning(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.keys().contains(&key))
    }
}

/// Process-wide behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Moderate private chats instead of answering them with the help text.
    #[serde(default)]
    pub dev_mode: bool,

    /// Reply sent to users who message the bot privately.
    #[serde(default = "default_help_message")]
    pub help_message: String,
}

impl BotConfig {
    pub const KEYS: &'static [&'static str] = &["log_level", "dev_mode", "help_message"];
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dev_mode: false,
            help_message: default_help_message(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_help_message() -> String {
    "Hello, I can help you with spam moderation in your group.\n\
     Please add me to your group as admin with ability to delete messages"
        .to_string()
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `serve` and `download`.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Number of concurrent moderation workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl TelegramConfig {
    pub const KEYS: &'static [&'static str] = &["bot_token", "workers"];
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    5
}

/// OpenAI classifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// OpenAI API key. Required by `serve` and `replay`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for both text-only and image requests.
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API base URL, without the `/chat/completions` suffix.
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Reasoning effort for text-only requests (minimal, low, medium, high).
    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Path to a file replacing the bundled system prompt.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl OpenAiConfig {
    pub const KEYS: &'static [&'static str] = &[
        "api_key",
        "model",
        "base_url",
        "reasoning_effort",
        "timeout_secs",
        "system_prompt_file",
    ];
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_openai_model(),
            base_url: default_openai_base_url(),
            reasoning_effort: default_reasoning_effort(),
            timeout_secs: default_timeout_secs(),
            system_prompt_file: None,
        }
    }
}

fn default_openai_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_reasoning_effort() -> String {
    "medium".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl StorageConfig {
    pub const KEYS: &'static [&'static str] = &["database_path", "wal_mode"];
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("antispam").join("antispam.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("antispam.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Reputation score thresholds.
///
/// Must satisfy `ban_score < default_score < trusted_score`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Score assigned to a sender on their first message.
    #[serde(default = "default_default_score")]
    pub default_score: i64,

    /// Senders at or above this score are no longer checked.
    #[serde(default = "default_trusted_score")]
    pub trusted_score: i64,

    /// Reaching this score on a spam verdict bans the sender.
    #[serde(default = "default_ban_score")]
    pub ban_score: i64,
}

impl ScoringConfig {
    pub const KEYS: &'static [&'static str] = &["default_score", "trusted_score", "ban_score"];
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_score: default_default_score(),
            trusted_score: default_trusted_score(),
            ban_score: default_ban_score(),
        }
    }
}

fn default_default_score() -> i64 {
    0
}

fn default_trusted_score() -> i64 {
    10
}

fn default_ban_score() -> i64 {
    -4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialized_keys(value: &toml::Value, section: Section) -> Vec<String> {
        let mut keys: Vec<String> = value[section.name()]
            .as_table()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn section_keys_match_serialized_fields() {
        let mut config = AntispamConfig::default();
        config.telegram.bot_token = Some("token".into());
        config.openai.api_key = Some("sk".into());
        config.openai.system_prompt_file = Some("prompt.txt".into());
        let value = toml::Value::try_from(&config).unwrap();

        let top: Vec<&str> = value.as_table().unwrap().keys().map(String::as_str).collect();
        assert_eq!(top.len(), Section::ALL.len());

        for section in Section::ALL {
            let mut expected: Vec<String> = section.keys().iter().map(|k| k.to_string()).collect();
            expected.sort();
            assert_eq!(serialized_keys(&value, section), expected, "[{}]", section.name());
        }
    }

    #[test]
    fn keys_resolve_to_their_section() {
        assert_eq!(Section::owning("workers"), Some(Section::Telegram));
        assert_eq!(Section::owning("ban_score"), Some(Section::Scoring));
        assert_eq!(Section::owning("nope"), None);
        assert_eq!(Section::from_name("openai"), Some(Section::OpenAi));
    }
}
