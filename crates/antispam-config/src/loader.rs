// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./antispam.toml` > `~/.config/antispam/antispam.toml` > `/etc/antispam/antispam.toml`
//! with environment variable overrides via `ANTISPAM_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::{AntispamConfig, Section};

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/antispam/antispam.toml` (system-wide)
/// 3. `~/.config/antispam/antispam.toml` (user XDG config)
/// 4. `./antispam.toml` (local directory)
/// 5. `ANTISPAM_*` environment variables
pub fn load_config() -> Result<AntispamConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<AntispamConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AntispamConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AntispamConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AntispamConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AntispamConfig::default()))
        .merge(Toml::file("/etc/antispam/antispam.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("antispam/antispam.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("antispam.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider mapping `ANTISPAM_<SECTION>_<KEY>`
/// to `<section>.<key>`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `ANTISPAM_TELEGRAM_BOT_TOKEN` maps to `telegram.bot_token`.
fn env_provider() -> Env {
    Env::prefixed("ANTISPAM_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in Section::ALL.map(Section::name) {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
