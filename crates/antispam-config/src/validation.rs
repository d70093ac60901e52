// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as threshold ordering, non-empty paths and positive worker counts.

use crate::diagnostic::ConfigError;
use crate::model::AntispamConfig;

/// Accepted values for `openai.reasoning_effort`.
const REASONING_EFFORTS: &[&str] = &["minimal", "low", "medium", "high"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AntispamConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.telegram.workers < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "telegram.workers must be at least 1, got {}",
                config.telegram.workers
            ),
        });
    }

    let scoring = &config.scoring;
    if scoring.ban_score >= scoring.default_score {
        errors.push(ConfigError::Validation {
            message: format!(
                "scoring.ban_score ({}) must be lower than scoring.default_score ({})",
                scoring.ban_score, scoring.default_score
            ),
        });
    }
    if scoring.default_score >= scoring.trusted_score {
        errors.push(ConfigError::Validation {
            message: format!(
                "scoring.default_score ({}) must be lower than scoring.trusted_score ({})",
                scoring.default_score, scoring.trusted_score
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.openai.model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "openai.model must not be empty".to_string(),
        });
    }

    if config.openai.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "openai.timeout_secs must be greater than 0".to_string(),
        });
    }

    if !REASONING_EFFORTS.contains(&config.openai.reasoning_effort.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "openai.reasoning_effort `{}` is not one of: {}",
                config.openai.reasoning_effort,
                REASONING_EFFORTS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = AntispamConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_workers_fails_validation() {
        let mut config = AntispamConfig::default();
        config.telegram.workers = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "telegram.workers"));
    }

    #[test]
    fn ban_score_above_default_fails_validation() {
        let mut config = AntispamConfig::default();
        config.scoring.ban_score = 1;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "scoring.ban_score"));
    }

    #[test]
    fn trusted_score_equal_to_default_fails_validation() {
        let mut config = AntispamConfig::default();
        config.scoring.trusted_score = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "scoring.trusted_score"));
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = AntispamConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn unknown_reasoning_effort_fails_validation() {
        let mut config = AntispamConfig::default();
        config.openai.reasoning_effort = "extreme".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "reasoning_effort"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = AntispamConfig::default();
        config.telegram.workers = 0;
        config.openai.timeout_secs = 0;
        config.storage.database_path = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = AntispamConfig::default();
        config.telegram.workers = 20;
        config.scoring.default_score = 2;
        config.scoring.trusted_score = 5;
        config.scoring.ban_score = -1;
        config.openai.reasoning_effort = "low".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
