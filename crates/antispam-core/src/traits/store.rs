// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for reputation scores and the message audit log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AntispamError;
use crate::types::{Action, ChatMessage, Identity, SavedMessage, Sender};

/// Durable mapping from sender identity to an integer reputation score.
#[async_trait]
pub trait ScoreStore: Send + Sync + 'static {
    /// Returns the stored score, or `None` for an identity never seen before.
    async fn get_score(&self, identity: &Identity) -> Result<Option<i64>, AntispamError>;

    /// Creates or replaces the score record for the sender.
    async fn set_score(&self, sender: &Sender, score: i64) -> Result<(), AntispamError>;
}

/// Append-only audit log of evaluated messages.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Persists a message before it is classified and returns its record id.
    async fn save_message(&self, msg: &ChatMessage) -> Result<i64, AntispamError>;

    /// Records the action taken on a previously saved message.
    async fn save_action(&self, record_id: i64, action: &Action) -> Result<(), AntispamError>;

    /// Records a classification failure on a previously saved message.
    async fn save_error(&self, record_id: i64, error: &str) -> Result<(), AntispamError>;

    /// Lists messages saved at or after `since`, newest first.
    async fn list_messages(&self, since: DateTime<Utc>)
    -> Result<Vec<SavedMessage>, AntispamError>;
}
