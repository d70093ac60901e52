// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the score and message store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use antispam_config::model::StorageConfig;
use antispam_core::{
    Action, AntispamError, ChatMessage, Identity, MessageStore, SavedMessage, ScoreStore, Sender,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed score and audit store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`SqliteStorage::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and run migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), AntispamError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| AntispamError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Checkpoint the WAL before the process exits.
    pub async fn close(&self) -> Result<(), AntispamError> {
        self.db()?.close().await
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, AntispamError> {
        self.db.get().ok_or_else(|| AntispamError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl ScoreStore for SqliteStorage {
    async fn get_score(&self, identity: &Identity) -> Result<Option<i64>, AntispamError> {
        queries::scores::get_score(self.db()?, identity).await
    }

    async fn set_score(&self, sender: &Sender, score: i64) -> Result<(), AntispamError> {
        queries::scores::set_score(self.db()?, sender, score).await
    }
}

#[async_trait]
impl MessageStore for SqliteStorage {
    async fn save_message(&self, msg: &ChatMessage) -> Result<i64, AntispamError> {
        queries::messages::save_message(self.db()?, msg).await
    }

    async fn save_action(&self, record_id: i64, action: &Action) -> Result<(), AntispamError> {
        queries::messages::save_action(self.db()?, record_id, action).await
    }

    async fn save_error(&self, record_id: i64, error: &str) -> Result<(), AntispamError> {
        queries::messages::save_error(self.db()?, record_id, error).await
    }

    async fn list_messages(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SavedMessage>, AntispamError> {
        queries::messages::list_messages(self.db()?, since).await
    }
}
