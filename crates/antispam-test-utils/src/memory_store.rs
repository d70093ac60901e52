// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory score and audit store for deterministic testing.
//!
//! `MemoryStore` implements both `ScoreStore` and `MessageStore`, keeps every
//! write for later assertions, and can be told to fail individual operations.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use antispam_core::AntispamError;
use antispam_core::traits::{MessageStore, ScoreStore};
use antispam_core::types::{Action, ChatMessage, Identity, SavedMessage, Sender};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetScore,
    SetScore,
    SaveMessage,
    SaveAction,
    SaveError,
}

struct Record {
    created_at: DateTime<Utc>,
    saved: SavedMessage,
}

/// An in-memory implementation of the score and audit stores.
pub struct MemoryStore {
    scores: Mutex<HashMap<Identity, i64>>,
    records: Mutex<Vec<Record>>,
    failing: Mutex<HashSet<StoreOp>>,
    score_writes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            scores: Mutex::new(HashMap::new()),
            records: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            score_writes: AtomicUsize::new(0),
        }
    }

    /// Seed a score without counting it as a write.
    pub async fn seed_score(&self, identity: &Identity, score: i64) {
        self.scores.lock().await.insert(identity.clone(), score);
    }

    /// Current score of an identity, if any was ever written.
    pub async fn score(&self, identity: &Identity) -> Option<i64> {
        self.scores.lock().await.get(identity).copied()
    }

    /// Number of `set_score` calls that succeeded.
    pub fn score_writes(&self) -> usize {
        self.score_writes.load(Ordering::SeqCst)
    }

    /// All audit records in insertion order.
    pub async fn records(&self) -> Vec<SavedMessage> {
        self.records
            .lock()
            .await
            .iter()
            .map(|r| r.saved.clone())
            .collect()
    }

    /// Insert a resolved audit record with an explicit creation time.
    pub async fn push_record(
        &self,
        msg: &ChatMessage,
        created_at: DateTime<Utc>,
        action: Option<&Action>,
    ) -> i64 {
        let mut records = self.records.lock().await;
        let record_id = records.len() as i64 + 1;
        records.push(Record {
            created_at,
            saved: SavedMessage {
                record_id,
                sender: msg.sender.clone(),
                message_id: msg.id.clone(),
                text: msg.text.clone(),
                media: msg.media.clone(),
                created_at: created_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                action: action.map(|a| a.kind),
                action_note: action.map(|a| a.note.clone()),
                error: None,
            },
        });
        record_id
    }

    /// Make the given operation fail from now on.
    pub async fn fail_on(&self, op: StoreOp) {
        self.failing.lock().await.insert(op);
    }

    async fn check(&self, op: StoreOp) -> Result<(), AntispamError> {
        if self.failing.lock().await.contains(&op) {
            return Err(AntispamError::storage(format!("injected {op:?} failure")));
        }
        Ok(())
    }

    async fn update_record(
        &self,
        record_id: i64,
        apply: impl FnOnce(&mut SavedMessage),
    ) -> Result<(), AntispamError> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.saved.record_id == record_id)
            .ok_or_else(|| AntispamError::storage(format!("message {record_id} not found")))?;
        apply(&mut record.saved);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn get_score(&self, identity: &Identity) -> Result<Option<i64>, AntispamError> {
        self.check(StoreOp::GetScore).await?;
        Ok(self.score(identity).await)
    }

    async fn set_score(&self, sender: &Sender, score: i64) -> Result<(), AntispamError> {
        self.check(StoreOp::SetScore).await?;
        self.scores
            .lock()
            .await
            .insert(sender.identity.clone(), score);
        self.score_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn save_message(&self, msg: &ChatMessage) -> Result<i64, AntispamError> {
        self.check(StoreOp::SaveMessage).await?;
        let mut records = self.records.lock().await;
        let record_id = records.len() as i64 + 1;
        let created_at = Utc::now();
        records.push(Record {
            created_at,
            saved: SavedMessage {
                record_id,
                sender: msg.sender.clone(),
                message_id: msg.id.clone(),
                text: msg.text.clone(),
                media: msg.media.clone(),
                created_at: created_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                action: None,
                action_note: None,
                error: None,
            },
        });
        Ok(record_id)
    }

    async fn save_action(&self, record_id: i64, action: &Action) -> Result<(), AntispamError> {
        self.check(StoreOp::SaveAction).await?;
        self.update_record(record_id, |saved| {
            saved.action = Some(action.kind);
            saved.action_note = Some(action.note.clone());
        })
        .await
    }

    async fn save_error(&self, record_id: i64, error: &str) -> Result<(), AntispamError> {
        self.check(StoreOp::SaveError).await?;
        self.update_record(record_id, |saved| saved.error = Some(error.to_string()))
            .await
    }

    async fn list_messages(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SavedMessage>, AntispamError> {
        let records = self.records.lock().await;
        let mut matched: Vec<&Record> = records.iter().filter(|r| r.created_at >= since).collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.saved.record_id.cmp(&a.saved.record_id))
        });
        Ok(matched.into_iter().map(|r| r.saved.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message;
    use antispam_core::types::ActionKind;

    #[tokio::test]
    async fn scores_start_absent_and_track_writes() {
        let store = MemoryStore::new();
        let msg = message("-1", "7", "1", "hi");
        assert_eq!(store.get_score(msg.identity()).await.unwrap(), None);

        store.set_score(&msg.sender, 3).await.unwrap();
        assert_eq!(store.get_score(msg.identity()).await.unwrap(), Some(3));
        assert_eq!(store.score_writes(), 1);

        store.seed_score(msg.identity(), 5).await;
        assert_eq!(store.score(msg.identity()).await, Some(5));
        assert_eq!(store.score_writes(), 1);
    }

    #[tokio::test]
    async fn save_message_then_action_and_error() {
        let store = MemoryStore::new();
        let id = store
            .save_message(&message("-1", "7", "1", "buy now"))
            .await
            .unwrap();
        store.save_action(id, &Action::erase("ad")).await.unwrap();
        store.save_error(id, "boom").await.unwrap();

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, Some(ActionKind::Erase));
        assert_eq!(records[0].action_note.as_deref(), Some("ad"));
        assert_eq!(records[0].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn unknown_record_is_an_error() {
        let store = MemoryStore::new();
        assert!(store.save_action(42, &Action::noop()).await.is_err());
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = MemoryStore::new();
        store.fail_on(StoreOp::SaveMessage).await;
        let err = store
            .save_message(&message("-1", "7", "1", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AntispamError::Storage { .. }));
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn list_messages_filters_and_orders_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .push_record(
                &message("-1", "7", "1", "old"),
                now - chrono::Duration::days(20),
                Some(&Action::noop()),
            )
            .await;
        store
            .push_record(
                &message("-1", "7", "2", "older"),
                now - chrono::Duration::days(2),
                None,
            )
            .await;
        store
            .push_record(&message("-1", "7", "3", "newest"), now, None)
            .await;

        let listed = store
            .list_messages(now - chrono::Duration::days(10))
            .await
            .unwrap();
        let texts: Vec<_> = listed.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["newest", "older"]);
    }
}
