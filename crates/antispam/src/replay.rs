// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `antispam replay` command implementation.
//!
//! Re-classifies recent audit log records with the current prompt and model
//! and reports how many verdicts changed.

use std::collections::HashSet;
use std::sync::Arc;

use antispam_config::model::AntispamConfig;
use antispam_core::error::AntispamError;
use antispam_core::traits::{MediaResolver, MessageStore};
use antispam_core::types::SavedMessage;
use antispam_moderator::shutdown;
use antispam_moderator::{SpamChecker, load_system_prompt};
use antispam_openai::OpenAiClassifier;
use antispam_storage::SqliteStorage;
use antispam_telegram::TelegramMedia;
use chrono::{Duration, Utc};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Verdict changes found by a replay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub stay_the_same: usize,
    pub become_spam: usize,
    pub become_not_spam: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl ReplayStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Same => self.stay_the_same += 1,
            Outcome::BecameSpam => self.become_spam += 1,
            Outcome::BecameNotSpam => self.become_not_spam += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Same,
    BecameSpam,
    BecameNotSpam,
    Failed,
    Cancelled,
}

/// Runs the `antispam replay` command.
pub async fn run_replay(
    config: AntispamConfig,
    days: u32,
    workers: usize,
) -> Result<(), AntispamError> {
    if workers == 0 {
        return Err(AntispamError::Config("--workers must be at least 1".into()));
    }

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;

    let since = Utc::now() - Duration::days(i64::from(days));
    let records = storage.list_messages(since).await?;
    storage.close().await?;

    let classifier = Arc::new(OpenAiClassifier::new(&config.openai)?);
    let system_prompt = load_system_prompt(config.openai.system_prompt_file.as_deref()).await?;

    let media: Option<Arc<dyn MediaResolver>> = match config.telegram.bot_token.as_deref() {
        Some(token) if !token.is_empty() => {
            Some(Arc::new(TelegramMedia::new(token)?) as Arc<dyn MediaResolver>)
        }
        _ => {
            info!("no Telegram bot token configured, replaying text only");
            None
        }
    };
    let checker = SpamChecker::new(classifier, media).with_system_prompt(system_prompt);

    let cancel = shutdown::install_signal_handler();
    let stats = replay(records, &checker, workers, &cancel).await;
    cancel.cancel();

    println!("stay the same:   {}", stats.stay_the_same);
    println!("become spam:     {}", stats.become_spam);
    println!("become not spam: {}", stats.become_not_spam);
    if stats.failed > 0 {
        println!("failed:          {}", stats.failed);
    }
    if stats.cancelled > 0 {
        println!("cancelled:       {}", stats.cancelled);
    }
    Ok(())
}

/// Drops unresolved records and repeated content, keeping the newest copy.
///
/// Records are keyed by trimmed, lower-cased text. Attachments without a
/// caption are keyed by their file handle instead.
pub fn dedupe(records: Vec<SavedMessage>) -> Vec<SavedMessage> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| r.action.is_some())
        .filter(|r| seen.insert(content_key(r)))
        .collect()
}

fn content_key(record: &SavedMessage) -> String {
    let text = record.text.trim().to_lowercase();
    match (&record.media, text.is_empty()) {
        (Some(media), true) => format!("file:{}", media.file_id),
        _ => format!("text:{text}"),
    }
}

/// Re-classifies `records` with up to `workers` concurrent requests.
pub async fn replay(
    records: Vec<SavedMessage>,
    checker: &SpamChecker,
    workers: usize,
    cancel: &CancellationToken,
) -> ReplayStats {
    let records = dedupe(records);
    info!(count = records.len(), workers, "replaying messages");

    futures::stream::iter(records)
        .map(|record| replay_one(record, checker, cancel))
        .buffer_unordered(workers.max(1))
        .fold(ReplayStats::default(), |mut stats, outcome| async move {
            stats.record(outcome);
            stats
        })
        .await
}

async fn replay_one(
    record: SavedMessage,
    checker: &SpamChecker,
    cancel: &CancellationToken,
) -> Outcome {
    if cancel.is_cancelled() {
        return Outcome::Cancelled;
    }

    let verdict = match checker
        .check_content(&record.text, record.media.as_ref(), cancel)
        .await
    {
        Ok(verdict) => verdict,
        Err(e) if e.is_cancelled() => return Outcome::Cancelled,
        Err(e) => {
            warn!(record_id = record.record_id, error = %e, "replay classification failed");
            return Outcome::Failed;
        }
    };

    let was_spam = record.was_spam();
    match (was_spam, verdict.is_spam) {
        (false, true) => {
            info!(
                record_id = record.record_id,
                user = record.sender.name.as_str(),
                text = record.text.as_str(),
                note = verdict.note.as_str(),
                "became spam"
            );
            Outcome::BecameSpam
        }
        (true, false) => {
            info!(
                record_id = record.record_id,
                user = record.sender.name.as_str(),
                text = record.text.as_str(),
                previous = record.action_note.as_deref().unwrap_or(""),
                "became not spam"
            );
            Outcome::BecameNotSpam
        }
        _ => {
            debug!(record_id = record.record_id, "verdict unchanged");
            Outcome::Same
        }
    }
}
