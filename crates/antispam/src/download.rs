// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `antispam download` command implementation.
//!
//! Saves the attachments referenced by recent audit log records to disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use antispam_config::model::AntispamConfig;
use antispam_core::error::AntispamError;
use antispam_core::traits::{MediaResolver, MessageStore};
use antispam_core::types::{MediaDescriptor, SavedMessage};
use antispam_moderator::shutdown;
use antispam_storage::SqliteStorage;
use antispam_telegram::TelegramMedia;
use chrono::{Duration, Utc};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Files handled by a download run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadStats {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    Downloaded,
    Skipped,
    Failed,
}

/// Runs the `antispam download` command.
pub async fn run_download(
    config: AntispamConfig,
    days: u32,
    workers: usize,
    output: PathBuf,
) -> Result<(), AntispamError> {
    if workers == 0 {
        return Err(AntispamError::Config("--workers must be at least 1".into()));
    }
    let token = match config.telegram.bot_token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => {
            return Err(AntispamError::Config(
                "telegram.bot_token is required to download files".into(),
            ));
        }
    };
    let media = TelegramMedia::new(token)?;

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let since = Utc::now() - Duration::days(i64::from(days));
    let records = storage.list_messages(since).await?;
    storage.close().await?;

    tokio::fs::create_dir_all(&output)
        .await
        .map_err(|e| AntispamError::Media {
            message: format!("failed to create {}: {e}", output.display()),
            source: Some(Box::new(e)),
        })?;

    let cancel = shutdown::install_signal_handler();
    let stats = download(records, Arc::new(media), &output, workers, &cancel).await;
    cancel.cancel();

    println!("downloaded: {}", stats.downloaded);
    println!("skipped:    {}", stats.skipped);
    println!("failed:     {}", stats.failed);
    Ok(())
}

/// File extension for a MIME type, including the leading dot.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "audio/mpeg" => ".mp3",
        "audio/ogg" => ".ogg",
        "application/pdf" => ".pdf",
        "application/x-tgsticker" => ".tgs",
        _ => "",
    }
}

/// Attachments referenced by `records`, one per file handle.
pub fn collect_media(records: Vec<SavedMessage>) -> Vec<MediaDescriptor> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter_map(|r| r.media)
        .filter(|m| seen.insert(m.file_id.clone()))
        .collect()
}

/// Downloads every attachment in `records` into `output`.
pub async fn download(
    records: Vec<SavedMessage>,
    resolver: Arc<dyn MediaResolver>,
    output: &Path,
    workers: usize,
    cancel: &CancellationToken,
) -> DownloadStats {
    let files = collect_media(records);
    info!(count = files.len(), workers, output = %output.display(), "downloading files");

    futures::stream::iter(files)
        .map(|media| download_one(media, resolver.as_ref(), output, cancel))
        .buffer_unordered(workers.max(1))
        .fold(DownloadStats::default(), |mut stats, outcome| async move {
            match outcome {
                Outcome::Downloaded => stats.downloaded += 1,
                Outcome::Skipped => stats.skipped += 1,
                Outcome::Failed => stats.failed += 1,
            }
            stats
        })
        .await
}

async fn download_one(
    media: MediaDescriptor,
    resolver: &dyn MediaResolver,
    output: &Path,
    cancel: &CancellationToken,
) -> Outcome {
    let path = output.join(format!(
        "{}{}",
        media.file_id,
        extension_for(&media.mime_type)
    ));
    if tokio::fs::try_exists(&path).await.unwrap_or(false) {
        debug!(path = %path.display(), "file exists, skipping");
        return Outcome::Skipped;
    }
    if cancel.is_cancelled() {
        return Outcome::Skipped;
    }

    let data = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Outcome::Skipped,
        result = resolver.fetch(&media.file_id) => result,
    };
    let data = match data {
        Ok(data) => data,
        Err(e) => {
            warn!(file_id = media.file_id.as_str(), error = %e, "download failed");
            return Outcome::Failed;
        }
    };

    match tokio::fs::write(&path, &data).await {
        Ok(()) => {
            debug!(path = %path.display(), bytes = data.len(), "file saved");
            Outcome::Downloaded
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to write file");
            Outcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antispam_core::types::Action;
    use antispam_test_utils::{MemoryStore, MockMedia, message, message_with_media};

    async fn saved() -> Vec<SavedMessage> {
        let store = MemoryStore::new();
        let now = Utc::now();
        let entries = [
            message_with_media("-1", "1", "1", "", "photo1", "image/jpeg"),
            message_with_media("-1", "2", "2", "again", "photo1", "image/jpeg"),
            message_with_media("-1", "3", "3", "", "doc", "application/zip"),
            message_with_media("-1", "4", "4", "", "gone", "image/png"),
            message("-1", "5", "5", "text only"),
        ];
        for (i, msg) in entries.iter().enumerate() {
            store
                .push_record(msg, now - Duration::minutes(i as i64), Some(&Action::noop()))
                .await;
        }
        store.list_messages(now - Duration::days(1)).await.unwrap()
    }

    #[test]
    fn extensions_follow_mime_type() {
        assert_eq!(extension_for("image/jpeg"), ".jpg");
        assert_eq!(extension_for("video/webm"), ".webm");
        assert_eq!(extension_for("application/octet-stream"), "");
    }

    #[tokio::test]
    async fn collects_unique_file_handles() {
        let files = collect_media(saved().await);
        let ids: Vec<_> = files.iter().map(|m| m.file_id.as_str()).collect();
        assert_eq!(ids, vec!["photo1", "doc", "gone"]);
    }

    #[tokio::test]
    async fn downloads_missing_files_and_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc"), b"old").unwrap();

        let media = Arc::new(MockMedia::new());
        media.insert("photo1", vec![1, 2, 3]).await;
        media.insert("doc", vec![9]).await;

        let stats = download(
            saved().await,
            media.clone(),
            dir.path(),
            2,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(
            stats,
            DownloadStats {
                downloaded: 1,
                skipped: 1,
                failed: 1,
            }
        );
        assert_eq!(
            std::fs::read(dir.path().join("photo1.jpg")).unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(std::fs::read(dir.path().join("doc")).unwrap(), b"old");
        assert!(!dir.path().join("gone.png").exists());
        // photo1 and gone were fetched, doc was already on disk.
        assert_eq!(media.fetch_count(), 2);
    }
}
