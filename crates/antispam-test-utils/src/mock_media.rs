// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock media resolver serving registered files from memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use antispam_core::AntispamError;
use antispam_core::traits::MediaResolver;

/// A media resolver backed by a map of file id to bytes.
///
/// Unknown file ids fail with a media error.
pub struct MockMedia {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MockMedia {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Register file contents under `file_id`.
    pub async fn insert(&self, file_id: &str, data: Vec<u8>) {
        self.files.lock().await.insert(file_id.to_string(), data);
    }

    /// Number of fetch attempts, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Default for MockMedia {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaResolver for MockMedia {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>, AntispamError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .await
            .get(file_id)
            .cloned()
            .ok_or_else(|| AntispamError::Media {
                message: format!("file {file_id} not found"),
                source: None,
            })
    }
}
