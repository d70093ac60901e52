// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock spam classifier for deterministic testing.
//!
//! `MockClassifier` implements `SpamClassifier` with pre-configured verdicts,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use antispam_core::AntispamError;
use antispam_core::traits::SpamClassifier;
use antispam_core::types::{Image, Verdict};

const DEFAULT_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// A recorded call to [`MockClassifier::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyCall {
    pub system: String,
    pub text: String,
    pub image: Option<Image>,
}

enum Scripted {
    Verdict(bool),
    Error(String),
    Panic,
}

/// A mock classifier that returns scripted results.
///
/// Results are popped from a FIFO queue. When the queue is empty,
/// a "not spam" verdict is returned.
pub struct MockClassifier {
    results: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<ClassifyCall>>,
    delay: Option<Duration>,
}

impl MockClassifier {
    /// Create a classifier with an empty queue.
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Create a classifier pre-loaded with spam (`true`) / not spam (`false`) verdicts.
    pub fn with_verdicts(verdicts: impl IntoIterator<Item = bool>) -> Self {
        let queue = verdicts.into_iter().map(Scripted::Verdict).collect();
        Self {
            results: Mutex::new(queue),
            ..Self::new()
        }
    }

    /// Delay every classification, e.g. to widen race windows or test cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a verdict.
    pub async fn push_verdict(&self, is_spam: bool) {
        self.results.lock().await.push_back(Scripted::Verdict(is_spam));
    }

    /// Queue a failure with the given message.
    pub async fn push_error(&self, message: &str) {
        self.results
            .lock()
            .await
            .push_back(Scripted::Error(message.to_string()));
    }

    /// Queue a panic, to exercise panic containment in callers.
    pub async fn push_panic(&self) {
        self.results.lock().await.push_back(Scripted::Panic);
    }

    /// All calls received so far.
    pub async fn calls(&self) -> Vec<ClassifyCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn verdict(is_spam: bool) -> Verdict {
    Verdict {
        is_spam,
        note: if is_spam { "mock spam".into() } else { String::new() },
    }
}

#[async_trait]
impl SpamClassifier for MockClassifier {
    async fn classify(
        &self,
        system: &str,
        text: &str,
        image: Option<&Image>,
    ) -> Result<Verdict, AntispamError> {
        self.calls.lock().await.push(ClassifyCall {
            system: system.to_string(),
            text: text.to_string(),
            image: image.cloned(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.results.lock().await.pop_front();
        match next {
            Some(Scripted::Verdict(is_spam)) => Ok(verdict(is_spam)),
            Some(Scripted::Error(message)) => Err(AntispamError::classifier(message)),
            Some(Scripted::Panic) => panic!("scripted classifier panic"),
            None => Ok(verdict(false)),
        }
    }

    fn supports_image(&self, mime_type: &str) -> bool {
        DEFAULT_IMAGE_TYPES.contains(&mime_type)
    }
}
