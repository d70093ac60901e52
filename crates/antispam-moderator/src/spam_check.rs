// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spam check orchestration.
//!
//! Decides between a text-only and a text plus image classification, fetches
//! the image through the media resolver, and races every network call against
//! the shared cancellation token.

use std::path::Path;
use std::sync::Arc;

use antispam_core::error::AntispamError;
use antispam_core::traits::{MediaResolver, SpamClassifier};
use antispam_core::types::{ChatMessage, Image, MediaDescriptor, Verdict};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Text sent instead of an empty caption when only the image can be analyzed.
pub const IMAGE_ONLY_PLACEHOLDER: &str = "(no text, analyze image only)";

/// System prompt bundled with the binary.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("system_prompt.txt");

/// Loads the system prompt from `path`, or returns the bundled prompt.
pub async fn load_system_prompt(path: Option<&str>) -> Result<String, AntispamError> {
    let Some(path) = path else {
        return Ok(DEFAULT_SYSTEM_PROMPT.to_string());
    };

    let prompt = tokio::fs::read_to_string(Path::new(path))
        .await
        .map_err(|e| AntispamError::Config(format!("failed to read system prompt {path}: {e}")))?;
    if prompt.trim().is_empty() {
        return Err(AntispamError::Config(format!(
            "system prompt file {path} is empty"
        )));
    }
    Ok(prompt)
}

/// Runs spam classification for chat messages.
pub struct SpamChecker {
    classifier: Arc<dyn SpamClassifier>,
    media: Option<Arc<dyn MediaResolver>>,
    system_prompt: String,
}

impl SpamChecker {
    /// Creates a checker using the bundled system prompt.
    ///
    /// Without a media resolver every message is classified as text only.
    pub fn new(
        classifier: Arc<dyn SpamClassifier>,
        media: Option<Arc<dyn MediaResolver>>,
    ) -> Self {
        Self {
            classifier,
            media,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: String) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The attachment if the classifier accepts its MIME type.
    pub fn analyzable_media<'a>(
        &self,
        media: Option<&'a MediaDescriptor>,
    ) -> Option<&'a MediaDescriptor> {
        media.filter(|m| self.classifier.supports_image(&m.mime_type))
    }

    /// True if the message has text or an attachment the classifier can analyze.
    pub fn is_evaluable(&self, msg: &ChatMessage) -> bool {
        msg.has_text() || self.analyzable_media(msg.media.as_ref()).is_some()
    }

    /// Classifies a chat message.
    pub async fn check(
        &self,
        msg: &ChatMessage,
        cancel: &CancellationToken,
    ) -> Result<Verdict, AntispamError> {
        self.check_content(&msg.text, msg.media.as_ref(), cancel)
            .await
    }

    /// Classifies raw content: text plus an optional attachment descriptor.
    ///
    /// A failed image fetch degrades to a text-only request.
    pub async fn check_content(
        &self,
        text: &str,
        media: Option<&MediaDescriptor>,
        cancel: &CancellationToken,
    ) -> Result<Verdict, AntispamError> {
        let image = match self.analyzable_media(media) {
            Some(descriptor) => self.fetch_image(descriptor, cancel).await?,
            None => None,
        };

        let text = if text.is_empty() {
            IMAGE_ONLY_PLACEHOLDER
        } else {
            text
        };

        debug!(with_image = image.is_some(), "classifying message");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AntispamError::Cancelled),
            result = self.classifier.classify(&self.system_prompt, text, image.as_ref()) => result,
        }
    }

    async fn fetch_image(
        &self,
        descriptor: &MediaDescriptor,
        cancel: &CancellationToken,
    ) -> Result<Option<Image>, AntispamError> {
        let Some(resolver) = &self.media else {
            return Ok(None);
        };

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AntispamError::Cancelled),
            result = resolver.fetch(&descriptor.file_id) => result,
        };

        match fetched {
            Ok(data) => Ok(Some(Image {
                data,
                mime_type: descriptor.mime_type.clone(),
            })),
            Err(e) => {
                warn!(
                    file_id = descriptor.file_id.as_str(),
                    error = %e,
                    "failed to fetch media, falling back to text-only check"
                );
                Ok(None)
            }
        }
    }
}
