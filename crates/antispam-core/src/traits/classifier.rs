// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spam classifier trait for AI provider integrations.

use async_trait::async_trait;

use crate::error::AntispamError;
use crate::types::{Image, Verdict};

/// A stateless spam oracle.
///
/// Every call is independent: no conversation history is carried between
/// requests. A response that cannot be turned into a [`Verdict`] is an error,
/// never an implicit "not spam".
#[async_trait]
pub trait SpamClassifier: Send + Sync + 'static {
    /// Classifies `text`, optionally together with an image.
    async fn classify(
        &self,
        system: &str,
        text: &str,
        image: Option<&Image>,
    ) -> Result<Verdict, AntispamError>;

    /// Whether images of this MIME type can be sent for analysis.
    fn supports_image(&self, mime_type: &str) -> bool;
}
