// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI spam classifier for the antispam bot.
//!
//! This crate implements [`SpamClassifier`] on top of the chat-completions API
//! with a strict JSON-schema response format, for text-only and text plus
//! image requests.

pub mod client;
pub mod types;

use std::time::Duration;

use antispam_config::model::OpenAiConfig;
use antispam_core::error::AntispamError;
use antispam_core::traits::SpamClassifier;
use antispam_core::types::{Image, Verdict};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{
    ApiContent, ApiMessage, ChatRequest, ChatResponse, ContentPart, FINISH_REASON_STOP, ImageUrl,
    spam_check_format,
};

/// Image MIME types accepted by the vision endpoint. GIFs must not be animated.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// OpenAI-backed spam classifier implementing [`SpamClassifier`].
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiClassifier {
    client: OpenAiClient,
    model: String,
    reasoning_effort: String,
}

impl OpenAiClassifier {
    /// Creates a new classifier from the `[openai]` config section.
    pub fn new(config: &OpenAiConfig) -> Result<Self, AntispamError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;

        info!(model = config.model, "OpenAI classifier initialized");

        Ok(Self {
            client,
            model: config.model.clone(),
            reasoning_effort: config.reasoning_effort.clone(),
        })
    }

    /// Builds the request body for one classification.
    fn to_chat_request(&self, system: &str, text: &str, image: Option<&Image>) -> ChatRequest {
        let (content, reasoning_effort) = match image {
            Some(image) => {
                let url = format!(
                    "data:{};base64,{}",
                    image.mime_type,
                    STANDARD.encode(&image.data)
                );
                let parts = vec![
                    ContentPart::Text {
                        text: text.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url,
                            detail: "low".to_string(),
                        },
                    },
                ];
                (ApiContent::Parts(parts), None)
            }
            None => (
                ApiContent::Text(text.to_string()),
                Some(self.reasoning_effort.clone()),
            ),
        };

        ChatRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage::system(system), ApiMessage::user(content)],
            reasoning_effort,
            response_format: spam_check_format(),
        }
    }
}

#[async_trait]
impl SpamClassifier for OpenAiClassifier {
    async fn classify(
        &self,
        system: &str,
        text: &str,
        image: Option<&Image>,
    ) -> Result<Verdict, AntispamError> {
        let request = self.to_chat_request(system, text, image);
        let kind = if image.is_some() { "image" } else { "text" };
        metrics::counter!("antispam_classifier_requests_total", "kind" => kind).increment(1);

        let response = self.client.complete(&request).await.inspect_err(|_| {
            metrics::counter!("antispam_classifier_errors_total", "kind" => kind).increment(1);
        })?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                kind,
                "classifier usage"
            );
        }

        parse_verdict(response)
    }

    fn supports_image(&self, mime_type: &str) -> bool {
        SUPPORTED_IMAGE_TYPES.contains(&mime_type)
    }
}

/// Extracts the verdict from the first choice. Anything unexpected is an error.
fn parse_verdict(response: ChatResponse) -> Result<Verdict, AntispamError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AntispamError::classifier("empty choices in response"))?;

    let finish_reason = choice.finish_reason.unwrap_or_default();
    if finish_reason != FINISH_REASON_STOP {
        return Err(AntispamError::classifier(format!(
            "unexpected finish reason: {finish_reason:?}"
        )));
    }

    let content = choice.message.content.unwrap_or_default();
    serde_json::from_str(&content).map_err(|e| AntispamError::Classifier {
        message: format!("unmarshal response content: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, AntispamError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("OPENAI_API_KEY").map_err(|_| {
        AntispamError::Config(
            "OpenAI API key not found. Set openai.api_key in config or OPENAI_API_KEY environment variable.".into(),
        )
    })
}
