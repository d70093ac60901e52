// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI chat-completions request/response types.

use serde::{Deserialize, Serialize};

/// Finish reason of a completed, untruncated answer.
pub const FINISH_REASON_STOP: &str = "stop";

// --- Request types ---

/// A request to the chat-completions endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier (e.g., "gpt-5-mini").
    pub model: String,

    /// System and user messages. Requests never carry history.
    pub messages: Vec<ApiMessage>,

    /// Reasoning effort, sent for text-only requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,

    /// Structured output format.
    pub response_format: serde_json::Value,
}

/// A single message in the request.
#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    /// "system" or "user".
    pub role: String,
    pub content: ApiContent,
}

impl ApiMessage {
    pub fn system(text: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: ApiContent::Text(text.to_string()),
        }
    }

    pub fn user(content: ApiContent) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

/// Message content -- a plain string or multimodal parts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ApiContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of multimodal user content.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

/// Inline image reference.
#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    /// `data:<mime>;base64,<payload>` URL.
    pub url: String,
    /// Vision detail level; "low" keeps token usage small.
    pub detail: String,
}

// --- Response types ---

/// A response from the chat-completions endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Error payload returned with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
}

/// Strict JSON schema for the spam verdict.
pub fn spam_check_format() -> serde_json::Value {
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": "spam_check_response",
            "schema": {
                "type": "object",
                "properties": {
                    "is_spam": {
                        "type": "boolean",
                        "description": "true if the message is spam, false otherwise"
                    },
                    "note": {
                        "type": "string",
                        "description": "if message is spam, this field contains short description of reason why it is spam"
                    }
                },
                "required": ["is_spam", "note"],
                "additionalProperties": false
            },
            "strict": true
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_request_serializes_reasoning_effort() {
        let req = ChatRequest {
            model: "gpt-5-mini".into(),
            messages: vec![
                ApiMessage::system("sys"),
                ApiMessage::user(ApiContent::Text("hello".into())),
            ],
            reasoning_effort: Some("medium".into()),
            response_format: spam_check_format(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["reasoning_effort"], "medium");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert_eq!(
            json["response_format"]["json_schema"]["name"],
            "spam_check_response"
        );
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn image_request_serializes_parts_without_reasoning_effort() {
        let req = ChatRequest {
            model: "gpt-5-mini".into(),
            messages: vec![ApiMessage::user(ApiContent::Parts(vec![
                ContentPart::Text {
                    text: "caption".into(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AAAA".into(),
                        detail: "low".into(),
                    },
                },
            ]))],
            reasoning_effort: None,
            response_format: spam_check_format(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("reasoning_effort").is_none());
        let parts = &json["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "caption");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["detail"], "low");
    }

    #[test]
    fn response_tolerates_missing_optional_fields() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"{}"}}]}"#).unwrap();
        assert_eq!(resp.choices.len(), 1);
        assert!(resp.choices[0].finish_reason.is_none());
        assert!(resp.usage.is_none());
    }
}
