// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the moderation core and its collaborators.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Messaging platform a message originates from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Telegram,
}

/// Composite key identifying a sender within a chat on a platform.
///
/// Scores and per-user locks are keyed by this value. The same person in
/// two different chats has two independent identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub source: Source,
    pub chat_id: String,
    pub user_id: String,
}

impl Identity {
    pub fn new(source: Source, chat_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            source,
            chat_id: chat_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Stable string form used as the lock key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.chat_id, self.user_id)
    }
}

/// The author of a message together with human-readable labels for the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub identity: Identity,
    /// Display name, e.g. "Jane Doe (@jane)".
    pub name: String,
    /// Title of the chat the message was posted in (empty for private chats).
    pub chat_title: String,
}

/// Metadata of a single attachment. The content is fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// Opaque platform file handle.
    pub file_id: String,
    pub mime_type: String,
    /// Size in bytes as reported by the platform.
    pub size: Option<i64>,
}

/// A chat message as seen by the moderation core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    /// Platform message id.
    pub id: String,
    /// Message text, or the media caption when there is no text.
    pub text: String,
    pub media: Option<MediaDescriptor>,
}

impl ChatMessage {
    pub fn identity(&self) -> &Identity {
        &self.sender.identity
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn has_media(&self) -> bool {
        self.media.is_some()
    }
}

/// Kind of chat an update was received in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
}

/// An inbound platform update reduced to what the ingestion pipeline needs.
#[derive(Debug, Clone)]
pub struct InboundUpdate {
    /// Platform update id, used to correlate log lines.
    pub update_id: String,
    pub chat_kind: ChatKind,
    /// Bot command name (without the leading slash) if the message is a command.
    pub command: Option<String>,
    pub message: ChatMessage,
}

/// What should happen to a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Leave the message alone.
    Noop,
    /// Delete the message.
    Erase,
    /// Delete the message and remove the sender from the chat.
    Ban,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Noop => "noop",
            ActionKind::Erase => "erase",
            ActionKind::Ban => "ban",
        }
    }
}

/// A moderation action with a free-text note (empty for no-op).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub note: String,
}

impl Action {
    pub fn noop() -> Self {
        Self {
            kind: ActionKind::Noop,
            note: String::new(),
        }
    }

    pub fn erase(note: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Erase,
            note: note.into(),
        }
    }

    pub fn ban(note: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Ban,
            note: note.into(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.kind == ActionKind::Noop
    }
}

/// The classifier's judgment for a single message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_spam: bool,
    /// Short reason; only meaningful when `is_spam` is true.
    pub note: String,
}

/// Image payload handed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// A message record read back from the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    /// Row id in the audit log.
    pub record_id: i64,
    pub sender: Sender,
    pub message_id: String,
    pub text: String,
    pub media: Option<MediaDescriptor>,
    /// ISO 8601 timestamp.
    pub created_at: String,
    pub action: Option<ActionKind>,
    pub action_note: Option<String>,
    pub error: Option<String>,
}

impl SavedMessage {
    /// True if the recorded action removed the message.
    pub fn was_spam(&self) -> bool {
        matches!(self.action, Some(ActionKind::Erase | ActionKind::Ban))
    }
}
