// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for antispam integration tests.
//!
//! Provides mock collaborators and a test harness for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MemoryStore`] - In-memory score and audit store with failure injection
//! - [`MockClassifier`] - Classifier returning scripted verdicts
//! - [`MockMedia`] - Media resolver serving registered files
//! - [`MockPlatform`] - Chat platform with update injection and action capture
//! - [`TestHarness`] - Temp SQLite storage wired together with the mocks

pub mod harness;
pub mod memory_store;
pub mod mock_classifier;
pub mod mock_media;
pub mod mock_platform;

pub use harness::TestHarness;
pub use memory_store::{MemoryStore, StoreOp};
pub use mock_classifier::{ClassifyCall, MockClassifier};
pub use mock_media::MockMedia;
pub use mock_platform::{MockPlatform, PlatformCall};

use antispam_core::types::{
    ChatKind, ChatMessage, Identity, InboundUpdate, MediaDescriptor, Sender, Source,
};

/// Builds a group-chat message with the given ids and text.
pub fn message(chat_id: &str, user_id: &str, message_id: &str, text: &str) -> ChatMessage {
    ChatMessage {
        sender: Sender {
            identity: Identity::new(Source::Telegram, chat_id, user_id),
            name: format!("user {user_id}"),
            chat_title: format!("chat {chat_id}"),
        },
        id: message_id.to_string(),
        text: text.to_string(),
        media: None,
    }
}

/// Builds a message carrying a single attachment.
pub fn message_with_media(
    chat_id: &str,
    user_id: &str,
    message_id: &str,
    text: &str,
    file_id: &str,
    mime_type: &str,
) -> ChatMessage {
    ChatMessage {
        media: Some(MediaDescriptor {
            file_id: file_id.to_string(),
            mime_type: mime_type.to_string(),
            size: Some(1024),
        }),
        ..message(chat_id, user_id, message_id, text)
    }
}

/// Wraps a message into a group-chat update.
pub fn group_update(update_id: u64, message: ChatMessage) -> InboundUpdate {
    InboundUpdate {
        update_id: update_id.to_string(),
        chat_kind: ChatKind::Group,
        command: None,
        message,
    }
}
