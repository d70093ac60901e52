// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat platform trait for messaging integrations (Telegram, etc.).

use async_trait::async_trait;

use crate::error::AntispamError;
use crate::types::InboundUpdate;

/// Source of inbound updates and executor of moderation actions.
///
/// `next_update` is called concurrently by every pipeline worker; each
/// update is delivered to exactly one caller.
#[async_trait]
pub trait ChatPlatform: Send + Sync + 'static {
    /// Waits for the next inbound update. Returns `None` once the update
    /// stream is closed.
    async fn next_update(&self) -> Option<InboundUpdate>;

    /// Deletes a message from a chat.
    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<(), AntispamError>;

    /// Removes a user from a chat permanently.
    async fn ban_member(&self, chat_id: &str, user_id: &str) -> Result<(), AntispamError>;

    /// Replies to a private chat with the static help text.
    async fn send_help(&self, chat_id: &str) -> Result<(), AntispamError>;
}
