// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update filtering and message extraction.
//!
//! Reduces a raw Telegram [`Update`] to the platform-agnostic
//! [`InboundUpdate`] consumed by the moderation pipeline.

use antispam_core::types::{
    ChatKind, ChatMessage, Identity, InboundUpdate, MediaDescriptor, Sender, Source,
};
use teloxide::types::{FileMeta, Message, MessageEntityKind, Update, UpdateKind, User};
use tracing::warn;

/// Fallback MIME type for files Telegram reports without one.
const OCTET_STREAM: &str = "application/octet-stream";

/// Returns the message carried by an update, if it is one we moderate.
///
/// New and edited messages and channel posts are all considered.
pub fn take_message(update: &Update) -> Option<&Message> {
    match &update.kind {
        UpdateKind::Message(m)
        | UpdateKind::EditedMessage(m)
        | UpdateKind::ChannelPost(m)
        | UpdateKind::EditedChannelPost(m) => Some(m),
        _ => None,
    }
}

/// Message text, or the media caption when there is no text.
pub fn take_text(msg: &Message) -> String {
    msg.text()
        .filter(|t| !t.is_empty())
        .or_else(|| msg.caption())
        .unwrap_or_default()
        .to_string()
}

/// Human-readable sender label: "First Last (@username)".
///
/// Falls back to "@username", then to the numeric user id.
pub fn take_user_name(user: &User) -> String {
    let mut name = user.first_name.clone();
    if let Some(last) = user.last_name.as_deref().filter(|l| !l.is_empty()) {
        if !name.is_empty() {
            name.push(' ');
        }
        name.push_str(last);
    }

    if let Some(username) = user.username.as_deref().filter(|u| !u.is_empty()) {
        if name.is_empty() {
            name = format!("@{username}");
        } else {
            name.push_str(&format!(" (@{username})"));
        }
    }

    if name.is_empty() {
        return user.id.0.to_string();
    }
    name
}

/// Describes the single attachment of a message, if any.
///
/// Photos use the largest size. Stickers are WebP unless animated (TGS) or video (WebM).
pub fn media_info(msg: &Message) -> Option<MediaDescriptor> {
    if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        return Some(descriptor(&largest.file, "image/jpeg".to_string()));
    }
    if let Some(animation) = msg.animation() {
        return Some(descriptor(&animation.file, mime_or_default(animation.mime_type.as_ref())));
    }
    if let Some(video) = msg.video() {
        return Some(descriptor(&video.file, mime_or_default(video.mime_type.as_ref())));
    }
    if let Some(document) = msg.document() {
        return Some(descriptor(&document.file, mime_or_default(document.mime_type.as_ref())));
    }
    if let Some(sticker) = msg.sticker() {
        let mime_type = if sticker.is_animated() {
            "application/x-tgsticker"
        } else if sticker.is_video() {
            "video/webm"
        } else {
            "image/webp"
        };
        return Some(descriptor(&sticker.file, mime_type.to_string()));
    }
    None
}

fn descriptor(file: &FileMeta, mime_type: String) -> MediaDescriptor {
    MediaDescriptor {
        file_id: file.id.to_string(),
        mime_type,
        size: Some(i64::from(file.size)),
    }
}

fn mime_or_default<M: ToString>(mime: Option<M>) -> String {
    mime.map(|m| m.to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Returns the command name if the message starts with a bot command entity.
///
/// `/start@my_bot args` yields `start`.
pub fn command(msg: &Message) -> Option<String> {
    let entities = msg.parse_entities()?;
    let first = entities
        .iter()
        .find(|e| *e.kind() == MessageEntityKind::BotCommand && e.start() == 0)?;
    let name = first.text().trim_start_matches('/');
    let name = name.split('@').next().unwrap_or(name);
    Some(name.to_string())
}

/// Converts a Telegram update into an [`InboundUpdate`].
///
/// Returns `None` (with a warning) for updates without a moderatable message
/// or without a sender.
pub fn to_inbound_update(update: &Update) -> Option<InboundUpdate> {
    let update_id = update.id.0;
    let Some(msg) = take_message(update) else {
        warn!(update_id, "update carries no message");
        return None;
    };
    let Some(user) = msg.from.as_ref() else {
        warn!(update_id, "message has no sender");
        return None;
    };

    let chat_kind = if msg.chat.is_private() {
        ChatKind::Private
    } else {
        ChatKind::Group
    };

    let sender = Sender {
        identity: Identity::new(
            Source::Telegram,
            msg.chat.id.0.to_string(),
            user.id.0.to_string(),
        ),
        name: take_user_name(user),
        chat_title: msg.chat.title().unwrap_or_default().to_string(),
    };

    Some(InboundUpdate {
        update_id: update_id.to_string(),
        chat_kind,
        command: command(msg),
        message: ChatMessage {
            sender,
            id: msg.id.0.to_string(),
            text: take_text(msg),
            media: media_info(msg),
        },
    })
}
