// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the antispam bot.
//!
//! This crate provides the error type, the domain types (identities,
//! messages, actions, verdicts) and the collaborator traits the moderation
//! core is written against. Storage, classifier and platform crates
//! implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::AntispamError;
pub use types::{
    Action, ActionKind, ChatKind, ChatMessage, Identity, Image, InboundUpdate, MediaDescriptor,
    SavedMessage, Sender, Source, Verdict,
};

pub use traits::{ChatPlatform, MediaResolver, MessageStore, ScoreStore, SpamClassifier};
