// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the moderation core.
//!
//! Each trait is a small capability interface using `#[async_trait]` for
//! dynamic dispatch, so in-memory test doubles and durable production
//! implementations are interchangeable.

pub mod classifier;
pub mod media;
pub mod platform;
pub mod store;

pub use classifier::SpamClassifier;
pub use media::MediaResolver;
pub use platform::ChatPlatform;
pub use store::{MessageStore, ScoreStore};
