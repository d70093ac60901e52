// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moderation core for the antispam bot.
//!
//! - [`Moderator`] turns (score, message, verdict) into an action and keeps
//!   per-user scores consistent under concurrent access
//! - [`SpamChecker`] orchestrates text-only and text plus image classification
//! - [`Pipeline`] runs a fixed pool of workers over the platform's update stream
//! - [`shutdown`] wires OS signals to the shared cancellation token

pub mod engine;
pub mod keyed_lock;
pub mod pipeline;
pub mod shutdown;
pub mod spam_check;

pub use engine::{CheckState, Decision, Moderator, ScoreThresholds};
pub use keyed_lock::KeyedMutex;
pub use pipeline::Pipeline;
pub use spam_check::{DEFAULT_SYSTEM_PROMPT, IMAGE_ONLY_PLACEHOLDER, SpamChecker, load_system_prompt};
