// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Score-based moderation decisions.
//!
//! Every sender starts at the default score. A message judged "not spam"
//! raises the score by one, a spam message lowers it by one and is erased.
//! Reaching the ban score bans the sender; reaching the trusted score
//! exempts the sender from further checks. Scores never leave the
//! `[ban, trusted]` interval.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use antispam_config::model::ScoringConfig;
use antispam_core::error::AntispamError;
use antispam_core::traits::{MessageStore, ScoreStore};
use antispam_core::types::{Action, ChatMessage};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::keyed_lock::KeyedMutex;
use crate::pipeline::panic_message;
use crate::spam_check::SpamChecker;

/// Score thresholds with the invariant `ban < default < trusted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreThresholds {
    default: i64,
    trusted: i64,
    ban: i64,
}

impl ScoreThresholds {
    pub fn new(default: i64, trusted: i64, ban: i64) -> Result<Self, AntispamError> {
        if !(ban < default && default < trusted) {
            return Err(AntispamError::Config(format!(
                "score thresholds must satisfy ban_score < default_score < trusted_score, got {ban} / {default} / {trusted}"
            )));
        }
        Ok(Self {
            default,
            trusted,
            ban,
        })
    }

    pub fn from_config(config: &ScoringConfig) -> Result<Self, AntispamError> {
        Self::new(config.default_score, config.trusted_score, config.ban_score)
    }

    pub fn default_score(&self) -> i64 {
        self.default
    }

    pub fn trusted_score(&self) -> i64 {
        self.trusted
    }

    pub fn ban_score(&self) -> i64 {
        self.ban
    }

    pub fn clamp(&self, score: i64) -> i64 {
        score.clamp(self.ban, self.trusted)
    }

    pub fn is_trusted(&self, score: i64) -> bool {
        score >= self.trusted
    }

    /// Score after a "not spam" verdict.
    pub fn reward(&self, score: i64) -> i64 {
        self.clamp(score.saturating_add(1))
    }

    /// Score after a spam verdict.
    pub fn penalize(&self, score: i64) -> i64 {
        self.clamp(score.saturating_sub(1))
    }
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            default: 0,
            trusted: 10,
            ban: -4,
        }
    }
}

/// How far a message progressed through evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// Not checked: trusted sender, nothing to evaluate, or failed before persisting.
    New,
    /// Persisted and handed to the classifier, but cancelled before it answered.
    Checking,
    /// The classifier answered or failed.
    Resolved,
}

/// Outcome of [`Moderator::evaluate`].
///
/// The action must be applied even when `error` is set.
#[derive(Debug)]
pub struct Decision {
    pub action: Action,
    pub state: CheckState,
    pub error: Option<AntispamError>,
}

impl Decision {
    fn skipped(error: Option<AntispamError>) -> Self {
        Self {
            action: Action::noop(),
            state: CheckState::New,
            error,
        }
    }
}

/// Keeps the first error and logs the ones after it.
fn record_error(slot: &mut Option<AntispamError>, error: AntispamError) {
    if slot.is_none() {
        *slot = Some(error);
    } else {
        warn!(error = %error, "additional error during evaluation");
    }
}

/// The moderation decision engine.
///
/// Safe to share between workers. Evaluations for the same identity are
/// serialized by a per-identity lock held from the score read to the score
/// write.
pub struct Moderator {
    scores: Arc<dyn ScoreStore>,
    messages: Arc<dyn MessageStore>,
    checker: SpamChecker,
    thresholds: ScoreThresholds,
    locks: KeyedMutex,
}

impl Moderator {
    pub fn new(
        scores: Arc<dyn ScoreStore>,
        messages: Arc<dyn MessageStore>,
        checker: SpamChecker,
        thresholds: ScoreThresholds,
    ) -> Self {
        Self {
            scores,
            messages,
            checker,
            thresholds,
            locks: KeyedMutex::new(),
        }
    }

    pub fn thresholds(&self) -> ScoreThresholds {
        self.thresholds
    }

    /// Number of identities currently being evaluated or waited on.
    pub fn active_identities(&self) -> usize {
        self.locks.len()
    }

    /// Decides what to do with a message and updates the sender's score.
    pub async fn evaluate(&self, msg: &ChatMessage, cancel: &CancellationToken) -> Decision {
        let identity = msg.identity();
        let _guard = self.locks.lock(&identity.key()).await;

        let score = match self.scores.get_score(identity).await {
            Ok(stored) => stored.unwrap_or(self.thresholds.default),
            Err(e) => return Decision::skipped(Some(e)),
        };

        if self.thresholds.is_trusted(score) {
            debug!(user = %identity, score, "trusted sender, skipping check");
            return Decision::skipped(None);
        }

        if !self.checker.is_evaluable(msg) {
            debug!(user = %identity, "nothing to evaluate");
            return Decision::skipped(None);
        }

        let record_id = match self.messages.save_message(msg).await {
            Ok(id) => id,
            Err(e) => return Decision::skipped(Some(e)),
        };

        // The record exists from here on, so a panic must still resolve it.
        let checked = AssertUnwindSafe(self.checker.check(msg, cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let reason = panic_message(panic.as_ref()).to_string();
                error!(
                    user = %identity,
                    record_id,
                    panic = reason.as_str(),
                    "panic while classifying message"
                );
                Err(AntispamError::Internal(format!("panic: {reason}")))
            });

        let verdict = match checked {
            Ok(verdict) => verdict,
            Err(e) => {
                let reason = match &e {
                    AntispamError::Internal(reason) => reason.clone(),
                    other => other.to_string(),
                };
                if let Err(store_err) = self.messages.save_error(record_id, &reason).await {
                    warn!(record_id, error = %store_err, "failed to record classification error");
                }
                let state = if e.is_cancelled() {
                    CheckState::Checking
                } else {
                    CheckState::Resolved
                };
                return Decision {
                    action: Action::noop(),
                    state,
                    error: Some(e),
                };
            }
        };

        let mut error = None;
        let (new_score, action) = if verdict.is_spam {
            let new_score = self.thresholds.penalize(score);
            let action = if new_score <= self.thresholds.ban {
                Action::ban(verdict.note)
            } else {
                Action::erase(verdict.note)
            };
            (new_score, action)
        } else {
            (self.thresholds.reward(score), Action::noop())
        };

        // Spam always persists the score; not spam only when it changed.
        if (verdict.is_spam || new_score != score)
            && let Err(e) = self.scores.set_score(&msg.sender, new_score).await
        {
            record_error(&mut error, e);
        }

        if let Err(e) = self.messages.save_action(record_id, &action).await {
            record_error(&mut error, e);
        }

        info!(
            user = %identity,
            message_id = msg.id.as_str(),
            score,
            new_score,
            action = action.kind.as_str(),
            note = action.note.as_str(),
            "message evaluated"
        );

        Decision {
            action,
            state: CheckState::Resolved,
            error,
        }
    }
}
