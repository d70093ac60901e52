// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent ingestion of platform updates.
//!
//! A fixed pool of workers drains the platform's update stream, feeds each
//! group message to the [`Moderator`] and applies the resulting action.
//! Errors and panics are contained per update.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use antispam_core::error::AntispamError;
use antispam_core::traits::ChatPlatform;
use antispam_core::types::{ActionKind, ChatKind, ChatMessage, InboundUpdate};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::engine::Moderator;

/// A fixed-size worker pool moderating inbound updates.
pub struct Pipeline {
    platform: Arc<dyn ChatPlatform>,
    moderator: Arc<Moderator>,
    workers: usize,
    dev_mode: bool,
    tracker: TaskTracker,
}

impl Pipeline {
    /// Creates a pipeline with `workers` workers. Zero workers is a configuration error.
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        moderator: Arc<Moderator>,
        workers: usize,
        dev_mode: bool,
    ) -> Result<Self, AntispamError> {
        if workers == 0 {
            return Err(AntispamError::Config(
                "telegram.workers must be at least 1".into(),
            ));
        }

        Ok(Self {
            platform,
            moderator,
            workers,
            dev_mode,
            tracker: TaskTracker::new(),
        })
    }

    /// Spawns the workers. They stop pulling updates when `cancel` fires or
    /// the update stream ends; in-flight updates are finished first.
    pub fn start(&self, cancel: CancellationToken) {
        info!(workers = self.workers, dev_mode = self.dev_mode, "starting moderation workers");
        for worker_id in 0..self.workers {
            let worker = Worker {
                id: worker_id,
                platform: self.platform.clone(),
                moderator: self.moderator.clone(),
                dev_mode: self.dev_mode,
            };
            self.tracker.spawn(worker.run(cancel.clone()));
        }
        self.tracker.close();
    }

    /// Waits until every worker has exited.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        debug!("all moderation workers stopped");
    }

    /// Starts the workers and waits for them to drain.
    pub async fn run(&self, cancel: CancellationToken) {
        self.start(cancel);
        self.wait().await;
    }
}

struct Worker {
    id: usize,
    platform: Arc<dyn ChatPlatform>,
    moderator: Arc<Moderator>,
    dev_mode: bool,
}

impl Worker {
    async fn run(self, cancel: CancellationToken) {
        debug!(worker_id = self.id, "worker started");
        loop {
            let update = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                update = self.platform.next_update() => match update {
                    Some(update) => update,
                    None => break,
                },
            };

            let update_id = update.update_id.clone();
            let outcome = AssertUnwindSafe(self.handle_update(update, &cancel))
                .catch_unwind()
                .await;
            if let Err(panic) = outcome {
                metrics::counter!("antispam_errors_total", "stage" => "panic").increment(1);
                error!(
                    update_id = update_id.as_str(),
                    worker_id = self.id,
                    panic = panic_message(panic.as_ref()),
                    "panic while processing update"
                );
            }
        }
        debug!(worker_id = self.id, "worker stopped");
    }

    async fn handle_update(&self, update: InboundUpdate, cancel: &CancellationToken) {
        metrics::counter!("antispam_updates_total").increment(1);
        let update_id = update.update_id.as_str();
        let msg = &update.message;
        let chat_id = msg.sender.identity.chat_id.as_str();

        if let Some(command) = &update.command {
            debug!(update_id, command = command.as_str(), "skipping bot command");
            return;
        }

        if update.chat_kind == ChatKind::Private && !self.dev_mode {
            debug!(update_id, chat_id, "private message, replying with help");
            if let Err(e) = self.platform.send_help(chat_id).await {
                metrics::counter!("antispam_errors_total", "stage" => "help").increment(1);
                error!(update_id, chat_id, error = %e, "failed to send help message");
            }
            return;
        }

        let decision = self.moderator.evaluate(msg, cancel).await;
        let user_id = msg.sender.identity.user_id.as_str();
        if let Some(e) = &decision.error {
            if e.is_cancelled() {
                debug!(update_id, "evaluation cancelled");
            } else {
                metrics::counter!("antispam_errors_total", "stage" => "evaluate").increment(1);
                error!(update_id, chat_id, user_id, error = %e, "failed to evaluate message");
            }
        }

        let kind = decision.action.kind;
        metrics::counter!("antispam_actions_total", "action" => kind.as_str()).increment(1);
        if kind != ActionKind::Noop {
            info!(
                update_id,
                chat_id,
                user_id,
                user_name = msg.sender.name.as_str(),
                action = kind.as_str(),
                note = decision.action.note.as_str(),
                "applying moderation action"
            );
        }
        apply_action(self.platform.as_ref(), update_id, msg, kind).await;
    }
}

/// Executes an action on the platform. Failures are logged, never returned.
pub async fn apply_action(
    platform: &dyn ChatPlatform,
    update_id: &str,
    msg: &ChatMessage,
    kind: ActionKind,
) {
    let identity = &msg.sender.identity;
    match kind {
        ActionKind::Noop => {}
        ActionKind::Erase => {
            if let Err(e) = platform.delete_message(&identity.chat_id, &msg.id).await {
                metrics::counter!("antispam_errors_total", "stage" => "delete").increment(1);
                error!(update_id, message_id = msg.id.as_str(), error = %e, "failed to delete message");
            }
        }
        ActionKind::Ban => {
            if let Err(e) = platform.delete_message(&identity.chat_id, &msg.id).await {
                metrics::counter!("antispam_errors_total", "stage" => "delete").increment(1);
                warn!(update_id, message_id = msg.id.as_str(), error = %e, "failed to delete message before ban");
            }
            if let Err(e) = platform
                .ban_member(&identity.chat_id, &identity.user_id)
                .await
            {
                metrics::counter!("antispam_errors_total", "stage" => "ban").increment(1);
                error!(update_id, user_id = identity.user_id.as_str(), error = %e, "failed to ban user");
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::ScoreThresholds;
    use crate::spam_check::SpamChecker;
    use antispam_test_utils::{
        MemoryStore, MockClassifier, MockPlatform, PlatformCall, group_update, message,
    };
    use tracing_test::traced_test;

    struct Fixture {
        store: Arc<MemoryStore>,
        classifier: Arc<MockClassifier>,
        platform: Arc<MockPlatform>,
        pipeline: Pipeline,
    }

    fn fixture(verdicts: Vec<bool>, workers: usize, dev_mode: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let classifier = Arc::new(MockClassifier::with_verdicts(verdicts));
        let platform = Arc::new(MockPlatform::new());
        let moderator = Arc::new(Moderator::new(
            store.clone(),
            store.clone(),
            SpamChecker::new(classifier.clone(), None),
            ScoreThresholds::default(),
        ));
        let pipeline = Pipeline::new(platform.clone(), moderator, workers, dev_mode).unwrap();
        Fixture {
            store,
            classifier,
            platform,
            pipeline,
        }
    }

    async fn drain(f: &Fixture) {
        f.platform.close().await;
        tokio::time::timeout(Duration::from_secs(5), f.pipeline.run(CancellationToken::new()))
            .await
            .expect("pipeline did not drain");
    }

    #[test]
    fn zero_workers_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let moderator = Arc::new(Moderator::new(
            store.clone(),
            store,
            SpamChecker::new(Arc::new(MockClassifier::new()), None),
            ScoreThresholds::default(),
        ));
        let result = Pipeline::new(Arc::new(MockPlatform::new()), moderator, 0, false);
        assert!(matches!(result, Err(AntispamError::Config(_))));
    }

    #[tokio::test]
    async fn spam_is_deleted() {
        let f = fixture(vec![true], 2, false);
        f.platform.inject(group_update(1, message("-1", "2", "30", "spam"))).await;
        drain(&f).await;

        assert_eq!(
            f.platform.calls().await,
            vec![PlatformCall::Delete {
                chat_id: "-1".into(),
                message_id: "30".into()
            }]
        );
    }

    #[tokio::test]
    async fn ban_deletes_then_bans() {
        let f = fixture(vec![true], 1, false);
        let msg = message("-1", "2", "30", "spam");
        f.store.seed_score(msg.identity(), -3).await;
        f.platform.inject(group_update(1, msg)).await;
        drain(&f).await;

        assert_eq!(
            f.platform.calls().await,
            vec![
                PlatformCall::Delete {
                    chat_id: "-1".into(),
                    message_id: "30".into()
                },
                PlatformCall::Ban {
                    chat_id: "-1".into(),
                    user_id: "2".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn commands_are_skipped() {
        let f = fixture(vec![true], 1, false);
        let mut update = group_update(1, message("-1", "2", "30", "/start"));
        update.command = Some("start".into());
        f.platform.inject(update).await;
        drain(&f).await;

        assert_eq!(f.classifier.call_count().await, 0);
        assert!(f.platform.calls().await.is_empty());
    }

    #[tokio::test]
    async fn private_messages_get_help() {
        let f = fixture(vec![true], 1, false);
        let mut update = group_update(1, message("42", "42", "30", "hello bot"));
        update.chat_kind = ChatKind::Private;
        f.platform.inject(update).await;
        drain(&f).await;

        assert_eq!(f.classifier.call_count().await, 0);
        assert_eq!(
            f.platform.calls().await,
            vec![PlatformCall::Help {
                chat_id: "42".into()
            }]
        );
        assert!(f.store.records().await.is_empty());
    }

    #[tokio::test]
    async fn dev_mode_moderates_private_messages() {
        let f = fixture(vec![true], 1, true);
        let mut update = group_update(1, message("42", "42", "30", "spam"));
        update.chat_kind = ChatKind::Private;
        f.platform.inject(update).await;
        drain(&f).await;

        assert_eq!(f.classifier.call_count().await, 1);
        assert!(matches!(
            f.platform.calls().await.as_slice(),
            [PlatformCall::Delete { .. }]
        ));
    }

    #[tokio::test]
    async fn platform_errors_do_not_stop_workers() {
        let f = fixture(vec![true, true], 1, false);
        f.platform.fail_actions(true);
        f.platform.inject(group_update(1, message("-1", "2", "30", "a"))).await;
        f.platform.inject(group_update(2, message("-1", "3", "31", "b"))).await;
        drain(&f).await;

        assert_eq!(f.platform.calls().await.len(), 2);
        assert_eq!(f.store.records().await.len(), 2);
    }

    #[tokio::test]
    async fn panic_is_contained_per_update() {
        let f = fixture(vec![], 1, false);
        f.classifier.push_panic().await;
        f.classifier.push_verdict(true).await;
        f.platform.inject(group_update(1, message("-1", "2", "30", "boom"))).await;
        f.platform.inject(group_update(2, message("-1", "3", "31", "spam"))).await;
        drain(&f).await;

        assert_eq!(
            f.platform.calls().await,
            vec![PlatformCall::Delete {
                chat_id: "-1".into(),
                message_id: "31".into()
            }]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn evaluation_failure_log_names_the_user() {
        let f = fixture(vec![], 1, false);
        f.classifier.push_error("upstream down").await;
        let worker = Worker {
            id: 0,
            platform: f.platform.clone(),
            moderator: f.pipeline.moderator.clone(),
            dev_mode: false,
        };

        worker
            .handle_update(
                group_update(1, message("-1", "777", "30", "hello")),
                &CancellationToken::new(),
            )
            .await;

        assert!(logs_contain("failed to evaluate message"));
        assert!(logs_contain("user_id=\"777\""));
        assert!(f.platform.calls().await.is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_idle_workers() {
        let f = fixture(vec![], 3, false);
        let cancel = CancellationToken::new();
        f.pipeline.start(cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), f.pipeline.wait())
            .await
            .expect("workers did not stop after cancellation");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_users_are_processed_in_parallel() {
        let f = fixture(vec![], 4, false);
        for i in 0..20u64 {
            let user = (i % 5).to_string();
            f.platform
                .inject(group_update(i, message("-1", &user, &i.to_string(), "hi")))
                .await;
        }
        drain(&f).await;

        assert_eq!(f.classifier.call_count().await, 20);
        for user in 0..5 {
            let msg = message("-1", &user.to_string(), "0", "");
            assert_eq!(f.store.score(msg.identity()).await, Some(4));
        }
    }
}
