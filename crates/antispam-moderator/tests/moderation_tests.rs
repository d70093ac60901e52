// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end moderation tests against SQLite storage.

use std::sync::Arc;
use std::time::Duration;

use antispam_core::traits::{MessageStore, ScoreStore};
use antispam_core::types::ActionKind;
use antispam_moderator::{Moderator, Pipeline, ScoreThresholds, SpamChecker};
use antispam_test_utils::{PlatformCall, TestHarness, group_update, message};
use tokio_util::sync::CancellationToken;

fn moderator(harness: &TestHarness) -> Arc<Moderator> {
    Arc::new(Moderator::new(
        harness.storage.clone(),
        harness.storage.clone(),
        SpamChecker::new(harness.classifier.clone(), Some(harness.media.clone())),
        ScoreThresholds::from_config(&harness.config.scoring).unwrap(),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_user_matches_sequential() {
    let verdicts: Vec<bool> = (0..12).map(|i| i % 2 == 0).collect();
    let harness = TestHarness::builder()
        .with_verdicts(verdicts.clone())
        .with_classifier_delay(Duration::from_millis(5))
        .build()
        .await
        .unwrap();
    let moderator = moderator(&harness);
    let cancel = CancellationToken::new();

    let mut handles = Vec::new();
    for i in 0..verdicts.len() {
        let moderator = moderator.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            let msg = message("-100", "7", &i.to_string(), "hello");
            moderator.evaluate(&msg, &cancel).await
        }));
    }
    for handle in handles {
        let decision = handle.await.unwrap();
        assert!(decision.error.is_none());
    }

    // Sequential reference run over the same verdict order.
    let thresholds = ScoreThresholds::default();
    let mut expected = thresholds.default_score();
    for spam in &verdicts {
        expected = if *spam {
            thresholds.penalize(expected)
        } else {
            thresholds.reward(expected)
        };
    }

    let identity = message("-100", "7", "0", "").sender.identity;
    assert_eq!(
        harness.storage.get_score(&identity).await.unwrap(),
        Some(expected)
    );

    let since = chrono::Utc::now() - chrono::Duration::hours(1);
    let saved = harness.storage.list_messages(since).await.unwrap();
    assert_eq!(saved.len(), verdicts.len());
    let erased = saved
        .iter()
        .filter(|m| m.action == Some(ActionKind::Erase))
        .count();
    assert_eq!(erased, verdicts.iter().filter(|v| **v).count());
    assert_eq!(moderator.active_identities(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pipeline_bans_repeat_spammer() {
    let harness = TestHarness::builder()
        .with_verdicts(vec![true; 5])
        .with_workers(4)
        .build()
        .await
        .unwrap();
    let pipeline = Pipeline::new(
        harness.platform.clone(),
        moderator(&harness),
        harness.config.telegram.workers,
        false,
    )
    .unwrap();

    for i in 0..5u64 {
        harness
            .platform
            .inject(group_update(i, message("-100", "7", &(100 + i).to_string(), "spam")))
            .await;
    }
    harness.platform.close().await;
    tokio::time::timeout(Duration::from_secs(10), pipeline.run(CancellationToken::new()))
        .await
        .expect("pipeline did not drain");

    let calls = harness.platform.calls().await;
    let deletes = calls
        .iter()
        .filter(|c| matches!(c, PlatformCall::Delete { .. }))
        .count();
    let bans = calls
        .iter()
        .filter(|c| matches!(c, PlatformCall::Ban { .. }))
        .count();
    assert_eq!(deletes, 5);
    // -1, -2, -3 erase; -4 ban; clamped at -4 ban again.
    assert_eq!(bans, 2);

    let identity = message("-100", "7", "0", "").sender.identity;
    assert_eq!(harness.storage.get_score(&identity).await.unwrap(), Some(-4));
}

#[tokio::test]
async fn image_only_message_uses_media_resolver() {
    let harness = TestHarness::builder()
        .with_verdicts(vec![true])
        .build()
        .await
        .unwrap();
    harness.media.insert("photo-1", vec![0xFF, 0xD8]).await;
    let moderator = moderator(&harness);

    let msg = antispam_test_utils::message_with_media("-100", "7", "1", "", "photo-1", "image/jpeg");
    let decision = moderator.evaluate(&msg, &CancellationToken::new()).await;

    assert_eq!(decision.action.kind, ActionKind::Erase);
    let calls = harness.classifier.calls().await;
    assert_eq!(calls[0].text, antispam_moderator::IMAGE_ONLY_PLACEHOLDER);
    assert_eq!(calls[0].image.as_ref().unwrap().data, vec![0xFF, 0xD8]);
}
