// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat platform for deterministic testing.
//!
//! `MockPlatform` implements `ChatPlatform` with injectable inbound updates
//! and captured moderation calls for assertion in tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use antispam_core::AntispamError;
use antispam_core::traits::ChatPlatform;
use antispam_core::types::InboundUpdate;

/// A moderation call made against the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Delete { chat_id: String, message_id: String },
    Ban { chat_id: String, user_id: String },
    Help { chat_id: String },
}

/// A mock chat platform for testing.
///
/// Updates injected via `inject()` are returned by `next_update()` in order.
/// After `close()` the stream ends once the queued updates are drained.
pub struct MockPlatform {
    tx: Mutex<Option<mpsc::UnboundedSender<InboundUpdate>>>,
    rx: Mutex<mpsc::UnboundedReceiver<InboundUpdate>>,
    calls: Mutex<Vec<PlatformCall>>,
    fail_actions: AtomicBool,
}

impl MockPlatform {
    /// Create a new mock platform with an open, empty update stream.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
            calls: Mutex::new(Vec::new()),
            fail_actions: AtomicBool::new(false),
        }
    }

    /// Inject an inbound update. Ignored once the stream is closed.
    pub async fn inject(&self, update: InboundUpdate) {
        if let Some(tx) = self.tx.lock().await.as_ref() {
            let _ = tx.send(update);
        }
    }

    /// Close the update stream.
    pub async fn close(&self) {
        self.tx.lock().await.take();
    }

    /// Make delete, ban and help calls fail (they are still recorded).
    pub fn fail_actions(&self, fail: bool) {
        self.fail_actions.store(fail, Ordering::SeqCst);
    }

    /// All moderation calls made so far.
    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: PlatformCall) -> Result<(), AntispamError> {
        self.calls.lock().await.push(call);
        if self.fail_actions.load(Ordering::SeqCst) {
            return Err(AntispamError::platform("injected platform failure"));
        }
        Ok(())
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn next_update(&self) -> Option<InboundUpdate> {
        self.rx.lock().await.recv().await
    }

    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<(), AntispamError> {
        self.record(PlatformCall::Delete {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
        })
        .await
    }

    async fn ban_member(&self, chat_id: &str, user_id: &str) -> Result<(), AntispamError> {
        self.record(PlatformCall::Ban {
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
        })
        .await
    }

    async fn send_help(&self, chat_id: &str) -> Result<(), AntispamError> {
        self.record(PlatformCall::Help {
            chat_id: chat_id.to_string(),
        })
        .await
    }
}
