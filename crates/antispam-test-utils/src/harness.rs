// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a temp SQLite store together with the mock
//! classifier, media resolver and platform, so moderation tests run against
//! the real persistence layer without any network access.

use std::sync::Arc;
use std::time::Duration;

use antispam_config::model::{AntispamConfig, ScoringConfig, StorageConfig};
use antispam_core::AntispamError;
use antispam_storage::SqliteStorage;

use crate::mock_classifier::MockClassifier;
use crate::mock_media::MockMedia;
use crate::mock_platform::MockPlatform;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    verdicts: Vec<bool>,
    scoring: ScoringConfig,
    workers: usize,
    classifier_delay: Option<Duration>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            verdicts: Vec::new(),
            scoring: ScoringConfig::default(),
            workers: 1,
            classifier_delay: None,
        }
    }

    /// Set scripted classifier verdicts (`true` = spam).
    pub fn with_verdicts(mut self, verdicts: Vec<bool>) -> Self {
        self.verdicts = verdicts;
        self
    }

    /// Override the score thresholds.
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// Set the worker count recorded in the config.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Delay every classification.
    pub fn with_classifier_delay(mut self, delay: Duration) -> Self {
        self.classifier_delay = Some(delay);
        self
    }

    /// Build the test harness, creating and migrating the temp database.
    pub async fn build(self) -> Result<TestHarness, AntispamError> {
        let temp_dir = tempfile::TempDir::new().map_err(AntispamError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let storage = SqliteStorage::new(storage_config.clone());
        storage.initialize().await?;

        let mut classifier = MockClassifier::with_verdicts(self.verdicts);
        if let Some(delay) = self.classifier_delay {
            classifier = classifier.with_delay(delay);
        }

        let mut config = AntispamConfig {
            storage: storage_config,
            scoring: self.scoring,
            ..AntispamConfig::default()
        };
        config.telegram.workers = self.workers;

        Ok(TestHarness {
            storage: Arc::new(storage),
            classifier: Arc::new(classifier),
            media: Arc::new(MockMedia::new()),
            platform: Arc::new(MockPlatform::new()),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock collaborators and temp storage.
pub struct TestHarness {
    /// SQLite score and audit store (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Scripted classifier.
    pub classifier: Arc<MockClassifier>,
    /// In-memory media resolver.
    pub media: Arc<MockMedia>,
    /// Mock platform with update injection.
    pub platform: Arc<MockPlatform>,
    /// Config matching the harness setup.
    pub config: AntispamConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }
}
